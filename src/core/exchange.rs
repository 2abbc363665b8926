use crate::core::types::{Market, MarketSummary, Result};
use async_trait::async_trait;

/// 行情读取接口，由运行环境提供给策略
#[async_trait]
pub trait Exchange: Send + Sync {
    /// 获取交易所名称
    fn name(&self) -> &str;

    /// 获取市场概要
    async fn get_market_summary(&self, market: &Market) -> Result<MarketSummary>;
}
