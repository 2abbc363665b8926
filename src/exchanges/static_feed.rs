use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::RwLock;

use crate::core::{
    error::ExchangeError,
    exchange::Exchange,
    types::{Market, MarketSummary, Result},
};

/// 内存行情源，用于模拟运行与测试
pub struct StaticExchange {
    name: String,
    summaries: RwLock<HashMap<String, MarketSummary>>,
}

impl StaticExchange {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            summaries: RwLock::new(HashMap::new()),
        }
    }

    /// 以单一价格登记市场
    pub fn with_price(self, market: &Market, price: f64) -> Self {
        self.set_summary(MarketSummary::flat(market.symbol(), price));
        self
    }

    /// 从 BASE/QUOTE -> 价格 的映射构建
    pub fn from_prices(name: impl Into<String>, prices: &HashMap<String, f64>) -> Result<Self> {
        let exchange = Self::new(name);
        for (symbol, price) in prices {
            let market = Market::parse(symbol)
                .ok_or_else(|| ExchangeError::ConfigError(format!("无效的交易对: {}", symbol)))?;
            exchange.set_summary(MarketSummary::flat(market.symbol(), *price));
        }
        Ok(exchange)
    }

    /// 更新行情，策略下一次读取即可看到
    pub fn set_summary(&self, summary: MarketSummary) {
        if let Ok(mut summaries) = self.summaries.write() {
            summaries.insert(summary.symbol.clone(), summary);
        }
    }
}

#[async_trait]
impl Exchange for StaticExchange {
    fn name(&self) -> &str {
        &self.name
    }

    async fn get_market_summary(&self, market: &Market) -> Result<MarketSummary> {
        let summaries = self
            .summaries
            .read()
            .map_err(|_| ExchangeError::Other("行情缓存锁已损坏".to_string()))?;
        let mut summary = summaries
            .get(&market.symbol())
            .cloned()
            .ok_or_else(|| ExchangeError::SymbolNotFound {
                symbol: market.symbol(),
                exchange: self.name.clone(),
            })?;
        summary.timestamp = Utc::now();
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_known_and_unknown_markets() {
        let btc = Market::new("BTC", "USDT");
        let exchange = StaticExchange::new("paper").with_price(&btc, 64000.0);

        let summary = exchange.get_market_summary(&btc).await.unwrap();
        assert_eq!(summary.last, 64000.0);

        let err = exchange
            .get_market_summary(&Market::new("DOGE", "USDT"))
            .await
            .unwrap_err();
        assert!(matches!(err, ExchangeError::SymbolNotFound { .. }));
    }

    #[tokio::test]
    async fn test_from_prices() {
        let mut prices = HashMap::new();
        prices.insert("eth/usdt".to_string(), 3000.0);
        let exchange = StaticExchange::from_prices("paper", &prices).unwrap();
        let summary = exchange
            .get_market_summary(&Market::new("ETH", "USDT"))
            .await
            .unwrap();
        assert_eq!(summary.symbol, "ETH/USDT");

        prices.insert("ETHUSDT".to_string(), 1.0);
        assert!(StaticExchange::from_prices("paper", &prices).is_err());
    }
}
