// 行情源实现
pub mod binance;
pub mod static_feed;

pub use binance::BinanceExchange;
pub use static_feed::StaticExchange;

use std::sync::Arc;

use crate::core::{
    config::{ExchangeConfig, ExchangeKind},
    exchange::Exchange,
    types::Result,
};

/// 根据配置创建行情源
pub fn build_exchange(config: &ExchangeConfig) -> Result<Arc<dyn Exchange>> {
    let exchange: Arc<dyn Exchange> = match config.kind {
        ExchangeKind::Binance => Arc::new(BinanceExchange::new(
            config.name.clone(),
            config.base_url.clone(),
        )),
        ExchangeKind::Static => Arc::new(StaticExchange::from_prices(
            config.name.clone(),
            &config.prices,
        )?),
    };
    log::info!("✅ 行情源已创建: {} ({:?})", config.name, config.kind);
    Ok(exchange)
}

pub fn build_exchanges(configs: &[ExchangeConfig]) -> Result<Vec<Arc<dyn Exchange>>> {
    configs.iter().map(build_exchange).collect()
}
