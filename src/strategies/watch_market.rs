use std::sync::Arc;

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use serde::Deserialize;

use crate::core::error::{EngineError, ExchangeError};
use crate::core::exchange::Exchange;
use crate::core::types::{Market, MarketSummary};
use crate::strategies::common::StrategyHooks;

/// 行情观察参数
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct WatchMarketParams {
    /// 观察的交易对，格式 BASE/QUOTE，缺省时取第一个市场
    pub market: Option<String>,
}

/// 周期拉取一个市场的行情概要并打印价格变化
pub struct WatchMarket {
    name: String,
    market: Option<Market>,
    last: Option<MarketSummary>,
}

impl WatchMarket {
    pub fn new(name: &str, params: WatchMarketParams) -> Result<Self> {
        let market = match params.market {
            Some(symbol) => Some(
                Market::parse(&symbol)
                    .ok_or_else(|| anyhow!("无效的交易对: {}，格式应为 BASE/QUOTE", symbol))?,
            ),
            None => None,
        };
        Ok(Self {
            name: name.to_string(),
            market,
            last: None,
        })
    }

    pub fn last_summary(&self) -> Option<&MarketSummary> {
        self.last.as_ref()
    }
}

/// 行情源返回的可重试错误（网络中断、限流、服务端错误）
fn is_transient(error: &EngineError) -> bool {
    match error {
        EngineError::Update { source, .. } => source
            .downcast_ref::<ExchangeError>()
            .map_or(false, ExchangeError::is_retryable),
        _ => false,
    }
}

#[async_trait]
impl StrategyHooks for WatchMarket {
    async fn setup(&mut self, exchanges: &[Arc<dyn Exchange>], markets: &[Market]) -> Result<()> {
        if exchanges.is_empty() {
            bail!("没有可用的行情源");
        }
        let market = self.market.as_ref().or_else(|| markets.first());
        match market {
            Some(market) => {
                log::info!(
                    "[{}] 开始观察 {} @ {}",
                    self.name,
                    market,
                    exchanges[0].name()
                );
                Ok(())
            }
            None => bail!("没有配置任何市场"),
        }
    }

    async fn on_update(&mut self, exchanges: &[Arc<dyn Exchange>], markets: &[Market]) -> Result<()> {
        let exchange = exchanges
            .first()
            .ok_or_else(|| anyhow!("没有可用的行情源"))?;
        let market = self
            .market
            .as_ref()
            .or_else(|| markets.first())
            .ok_or_else(|| anyhow!("没有配置任何市场"))?;

        let summary = exchange.get_market_summary(market).await?;
        match &self.last {
            Some(prev) if prev.last > 0.0 => {
                let change = (summary.last - prev.last) / prev.last * 100.0;
                log::info!(
                    "[{}] {} 最新价 {:.4} ({:+.3}%) 买一 {:.4} 卖一 {:.4}",
                    self.name,
                    market,
                    summary.last,
                    change,
                    summary.bid,
                    summary.ask
                );
            }
            _ => {
                log::info!(
                    "[{}] {} 最新价 {:.4} 24h 区间 {:.4} - {:.4}",
                    self.name,
                    market,
                    summary.last,
                    summary.low,
                    summary.high
                );
            }
        }
        self.last = Some(summary);
        Ok(())
    }

    async fn on_error(&mut self, error: &EngineError) {
        if is_transient(error) {
            log::info!("[{}] 行情暂时不可用，下个周期重试: {}", self.name, error);
        } else {
            log::warn!("[{}] 行情观察出错: {}", self.name, error);
        }
    }

    async fn tear_down(&mut self, _exchanges: &[Arc<dyn Exchange>], _markets: &[Market]) -> Result<()> {
        log::info!("[{}] 停止观察", self.name);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::EngineConfig;
    use crate::exchanges::build_exchanges;
    use crate::exchanges::static_feed::StaticExchange;

    fn btc() -> Market {
        Market::new("BTC", "USDT")
    }

    #[test]
    fn test_rejects_bad_symbol() {
        let params = WatchMarketParams {
            market: Some("BTCUSDT".to_string()),
        };
        assert!(WatchMarket::new("watch", params).is_err());
    }

    #[tokio::test]
    async fn test_update_reads_latest_price() {
        let feed = Arc::new(StaticExchange::new("static").with_price(&btc(), 100.0));
        let exchanges: Vec<Arc<dyn Exchange>> = vec![feed.clone()];
        let markets = vec![btc()];
        let mut strategy = WatchMarket::new("watch", WatchMarketParams::default()).unwrap();

        strategy.setup(&exchanges, &markets).await.unwrap();
        strategy.on_update(&exchanges, &markets).await.unwrap();
        assert_eq!(strategy.last_summary().unwrap().last, 100.0);

        feed.set_summary(MarketSummary::flat("BTC/USDT", 101.5));
        strategy.on_update(&exchanges, &markets).await.unwrap();
        assert_eq!(strategy.last_summary().unwrap().last, 101.5);
    }

    #[tokio::test]
    async fn test_lowercase_config_market_matches_feed() {
        let config = EngineConfig::from_yaml_str(
            "exchanges:\n  - name: paper\n    kind: static\n    prices:\n      BTC/USDT: 1.0\nmarkets:\n  - {base: btc, quote: usdt}\n",
        )
        .unwrap();
        let exchanges = build_exchanges(&config.exchanges).unwrap();
        let mut strategy = WatchMarket::new("watch", WatchMarketParams::default()).unwrap();

        strategy.setup(&exchanges, &config.markets).await.unwrap();
        strategy.on_update(&exchanges, &config.markets).await.unwrap();
        assert_eq!(strategy.last_summary().unwrap().symbol, "BTC/USDT");
    }

    #[tokio::test]
    async fn test_unknown_market_fails_update() {
        let exchanges: Vec<Arc<dyn Exchange>> = vec![Arc::new(StaticExchange::new("static"))];
        let params = WatchMarketParams {
            market: Some("ETH/USDT".to_string()),
        };
        let mut strategy = WatchMarket::new("watch", params).unwrap();

        strategy.setup(&exchanges, &[]).await.unwrap();
        let err = strategy.on_update(&exchanges, &[]).await.unwrap_err();
        assert!(err.to_string().contains("ETH/USDT"));
    }

    #[test]
    fn test_transient_errors_from_exchange() {
        let update = |source: ExchangeError| EngineError::Update {
            strategy: "watch".to_string(),
            tick: 3,
            source: source.into(),
        };

        assert!(is_transient(&update(ExchangeError::ApiError {
            code: 503,
            message: "busy".to_string(),
        })));
        assert!(!is_transient(&update(ExchangeError::SymbolNotFound {
            symbol: "ETH/USDT".to_string(),
            exchange: "static".to_string(),
        })));
        assert!(!is_transient(&EngineError::Setup {
            strategy: "watch".to_string(),
            source: anyhow!("no exchange"),
        }));
    }

    #[tokio::test]
    async fn test_setup_requires_exchange_and_market() {
        let mut strategy = WatchMarket::new("watch", WatchMarketParams::default()).unwrap();
        assert!(strategy.setup(&[], &[btc()]).await.is_err());

        let exchanges: Vec<Arc<dyn Exchange>> = vec![Arc::new(StaticExchange::new("static"))];
        assert!(strategy.setup(&exchanges, &[]).await.is_err());
    }
}
