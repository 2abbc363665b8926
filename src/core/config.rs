use crate::core::error::ExchangeError;
use crate::core::types::Market;
use crate::utils::unified_logger::LogConfig;
use crate::utils::webhook::WebhookConfig;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;

/// 行情源类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExchangeKind {
    Binance,
    Static,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExchangeConfig {
    pub name: String,
    pub kind: ExchangeKind,
    /// 覆盖默认的 REST 地址
    #[serde(default)]
    pub base_url: Option<String>,
    /// 静态行情源的价格表，键为 BASE/QUOTE
    #[serde(default)]
    pub prices: HashMap<String, f64>,
}

/// 单个策略的配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyConfig {
    /// 注册表中的策略类型
    pub kind: String,
    #[serde(default)]
    pub name: Option<String>,
    /// 执行周期（毫秒），0 表示只执行一次，缺省使用策略类型的默认周期
    #[serde(default)]
    pub interval_ms: Option<i64>,
    #[serde(default)]
    pub params: serde_yaml::Value,
}

/// 引擎配置文件
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub log: LogConfig,
    #[serde(default)]
    pub exchanges: Vec<ExchangeConfig>,
    #[serde(default)]
    pub markets: Vec<Market>,
    #[serde(default)]
    pub strategies: Vec<StrategyConfig>,
    #[serde(default)]
    pub webhook: Option<WebhookConfig>,
}

impl EngineConfig {
    /// 从YAML文件加载配置
    pub fn from_file(path: &str) -> Result<Self, ExchangeError> {
        let contents = fs::read_to_string(path)
            .map_err(|e| ExchangeError::ConfigError(format!("读取配置文件失败 {}: {}", path, e)))?;
        Self::from_yaml_str(&contents)
    }

    pub fn from_yaml_str(contents: &str) -> Result<Self, ExchangeError> {
        let config: EngineConfig = serde_yaml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ExchangeError> {
        let mut names = std::collections::HashSet::new();
        for exchange in &self.exchanges {
            if !names.insert(exchange.name.as_str()) {
                return Err(ExchangeError::ConfigError(format!(
                    "交易所名称重复: {}",
                    exchange.name
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
log:
  root_dir: logs
  default_level: debug
  console_output: false
exchanges:
  - name: paper
    kind: static
    prices:
      BTC/USDT: 64000.5
  - name: binance
    kind: binance
markets:
  - base: BTC
    quote: USDT
strategies:
  - kind: watch_market
    interval_ms: 5000
  - kind: one_shot_notice
    name: hello
    params:
      message: started
"#;

    #[test]
    fn test_parse_engine_config() {
        let config = EngineConfig::from_yaml_str(SAMPLE).unwrap();
        assert_eq!(config.exchanges.len(), 2);
        assert_eq!(config.exchanges[0].kind, ExchangeKind::Static);
        assert_eq!(config.exchanges[0].prices["BTC/USDT"], 64000.5);
        assert_eq!(config.markets, vec![Market::new("BTC", "USDT")]);
        assert_eq!(config.strategies[0].interval_ms, Some(5000));
        assert!(config.strategies[0].params.is_null());
        assert_eq!(config.strategies[1].name.as_deref(), Some("hello"));
        assert_eq!(config.log.default_level, "debug");
        assert!(config.webhook.is_none());
    }

    #[test]
    fn test_negative_interval_is_parsed_for_later_validation() {
        let config =
            EngineConfig::from_yaml_str("strategies:\n  - kind: watch_market\n    interval_ms: -1\n")
                .unwrap();
        assert_eq!(config.strategies[0].interval_ms, Some(-1));
    }

    #[test]
    fn test_lowercase_markets_are_normalized() {
        let config =
            EngineConfig::from_yaml_str("markets:\n  - {base: btc, quote: usdt}\n").unwrap();
        assert_eq!(config.markets, vec![Market::new("BTC", "USDT")]);
        assert_eq!(config.markets[0].exchange_symbol(""), "BTCUSDT");
    }

    #[test]
    fn test_duplicate_exchange_rejected() {
        let yaml = "exchanges:\n  - {name: a, kind: static}\n  - {name: a, kind: binance}\n";
        let err = EngineConfig::from_yaml_str(yaml).unwrap_err();
        assert!(matches!(err, ExchangeError::ConfigError(_)));
    }
}
