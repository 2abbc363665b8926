use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

pub type Result<T> = std::result::Result<T, crate::core::error::ExchangeError>;

/// 交易市场（基础币/计价币）
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "RawMarket")]
pub struct Market {
    pub base: String,
    pub quote: String,
}

/// 配置中的原始写法，统一经过 `Market::new` 转为大写
#[derive(Deserialize)]
struct RawMarket {
    base: String,
    quote: String,
}

impl From<RawMarket> for Market {
    fn from(raw: RawMarket) -> Self {
        Market::new(raw.base.trim(), raw.quote.trim())
    }
}

impl Market {
    pub fn new(base: impl Into<String>, quote: impl Into<String>) -> Self {
        Self {
            base: base.into().to_uppercase(),
            quote: quote.into().to_uppercase(),
        }
    }

    /// 解析 "BTC/USDT" 格式的交易对
    pub fn parse(symbol: &str) -> Option<Self> {
        let (base, quote) = symbol.split_once('/')?;
        let (base, quote) = (base.trim(), quote.trim());
        if base.is_empty() || quote.is_empty() {
            return None;
        }
        Some(Self::new(base, quote))
    }

    /// 统一格式 BASE/QUOTE
    pub fn symbol(&self) -> String {
        format!("{}/{}", self.base, self.quote)
    }

    /// 交易所格式，例如币安为 BTCUSDT
    pub fn exchange_symbol(&self, separator: &str) -> String {
        format!("{}{}{}", self.base, separator, self.quote)
    }
}

impl fmt::Display for Market {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.base, self.quote)
    }
}

/// 市场概要（24小时行情）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketSummary {
    pub symbol: String,
    pub high: f64,
    pub low: f64,
    pub bid: f64,
    pub ask: f64,
    pub last: f64,
    pub volume: f64,
    pub timestamp: DateTime<Utc>,
}

impl MarketSummary {
    /// 以单一价格构造概要，用于静态行情源
    pub fn flat(symbol: impl Into<String>, price: f64) -> Self {
        Self {
            symbol: symbol.into(),
            high: price,
            low: price,
            bid: price,
            ask: price,
            last: price,
            volume: 0.0,
            timestamp: Utc::now(),
        }
    }

    pub fn spread(&self) -> f64 {
        self.ask - self.bid
    }

    pub fn mid(&self) -> f64 {
        (self.ask + self.bid) / 2.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_market_parse() {
        let market = Market::parse("btc/usdt").unwrap();
        assert_eq!(market.base, "BTC");
        assert_eq!(market.quote, "USDT");
        assert_eq!(market.symbol(), "BTC/USDT");
        assert_eq!(market.exchange_symbol(""), "BTCUSDT");

        assert!(Market::parse("BTCUSDT").is_none());
        assert!(Market::parse("/USDT").is_none());
    }

    #[test]
    fn test_summary_mid_and_spread() {
        let mut summary = MarketSummary::flat("ETH/USDT", 100.0);
        summary.bid = 99.0;
        summary.ask = 101.0;
        assert_eq!(summary.spread(), 2.0);
        assert_eq!(summary.mid(), 100.0);
    }
}
