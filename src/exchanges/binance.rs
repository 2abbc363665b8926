use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;

use crate::core::{
    error::ExchangeError,
    exchange::Exchange,
    types::{Market, MarketSummary, Result},
};

const DEFAULT_BASE_URL: &str = "https://api.binance.com";

/// 币安现货公共行情
pub struct BinanceExchange {
    name: String,
    base_url: String,
    client: Client,
}

#[derive(Deserialize)]
struct BinanceSpotTicker {
    #[serde(rename = "highPrice")]
    high_price: String,
    #[serde(rename = "lowPrice")]
    low_price: String,
    #[serde(rename = "bidPrice")]
    bid_price: String,
    #[serde(rename = "askPrice")]
    ask_price: String,
    #[serde(rename = "lastPrice")]
    last_price: String,
    volume: String,
    #[serde(rename = "closeTime")]
    close_time: i64,
}

#[derive(Deserialize)]
struct BinanceErrorBody {
    code: i32,
    msg: String,
}

impl BinanceExchange {
    pub fn new(name: impl Into<String>, base_url: Option<String>) -> Self {
        Self {
            name: name.into(),
            base_url: base_url
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            client: Client::new(),
        }
    }

    async fn send_public_request<T>(&self, endpoint: &str, params: &[(&str, String)]) -> Result<T>
    where
        T: for<'de> Deserialize<'de>,
    {
        let url = format!("{}{}", self.base_url, endpoint);
        let response = self.client.get(&url).query(params).send().await?;

        if response.status().is_success() {
            let data = response.json::<T>().await?;
            Ok(data)
        } else {
            let status_code = response.status().as_u16() as i32;
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "未知错误".to_string());
            Err(ExchangeError::ApiError {
                code: status_code,
                message: error_text,
            })
        }
    }

    fn to_summary(market: &Market, ticker: BinanceSpotTicker) -> Result<MarketSummary> {
        let parse = |field: &str, value: &str| -> Result<f64> {
            value
                .parse::<f64>()
                .map_err(|e| ExchangeError::Other(format!("{} 解析失败 '{}': {}", field, value, e)))
        };

        Ok(MarketSummary {
            symbol: market.symbol(),
            high: parse("highPrice", &ticker.high_price)?,
            low: parse("lowPrice", &ticker.low_price)?,
            bid: parse("bidPrice", &ticker.bid_price)?,
            ask: parse("askPrice", &ticker.ask_price)?,
            last: parse("lastPrice", &ticker.last_price)?,
            volume: parse("volume", &ticker.volume)?,
            timestamp: DateTime::from_timestamp_millis(ticker.close_time).unwrap_or_else(Utc::now),
        })
    }
}

#[async_trait]
impl Exchange for BinanceExchange {
    fn name(&self) -> &str {
        &self.name
    }

    async fn get_market_summary(&self, market: &Market) -> Result<MarketSummary> {
        let symbol = market.exchange_symbol("");
        let result: Result<BinanceSpotTicker> = self
            .send_public_request("/api/v3/ticker/24hr", &[("symbol", symbol.clone())])
            .await;

        match result {
            Ok(ticker) => Self::to_summary(market, ticker),
            Err(ExchangeError::ApiError { code: 400, message }) => {
                // -1121: Invalid symbol
                match serde_json::from_str::<BinanceErrorBody>(&message) {
                    Ok(body) if body.code == -1121 => Err(ExchangeError::SymbolNotFound {
                        symbol: market.symbol(),
                        exchange: self.name.clone(),
                    }),
                    Ok(body) => Err(ExchangeError::ApiError {
                        code: body.code,
                        message: body.msg,
                    }),
                    Err(_) => Err(ExchangeError::ApiError { code: 400, message }),
                }
            }
            Err(e) => Err(e),
        }
    }
}
