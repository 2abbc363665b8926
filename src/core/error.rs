use thiserror::Error;

/// 行情源错误
#[derive(Error, Debug)]
pub enum ExchangeError {
    #[error("网络请求错误: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("JSON序列化错误: {0}")]
    SerdeError(#[from] serde_json::Error),

    #[error("YAML配置错误: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("API错误: {code} - {message}")]
    ApiError { code: i32, message: String },

    #[error("交易对未找到: {symbol} (交易所: {exchange})")]
    SymbolNotFound { symbol: String, exchange: String },

    #[error("配置错误: {0}")]
    ConfigError(String),

    #[error("其他错误: {0}")]
    Other(String),
}

impl ExchangeError {
    /// 判断错误是否可以重试，重试策略由策略自行决定
    pub fn is_retryable(&self) -> bool {
        match self {
            ExchangeError::NetworkError(_) => true,
            ExchangeError::ApiError { code, .. } => {
                // HTTP 5xx 和 429 通常可以重试
                *code == 429 || (*code >= 500 && *code < 600)
            }
            _ => false,
        }
    }
}

/// 策略引擎错误
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("策略配置错误 [{strategy}]: {reason}")]
    Configuration { strategy: String, reason: String },

    #[error("策略初始化失败 [{strategy}]: {source}")]
    Setup {
        strategy: String,
        source: anyhow::Error,
    },

    #[error("策略更新失败 [{strategy}] 第{tick}次: {source}")]
    Update {
        strategy: String,
        tick: u64,
        source: anyhow::Error,
    },

    #[error("策略清理失败 [{strategy}]: {source}")]
    Teardown {
        strategy: String,
        source: anyhow::Error,
    },

    #[error("策略任务异常退出 [{strategy}]: {reason}")]
    TaskPanicked { strategy: String, reason: String },
}

impl EngineError {
    pub fn configuration(strategy: impl Into<String>, reason: impl Into<String>) -> Self {
        EngineError::Configuration {
            strategy: strategy.into(),
            reason: reason.into(),
        }
    }

    /// 出错的策略名称
    pub fn strategy(&self) -> &str {
        match self {
            EngineError::Configuration { strategy, .. }
            | EngineError::Setup { strategy, .. }
            | EngineError::Update { strategy, .. }
            | EngineError::Teardown { strategy, .. }
            | EngineError::TaskPanicked { strategy, .. } => strategy,
        }
    }

    /// 是否导致策略终止
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            EngineError::Update { .. } | EngineError::Teardown { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_api_errors() {
        let server = ExchangeError::ApiError {
            code: 503,
            message: "unavailable".to_string(),
        };
        let throttled = ExchangeError::ApiError {
            code: 429,
            message: "too many requests".to_string(),
        };
        let bad_request = ExchangeError::ApiError {
            code: 400,
            message: "invalid symbol".to_string(),
        };
        assert!(server.is_retryable());
        assert!(throttled.is_retryable());
        assert!(!bad_request.is_retryable());
        assert!(!ExchangeError::ConfigError("x".to_string()).is_retryable());
    }

    #[test]
    fn test_engine_error_classification() {
        let update = EngineError::Update {
            strategy: "watch".to_string(),
            tick: 3,
            source: anyhow::anyhow!("timeout"),
        };
        assert_eq!(update.strategy(), "watch");
        assert!(!update.is_fatal());
        assert!(update.to_string().contains("第3次"));

        let setup = EngineError::Setup {
            strategy: "alert".to_string(),
            source: anyhow::anyhow!("token rejected"),
        };
        assert!(setup.is_fatal());
        assert!(std::error::Error::source(&setup).is_some());

        assert!(EngineError::configuration("x", "interval < 0").is_fatal());
    }
}
