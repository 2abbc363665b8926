use std::sync::Arc;

use anyhow::Result;

use crate::utils::webhook::{build_sink, NotificationSink, WebhookConfig};

/// 通知通道工厂，策略在 setup 中调用以获得自己独占的通道
pub type SinkFactory = Arc<dyn Fn() -> Result<Box<dyn NotificationSink>> + Send + Sync>;

/// 策略上下文，由运行时环境统一构建后交给策略工厂
#[derive(Clone)]
pub struct StrategyContext {
    pub webhook: Option<WebhookConfig>,
    pub sink_factory: SinkFactory,
}

impl StrategyContext {
    pub fn new(webhook: Option<WebhookConfig>) -> Self {
        let config = webhook.clone();
        Self {
            webhook,
            sink_factory: Arc::new(move || Ok(build_sink(config.as_ref()))),
        }
    }

    pub fn with_sink_factory<F>(mut self, factory: F) -> Self
    where
        F: Fn() -> Result<Box<dyn NotificationSink>> + Send + Sync + 'static,
    {
        self.sink_factory = Arc::new(factory);
        self
    }
}

impl Default for StrategyContext {
    fn default() -> Self {
        Self::new(None)
    }
}
