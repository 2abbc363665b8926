use std::sync::Arc;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde::Deserialize;

use crate::core::error::EngineError;
use crate::core::exchange::Exchange;
use crate::core::types::Market;
use crate::strategies::common::{SinkFactory, StrategyHooks};
use crate::utils::webhook::{MessageLevel, NotificationSink};

fn default_title() -> String {
    "行情提醒".to_string()
}

fn default_message() -> String {
    "行情有变动，请关注".to_string()
}

/// 通知策略参数
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NotifyParams {
    #[serde(default = "default_title")]
    pub title: String,
    #[serde(default = "default_message")]
    pub message: String,
    /// 消息级别 debug/info/warning/error/critical
    pub level: String,
}

impl Default for NotifyParams {
    fn default() -> Self {
        Self {
            title: default_title(),
            message: default_message(),
            level: "info".to_string(),
        }
    }
}

/// 通过通知通道发送消息的策略
///
/// 通道在 `setup` 中由工厂创建，归本策略独占。单次模式下出错即释放通道。
pub struct NotifyStrategy {
    name: String,
    params: NotifyParams,
    factory: SinkFactory,
    sink: Option<Box<dyn NotificationSink>>,
    release_on_error: bool,
    sent: u64,
}

impl NotifyStrategy {
    /// 周期发送
    pub fn periodic(name: &str, params: NotifyParams, factory: SinkFactory) -> Self {
        Self {
            name: name.to_string(),
            params,
            factory,
            sink: None,
            release_on_error: false,
            sent: 0,
        }
    }

    /// 只发送一次，配合零周期使用
    pub fn one_shot(name: &str, params: NotifyParams, factory: SinkFactory) -> Self {
        Self {
            release_on_error: true,
            ..Self::periodic(name, params, factory)
        }
    }

    pub fn sent(&self) -> u64 {
        self.sent
    }

    pub fn is_connected(&self) -> bool {
        self.sink.is_some()
    }

    fn release(&mut self) {
        if let Some(sink) = self.sink.take() {
            log::debug!("[{}] 释放通知通道 {}", self.name, sink.name());
        }
    }
}

#[async_trait]
impl StrategyHooks for NotifyStrategy {
    async fn setup(&mut self, _exchanges: &[Arc<dyn Exchange>], _markets: &[Market]) -> Result<()> {
        let sink = (self.factory)()?;
        log::info!("[{}] 通知通道已就绪: {}", self.name, sink.name());
        self.sink = Some(sink);
        Ok(())
    }

    async fn on_update(&mut self, _exchanges: &[Arc<dyn Exchange>], _markets: &[Market]) -> Result<()> {
        let sink = self
            .sink
            .as_ref()
            .ok_or_else(|| anyhow!("通知通道未初始化"))?;
        sink.send(
            &self.name,
            &self.params.title,
            &self.params.message,
            MessageLevel::from_label(&self.params.level),
        )
        .await?;
        self.sent += 1;
        Ok(())
    }

    async fn on_error(&mut self, error: &EngineError) {
        log::error!("[{}] 通知发送失败: {}", self.name, error);
        if self.release_on_error {
            self.release();
        }
    }

    async fn tear_down(&mut self, _exchanges: &[Arc<dyn Exchange>], _markets: &[Market]) -> Result<()> {
        self.release();
        Ok(())
    }
}
