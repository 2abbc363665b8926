//! Webhook通知模块
//! 策略在钩子中通过通知通道推送消息，通道由策略自身持有

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use log::{debug, error, info, warn};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Webhook消息格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WebhookFormat {
    /// 企业微信 markdown 消息
    WechatWork,
    /// Slack incoming webhook
    Slack,
}

fn default_format() -> WebhookFormat {
    WebhookFormat::WechatWork
}

fn default_min_level() -> String {
    "info".to_string()
}

/// Webhook配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookConfig {
    /// webhook地址
    pub url: String,
    #[serde(default = "default_format")]
    pub format: WebhookFormat,
    /// 是否启用
    pub enabled: bool,
    /// 最小推送级别
    #[serde(default = "default_min_level")]
    pub min_level: String,
    /// 推送间隔限制（秒）
    #[serde(default)]
    pub rate_limit_seconds: u64,
}

/// 消息级别
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum MessageLevel {
    Debug = 0,
    Info = 1,
    Warning = 2,
    Error = 3,
    Critical = 4,
}

impl MessageLevel {
    pub fn from_label(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "debug" => Self::Debug,
            "info" => Self::Info,
            "warning" | "warn" => Self::Warning,
            "error" => Self::Error,
            "critical" => Self::Critical,
            _ => Self::Info,
        }
    }

    pub fn emoji(&self) -> &str {
        match self {
            Self::Debug => "🔍",
            Self::Info => "ℹ️",
            Self::Warning => "⚠️",
            Self::Error => "❌",
            Self::Critical => "🚨",
        }
    }
}

/// 通知通道
///
/// 引擎对通道不做任何重试、超时或限流约束，发送失败以错误形式返回给调用的钩子。
#[async_trait]
pub trait NotificationSink: Send + Sync {
    fn name(&self) -> &str;

    async fn send(&self, strategy: &str, title: &str, body: &str, level: MessageLevel)
        -> Result<()>;
}

/// Webhook通知器
pub struct WebhookNotifier {
    config: WebhookConfig,
    client: Client,
    /// 上次发送时间记录（用于限流）
    last_send_times: RwLock<HashMap<String, DateTime<Utc>>>,
}

impl WebhookNotifier {
    pub fn new(config: WebhookConfig) -> Self {
        Self {
            config,
            client: Client::new(),
            last_send_times: RwLock::new(HashMap::new()),
        }
    }

    /// 限流窗口，超出范围时按最大值处理
    fn rate_limit_window(&self) -> Duration {
        i64::try_from(self.config.rate_limit_seconds)
            .ok()
            .and_then(Duration::try_seconds)
            .unwrap_or(Duration::MAX)
    }

    /// 检查限流
    async fn check_rate_limit(&self, key: &str) -> bool {
        if self.config.rate_limit_seconds == 0 {
            return true;
        }

        let mut times = self.last_send_times.write().await;
        let now = Utc::now();

        if let Some(last_time) = times.get(key) {
            let elapsed = now.signed_duration_since(*last_time);
            if elapsed < self.rate_limit_window() {
                return false;
            }
        }

        times.insert(key.to_string(), now);
        true
    }

    fn build_payload(
        &self,
        strategy: &str,
        title: &str,
        body: &str,
        level: MessageLevel,
    ) -> serde_json::Value {
        let now = Utc::now().format("%Y-%m-%d %H:%M:%S UTC").to_string();
        match self.config.format {
            WebhookFormat::WechatWork => {
                let content = format!(
                    "## {} {}\n\n**策略**: {}\n**级别**: {:?}\n**时间**: {}\n\n{}",
                    level.emoji(),
                    title,
                    strategy,
                    level,
                    now,
                    body
                );
                json!({ "msgtype": "markdown", "markdown": { "content": content } })
            }
            WebhookFormat::Slack => {
                let text = format!(
                    "{} *{}* [{}] {}\n{}",
                    level.emoji(),
                    title,
                    strategy,
                    now,
                    body
                );
                json!({ "text": text })
            }
        }
    }
}

#[async_trait]
impl NotificationSink for WebhookNotifier {
    fn name(&self) -> &str {
        "webhook"
    }

    async fn send(
        &self,
        strategy: &str,
        title: &str,
        body: &str,
        level: MessageLevel,
    ) -> Result<()> {
        if !self.config.enabled {
            return Ok(());
        }

        if level < MessageLevel::from_label(&self.config.min_level) {
            return Ok(());
        }

        let key = format!("{}::{}", strategy, title);
        if !self.check_rate_limit(&key).await {
            debug!("跳过推送，限流中: {}", key);
            return Ok(());
        }

        let payload = self.build_payload(strategy, title, body, level);
        let response = self
            .client
            .post(&self.config.url)
            .json(&payload)
            .send()
            .await?;

        if response.status().is_success() {
            info!("成功发送Webhook通知: {}", key);
            Ok(())
        } else {
            warn!("Webhook发送失败: {}", response.status());
            Err(anyhow!("Webhook发送失败: {}", response.status()))
        }
    }
}

/// 写入日志的通知通道，未配置 webhook 时使用
#[derive(Debug, Default)]
pub struct LogSink;

#[async_trait]
impl NotificationSink for LogSink {
    fn name(&self) -> &str {
        "log"
    }

    async fn send(
        &self,
        strategy: &str,
        title: &str,
        body: &str,
        level: MessageLevel,
    ) -> Result<()> {
        match level {
            MessageLevel::Error | MessageLevel::Critical => {
                error!("[{}] {} {}: {}", strategy, level.emoji(), title, body)
            }
            MessageLevel::Warning => warn!("[{}] {} {}: {}", strategy, level.emoji(), title, body),
            MessageLevel::Info => info!("[{}] {} {}: {}", strategy, level.emoji(), title, body),
            MessageLevel::Debug => debug!("[{}] {}: {}", strategy, title, body),
        }
        Ok(())
    }
}

/// 根据配置创建通知通道
pub fn build_sink(config: Option<&WebhookConfig>) -> Box<dyn NotificationSink> {
    match config {
        Some(config) if config.enabled => Box::new(WebhookNotifier::new(config.clone())),
        _ => Box::new(LogSink),
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// 记录所有消息的内存通道
    #[derive(Clone, Default)]
    pub(crate) struct RecordingSink {
        pub messages: Arc<Mutex<Vec<(String, String, String)>>>,
        pub fail: bool,
    }

    impl RecordingSink {
        pub fn sent(&self) -> Vec<(String, String, String)> {
            self.messages.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl NotificationSink for RecordingSink {
        fn name(&self) -> &str {
            "memory"
        }

        async fn send(
            &self,
            strategy: &str,
            title: &str,
            body: &str,
            _level: MessageLevel,
        ) -> Result<()> {
            if self.fail {
                return Err(anyhow!("sink offline"));
            }
            self.messages.lock().unwrap().push((
                strategy.to_string(),
                title.to_string(),
                body.to_string(),
            ));
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(format: WebhookFormat) -> WebhookConfig {
        WebhookConfig {
            url: "http://127.0.0.1:9/hook".to_string(),
            format,
            enabled: true,
            min_level: "warning".to_string(),
            rate_limit_seconds: 60,
        }
    }

    #[test]
    fn test_message_level_order() {
        assert!(MessageLevel::Critical > MessageLevel::Error);
        assert_eq!(MessageLevel::from_label("WARN"), MessageLevel::Warning);
        assert_eq!(MessageLevel::from_label("unknown"), MessageLevel::Info);
    }

    #[test]
    fn test_payload_formats() {
        let wechat = WebhookNotifier::new(config(WebhookFormat::WechatWork));
        let payload = wechat.build_payload("watch", "行情", "BTC 上涨", MessageLevel::Warning);
        assert_eq!(payload["msgtype"], "markdown");
        assert!(payload["markdown"]["content"]
            .as_str()
            .unwrap()
            .contains("BTC 上涨"));

        let slack = WebhookNotifier::new(config(WebhookFormat::Slack));
        let payload = slack.build_payload("watch", "行情", "BTC 上涨", MessageLevel::Warning);
        assert!(payload["text"].as_str().unwrap().contains("*行情*"));
    }

    #[tokio::test]
    async fn test_rate_limit_per_key() {
        let notifier = WebhookNotifier::new(config(WebhookFormat::Slack));
        assert!(notifier.check_rate_limit("a::x").await);
        assert!(!notifier.check_rate_limit("a::x").await);
        assert!(notifier.check_rate_limit("b::x").await);
    }

    #[tokio::test]
    async fn test_huge_rate_limit_saturates() {
        let mut huge = config(WebhookFormat::Slack);
        huge.rate_limit_seconds = u64::MAX;
        let notifier = WebhookNotifier::new(huge);
        assert_eq!(notifier.rate_limit_window(), Duration::MAX);
        assert!(notifier.check_rate_limit("a::x").await);
        assert!(!notifier.check_rate_limit("a::x").await);

        let mut wide = config(WebhookFormat::Slack);
        wide.rate_limit_seconds = i64::MAX as u64;
        let notifier = WebhookNotifier::new(wide);
        assert_eq!(notifier.rate_limit_window(), Duration::MAX);
    }

    #[tokio::test]
    async fn test_filtered_messages_skip_network() {
        // 低于最小级别的消息不会发出请求
        let notifier = WebhookNotifier::new(config(WebhookFormat::WechatWork));
        notifier
            .send("watch", "tick", "noise", MessageLevel::Info)
            .await
            .unwrap();

        let mut disabled = config(WebhookFormat::WechatWork);
        disabled.enabled = false;
        assert_eq!(build_sink(Some(&disabled)).name(), "log");
        assert_eq!(build_sink(None).name(), "log");
        assert_eq!(
            build_sink(Some(&config(WebhookFormat::Slack))).name(),
            "webhook"
        );
    }
}
