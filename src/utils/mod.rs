pub mod unified_logger;
pub mod webhook;

pub use unified_logger::{init_logger, LogConfig};
pub use webhook::{build_sink, LogSink, MessageLevel, NotificationSink, WebhookConfig, WebhookNotifier};
