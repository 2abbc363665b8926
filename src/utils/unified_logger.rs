/// 统一日志管理模块
/// 控制台与滚动文件两路输出，基于 log4rs
use anyhow::Result;
use log::LevelFilter;
use log4rs::append::console::ConsoleAppender;
use log4rs::append::rolling_file::policy::compound::roll::fixed_window::FixedWindowRoller;
use log4rs::append::rolling_file::policy::compound::trigger::size::SizeTrigger;
use log4rs::append::rolling_file::policy::compound::CompoundPolicy;
use log4rs::append::rolling_file::RollingFileAppender;
use log4rs::config::{Appender, Config, Root};
use log4rs::encode::pattern::PatternEncoder;
use serde::{Deserialize, Serialize};
use std::fs;

const DEFAULT_PATTERN: &str = "[{d(%Y-%m-%d %H:%M:%S%.3f)}] [{l}] [{M}] {m}{n}";

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub root_dir: String,
    pub file_name: String,
    pub default_level: String,
    pub max_file_size_mb: u64,
    /// 保留的滚动文件数量
    pub retention_files: u32,
    pub console_output: bool,
    pub pattern: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            root_dir: "logs".to_string(),
            file_name: "engine".to_string(),
            default_level: "INFO".to_string(),
            max_file_size_mb: 10,
            retention_files: 30,
            console_output: true,
            pattern: DEFAULT_PATTERN.to_string(),
        }
    }
}

impl LogConfig {
    /// 解析日志级别，无法识别时退回 INFO
    pub fn level_filter(&self) -> LevelFilter {
        self.default_level.parse().unwrap_or(LevelFilter::Info)
    }

    fn log_path(&self) -> String {
        format!("{}/{}.log", self.root_dir, self.file_name)
    }

    fn roll_pattern(&self) -> String {
        format!("{}/{}.{{}}.log", self.root_dir, self.file_name)
    }
}

/// 初始化全局日志，只能调用一次
pub fn init_logger(config: &LogConfig) -> Result<()> {
    fs::create_dir_all(&config.root_dir)?;

    let roller = FixedWindowRoller::builder()
        .build(&config.roll_pattern(), config.retention_files.max(1))?;
    let trigger = SizeTrigger::new(config.max_file_size_mb.max(1) * 1024 * 1024);
    let policy = CompoundPolicy::new(Box::new(trigger), Box::new(roller));

    let file = RollingFileAppender::builder()
        .encoder(Box::new(PatternEncoder::new(&config.pattern)))
        .build(config.log_path(), Box::new(policy))?;

    let mut builder = Config::builder().appender(Appender::builder().build("file", Box::new(file)));
    let mut root = Root::builder().appender("file");

    if config.console_output {
        let console = ConsoleAppender::builder()
            .encoder(Box::new(PatternEncoder::new(&config.pattern)))
            .build();
        builder = builder.appender(Appender::builder().build("console", Box::new(console)));
        root = root.appender("console");
    }

    let log_config = builder.build(root.build(config.level_filter()))?;
    log4rs::init_config(log_config)?;

    log::info!(
        "日志系统已初始化: {} (级别 {})",
        config.log_path(),
        config.level_filter()
    );
    Ok(())
}
