use anyhow::{anyhow, Result};
use clap::{Arg, Command};
use rustcta_interval::{
    core::config::EngineConfig,
    exchanges::build_exchanges,
    strategies::common::{run, StrategyContext, StrategyRegistry},
    utils::unified_logger::init_logger,
};

#[tokio::main]
async fn main() -> Result<()> {
    // 解析命令行参数
    let matches = Command::new("rustcta-interval")
        .version("0.1")
        .about("周期策略执行引擎")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("引擎配置文件路径")
                .required(true),
        )
        .arg(
            Arg::new("log-level")
                .short('l')
                .long("log-level")
                .value_name("LEVEL")
                .help("覆盖配置中的日志级别: TRACE, DEBUG, INFO, WARN, ERROR"),
        )
        .get_matches();

    let config_file = matches
        .get_one::<String>("config")
        .ok_or_else(|| anyhow!("缺少 --config 参数"))?;
    let mut config = EngineConfig::from_file(config_file)?;
    if let Some(level) = matches.get_one::<String>("log-level") {
        config.log.default_level = level.to_uppercase();
    }

    // 初始化统一日志系统
    init_logger(&config.log)?;
    log::info!("启动周期策略引擎, 配置文件: {}", config_file);

    let exchanges = build_exchanges(&config.exchanges)?;
    let ctx = StrategyContext::new(config.webhook.clone());
    let registry = StrategyRegistry::default();
    let strategies = registry.create_all(&config.strategies, &ctx)?;
    if strategies.is_empty() {
        log::warn!("配置中没有任何策略，可用类型: {:?}", registry.kinds());
        return Ok(());
    }

    let mut handle = run(strategies, exchanges, config.markets.clone());

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                log::error!("监听退出信号失败: {}", e);
            }
            log::info!("收到退出信号，正在停止所有策略...");
        }
        _ = handle.finished() => {
            log::info!("所有策略均已结束");
        }
    }

    let report = handle.stop().await;
    for outcome in &report.outcomes {
        log::info!(
            "策略 {} 已停止: 更新 {} 次, 失败 {} 次, 运行时长 {:?}",
            outcome.name(),
            outcome.status.ticks,
            outcome.status.failed_ticks,
            outcome.status.uptime()
        );
    }
    for error in report.errors() {
        log::error!("{}", error);
    }
    if report.is_clean() {
        log::info!("✅ 引擎已正常退出");
    } else {
        log::warn!("引擎已退出，部分策略存在错误");
    }
    Ok(())
}
