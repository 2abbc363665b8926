use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use serde::de::DeserializeOwned;
use serde_yaml::Value;

use super::{IntervalStrategy, StrategyContext, StrategyHooks, StrategyModel};
use crate::core::config::StrategyConfig;
use crate::core::error::EngineError;
use crate::strategies::notify::NotifyStrategy;
use crate::strategies::watch_market::WatchMarket;

/// 策略工厂函数签名
pub type StrategyFactoryFn =
    dyn Fn(&str, &Value, &StrategyContext) -> Result<Box<dyn StrategyHooks>> + Send + Sync;

struct RegisteredKind {
    default_interval: Duration,
    factory: Arc<StrategyFactoryFn>,
}

/// 策略注册表，运行时按类型名称创建策略实例
pub struct StrategyRegistry {
    kinds: HashMap<String, RegisteredKind>,
}

impl StrategyRegistry {
    pub fn new() -> Self {
        Self {
            kinds: HashMap::new(),
        }
    }

    pub fn register<F>(&mut self, kind: impl Into<String>, default_interval: Duration, factory: F)
    where
        F: Fn(&str, &Value, &StrategyContext) -> Result<Box<dyn StrategyHooks>>
            + Send
            + Sync
            + 'static,
    {
        self.kinds.insert(
            kind.into(),
            RegisteredKind {
                default_interval,
                factory: Arc::new(factory),
            },
        );
    }

    pub fn kinds(&self) -> Vec<&str> {
        let mut kinds: Vec<&str> = self.kinds.keys().map(String::as_str).collect();
        kinds.sort_unstable();
        kinds
    }

    /// 按配置创建一个周期策略，未指定名称时使用类型名
    pub fn create(
        &self,
        config: &StrategyConfig,
        ctx: &StrategyContext,
    ) -> std::result::Result<IntervalStrategy, EngineError> {
        let name = config
            .name
            .clone()
            .unwrap_or_else(|| config.kind.clone());
        let registered = self.kinds.get(&config.kind).ok_or_else(|| {
            EngineError::configuration(&name, format!("未注册的策略类型: {}", config.kind))
        })?;

        let hooks = (registered.factory)(name.as_str(), &config.params, ctx)
            .map_err(|e| EngineError::configuration(&name, format!("策略参数无效: {:#}", e)))?;
        let model = StrategyModel::from_boxed(name, hooks);

        match config.interval_ms {
            Some(millis) => IntervalStrategy::from_millis(model, millis),
            None => Ok(IntervalStrategy::new(model, registered.default_interval)),
        }
    }

    /// 创建全部策略，任一配置错误都会中止
    pub fn create_all(
        &self,
        configs: &[StrategyConfig],
        ctx: &StrategyContext,
    ) -> std::result::Result<Vec<IntervalStrategy>, EngineError> {
        configs.iter().map(|config| self.create(config, ctx)).collect()
    }
}

impl Default for StrategyRegistry {
    fn default() -> Self {
        let mut registry = StrategyRegistry::new();
        registry.register("watch_market", Duration::from_secs(5), |name, params, _ctx| {
            Ok(Box::new(WatchMarket::new(name, parse_params(params)?)?))
        });
        registry.register("webhook_alert", Duration::from_secs(10), |name, params, ctx| {
            Ok(Box::new(NotifyStrategy::periodic(
                name,
                parse_params(params)?,
                ctx.sink_factory.clone(),
            )))
        });
        registry.register("one_shot_notice", Duration::ZERO, |name, params, ctx| {
            Ok(Box::new(NotifyStrategy::one_shot(
                name,
                parse_params(params)?,
                ctx.sink_factory.clone(),
            )))
        });
        registry
    }
}

/// 解析策略参数，缺省时使用默认值
pub fn parse_params<T>(value: &Value) -> Result<T>
where
    T: DeserializeOwned + Default,
{
    if value.is_null() {
        return Ok(T::default());
    }
    Ok(serde_yaml::from_value(value.clone())?)
}
