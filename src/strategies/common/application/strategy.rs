use std::fmt;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use crate::core::error::EngineError;
use crate::core::exchange::Exchange;
use crate::core::types::Market;

/// 策略生命周期钩子
///
/// 四个钩子都可以不实现，默认行为为空操作。钩子对象由所属策略的任务独占，
/// 策略私有的状态（例如通知通道客户端）应放在实现者自身的字段里，在 `setup`
/// 中创建，在 `tear_down` 中释放。
#[async_trait]
pub trait StrategyHooks: Send {
    /// 第一次更新前调用一次
    async fn setup(&mut self, _exchanges: &[Arc<dyn Exchange>], _markets: &[Market]) -> Result<()> {
        Ok(())
    }

    /// 每个周期调用一次
    async fn on_update(
        &mut self,
        _exchanges: &[Arc<dyn Exchange>],
        _markets: &[Market],
    ) -> Result<()> {
        Ok(())
    }

    /// `setup` 或 `on_update` 失败时调用，不做任何自动恢复
    async fn on_error(&mut self, _error: &EngineError) {}

    /// 策略停止时调用一次，仅当 `setup` 成功
    async fn tear_down(
        &mut self,
        _exchanges: &[Arc<dyn Exchange>],
        _markets: &[Market],
    ) -> Result<()> {
        Ok(())
    }
}

/// 策略模型：名称加一组钩子，本身不持有调度状态
pub struct StrategyModel {
    name: String,
    hooks: Box<dyn StrategyHooks>,
}

impl StrategyModel {
    pub fn new(name: impl Into<String>, hooks: impl StrategyHooks + 'static) -> Self {
        Self::from_boxed(name, Box::new(hooks))
    }

    pub fn from_boxed(name: impl Into<String>, hooks: Box<dyn StrategyHooks>) -> Self {
        Self {
            name: name.into(),
            hooks,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn rename(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub(crate) fn hooks_mut(&mut self) -> &mut dyn StrategyHooks {
        self.hooks.as_mut()
    }
}

impl fmt::Debug for StrategyModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StrategyModel")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}
