use std::time::Duration;

use crate::core::error::EngineError;

use super::strategy::StrategyModel;

/// 绑定固定执行周期的策略，是引擎调度的基本单位
#[derive(Debug)]
pub struct IntervalStrategy {
    pub(crate) model: StrategyModel,
    interval: Duration,
}

impl IntervalStrategy {
    /// 周期为零表示只执行一次
    pub fn new(model: StrategyModel, interval: Duration) -> Self {
        Self { model, interval }
    }

    /// 从有符号毫秒数构建，负数视为配置错误
    pub fn from_millis(model: StrategyModel, millis: i64) -> Result<Self, EngineError> {
        if millis < 0 {
            return Err(EngineError::configuration(
                model.name(),
                format!("执行周期不能为负数: {}ms", millis),
            ));
        }
        Ok(Self::new(model, Duration::from_millis(millis as u64)))
    }

    pub fn name(&self) -> &str {
        self.model.name()
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn is_single_shot(&self) -> bool {
        self.interval.is_zero()
    }
}
