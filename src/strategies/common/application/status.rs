use chrono::{DateTime, Utc};
use std::time::Duration;

/// 策略运行阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyState {
    Pending,
    Running,
    Stopping,
    Stopped,
}

impl StrategyState {
    /// 合法的状态迁移：Pending → Running → Stopping → Stopped，
    /// 初始化失败时 Pending → Stopping
    pub fn can_advance_to(self, next: StrategyState) -> bool {
        matches!(
            (self, next),
            (StrategyState::Pending, StrategyState::Running)
                | (StrategyState::Pending, StrategyState::Stopping)
                | (StrategyState::Running, StrategyState::Stopping)
                | (StrategyState::Stopping, StrategyState::Stopped)
        )
    }

    pub fn is_terminal(self) -> bool {
        self == StrategyState::Stopped
    }
}

/// 单个策略的运行状态快照
#[derive(Debug, Clone)]
pub struct StrategyStatus {
    pub name: String,
    pub state: StrategyState,
    pub started_at: Option<DateTime<Utc>>,
    pub last_tick_at: Option<DateTime<Utc>>,
    /// 已执行的更新次数
    pub ticks: u64,
    /// 失败的更新次数
    pub failed_ticks: u64,
    pub updated_at: DateTime<Utc>,
    pub last_error: Option<String>,
}

impl StrategyStatus {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: StrategyState::Pending,
            started_at: None,
            last_tick_at: None,
            ticks: 0,
            failed_ticks: 0,
            updated_at: Utc::now(),
            last_error: None,
        }
    }

    /// 推进状态，非法迁移返回 false 且不做修改
    pub fn advance(&mut self, next: StrategyState) -> bool {
        if !self.state.can_advance_to(next) {
            return false;
        }
        self.state = next;
        self.updated_at = Utc::now();
        if next == StrategyState::Running {
            self.started_at = Some(self.updated_at);
        }
        true
    }

    /// 记录一次更新，返回该次更新的序号（从 1 开始）
    pub fn record_tick(&mut self) -> u64 {
        self.ticks += 1;
        self.updated_at = Utc::now();
        self.last_tick_at = Some(self.updated_at);
        self.ticks
    }

    pub fn record_failure(&mut self, error: impl Into<String>) {
        self.failed_ticks += 1;
        self.last_error = Some(error.into());
        self.updated_at = Utc::now();
    }

    /// 任务异常退出时直接标记为已停止
    pub(crate) fn force_stopped(&mut self) {
        self.state = StrategyState::Stopped;
        self.updated_at = Utc::now();
    }

    /// 自进入 Running 起的运行时长
    pub fn uptime(&self) -> Option<Duration> {
        let started = self.started_at?;
        let end = if self.state.is_terminal() {
            self.updated_at
        } else {
            Utc::now()
        };
        end.signed_duration_since(started).to_std().ok()
    }
}
