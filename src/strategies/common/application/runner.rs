//! 周期策略调度器
//!
//! 每个策略运行在独立的任务中，生命周期为 setup → (on_update | on_error)* → tear_down。
//! 停止信号是协作式的：不会打断正在执行的钩子，只阻止下一次更新开始。

use std::any::Any;
use std::collections::HashSet;
use std::sync::Arc;

use futures_util::future::join_all;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};

use crate::core::error::EngineError;
use crate::core::exchange::Exchange;
use crate::core::types::Market;

use super::interval::IntervalStrategy;
use super::status::{StrategyState, StrategyStatus};

/// 所有策略共享的只读环境
struct SharedEnv {
    exchanges: Vec<Arc<dyn Exchange>>,
    markets: Vec<Market>,
}

/// 单个策略的最终结果
#[derive(Debug)]
pub struct StrategyOutcome {
    pub status: StrategyStatus,
    /// 初始化失败或任务异常退出
    pub fatal: Option<EngineError>,
    pub teardown_error: Option<EngineError>,
}

impl StrategyOutcome {
    pub fn name(&self) -> &str {
        &self.status.name
    }

    pub fn is_clean(&self) -> bool {
        self.fatal.is_none() && self.teardown_error.is_none()
    }
}

/// 引擎停止后的汇总
#[derive(Debug, Default)]
pub struct RunReport {
    pub outcomes: Vec<StrategyOutcome>,
}

impl RunReport {
    pub fn get(&self, name: &str) -> Option<&StrategyOutcome> {
        self.outcomes.iter().find(|outcome| outcome.name() == name)
    }

    pub fn is_clean(&self) -> bool {
        self.outcomes.iter().all(StrategyOutcome::is_clean)
    }

    pub fn errors(&self) -> impl Iterator<Item = &EngineError> {
        self.outcomes
            .iter()
            .flat_map(|outcome| outcome.fatal.iter().chain(outcome.teardown_error.iter()))
    }
}

struct StrategyTask {
    name: String,
    status: watch::Receiver<StrategyStatus>,
    join: JoinHandle<StrategyOutcome>,
}

impl StrategyTask {
    async fn finish(self) -> StrategyOutcome {
        match self.join.await {
            Ok(outcome) => outcome,
            Err(err) => {
                let reason = if err.is_panic() {
                    panic_message(err.into_panic())
                } else {
                    err.to_string()
                };
                let mut status = self.status.borrow().clone();
                status.force_stopped();
                status.last_error = Some(reason.clone());

                let error = EngineError::TaskPanicked {
                    strategy: self.name,
                    reason,
                };
                log::error!("{}", error);
                StrategyOutcome {
                    status,
                    fatal: Some(error),
                    teardown_error: None,
                }
            }
        }
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "未知panic".to_string()
    }
}

/// 运行中的引擎句柄
///
/// 句柄被丢弃时同样会发出停止信号，各策略仍会完成清理。
pub struct RunHandle {
    shutdown: watch::Sender<bool>,
    tasks: Vec<StrategyTask>,
    report: Option<RunReport>,
}

impl RunHandle {
    /// 当前各策略的状态快照
    pub fn status(&self) -> Vec<StrategyStatus> {
        match &self.report {
            Some(report) => report
                .outcomes
                .iter()
                .map(|outcome| outcome.status.clone())
                .collect(),
            None => self
                .tasks
                .iter()
                .map(|task| task.status.borrow().clone())
                .collect(),
        }
    }

    /// 发出停止信号但不等待
    pub fn request_stop(&self) {
        if !self.shutdown.send_replace(true) {
            log::info!("收到停止信号，正在关闭策略...");
        }
    }

    pub fn is_stop_requested(&self) -> bool {
        *self.shutdown.borrow()
    }

    /// 等待所有策略自然结束（单次策略或初始化失败），不发出停止信号
    pub async fn finished(&self) {
        for task in &self.tasks {
            let mut status = task.status.clone();
            // 任务异常退出时发送端被丢弃，同样视为结束
            let _ = status.wait_for(|s| s.state.is_terminal()).await;
        }
    }

    /// 停止所有策略并等待全部进入 Stopped，可重复调用
    pub async fn stop(&mut self) -> &RunReport {
        self.request_stop();
        self.collect().await
    }

    /// 等待所有策略自然结束后返回汇总
    pub async fn wait(&mut self) -> &RunReport {
        self.finished().await;
        self.collect().await
    }

    pub fn report(&self) -> Option<&RunReport> {
        self.report.as_ref()
    }

    async fn collect(&mut self) -> &RunReport {
        if self.report.is_none() {
            let tasks = std::mem::take(&mut self.tasks);
            let outcomes = join_all(tasks.into_iter().map(StrategyTask::finish)).await;
            let report = RunReport { outcomes };
            for error in report.errors() {
                if error.is_fatal() {
                    log::error!("策略异常汇总: {}", error);
                } else {
                    log::warn!("策略异常汇总: {}", error);
                }
            }
            log::info!("所有策略已停止，共 {} 个", report.outcomes.len());
            self.report = Some(report);
        }
        self.report.get_or_insert_with(RunReport::default)
    }
}

impl Drop for RunHandle {
    fn drop(&mut self) {
        self.shutdown.send_replace(true);
    }
}

/// 启动一组周期策略
///
/// 必须在 tokio 运行时内调用。未命名的策略使用 `strategy-<序号>` 作为名称。
pub fn run(
    strategies: Vec<IntervalStrategy>,
    exchanges: Vec<Arc<dyn Exchange>>,
    markets: Vec<Market>,
) -> RunHandle {
    let env = Arc::new(SharedEnv { exchanges, markets });
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut names = HashSet::new();
    let mut tasks = Vec::with_capacity(strategies.len());

    for (index, mut strategy) in strategies.into_iter().enumerate() {
        if strategy.name().trim().is_empty() {
            let synthetic = format!("strategy-{}", index);
            log::warn!("策略未命名，使用 {}", synthetic);
            strategy.model.rename(synthetic);
        }

        let name = strategy.name().to_string();
        if !names.insert(name.clone()) {
            log::warn!("策略名称重复: {}", name);
        }

        let (status_tx, status_rx) = watch::channel(StrategyStatus::new(&name));
        let worker = StrategyWorker {
            strategy,
            env: Arc::clone(&env),
            shutdown: shutdown_rx.clone(),
            status: status_tx,
        };
        tasks.push(StrategyTask {
            name,
            status: status_rx,
            join: tokio::spawn(worker.run()),
        });
    }

    log::info!(
        "策略引擎已启动，共 {} 个策略，{} 个行情源，{} 个市场",
        tasks.len(),
        env.exchanges.len(),
        env.markets.len()
    );

    RunHandle {
        shutdown: shutdown_tx,
        tasks,
        report: None,
    }
}

async fn stop_signal(shutdown: &mut watch::Receiver<bool>) {
    // 发送端被丢弃同样视为停止
    let _ = shutdown.wait_for(|stop| *stop).await;
}

/// 单个策略的执行任务，独占策略的钩子与运行状态
struct StrategyWorker {
    strategy: IntervalStrategy,
    env: Arc<SharedEnv>,
    shutdown: watch::Receiver<bool>,
    status: watch::Sender<StrategyStatus>,
}

impl StrategyWorker {
    async fn run(mut self) -> StrategyOutcome {
        let env = Arc::clone(&self.env);
        let name = self.strategy.name().to_string();
        log::info!(
            "[{}] 策略初始化，执行周期 {:?}",
            name,
            self.strategy.interval()
        );

        let setup = self
            .strategy
            .model
            .hooks_mut()
            .setup(&env.exchanges, &env.markets)
            .await;
        if let Err(source) = setup {
            let error = EngineError::Setup {
                strategy: name,
                source,
            };
            log::error!("{}", error);
            self.strategy.model.hooks_mut().on_error(&error).await;

            let message = error.to_string();
            self.transition(StrategyState::Stopping);
            self.status.send_modify(|status| status.last_error = Some(message));
            self.transition(StrategyState::Stopped);
            return self.outcome(Some(error), None);
        }

        self.transition(StrategyState::Running);
        log::info!("[{}] 策略已启动", name);

        if self.strategy.is_single_shot() {
            if self.stop_requested() {
                log::info!("[{}] 已收到停止信号，跳过单次执行", name);
            } else {
                self.tick(&env).await;
            }
        } else {
            self.tick_loop(&env).await;
        }

        self.transition(StrategyState::Stopping);
        let teardown = self
            .strategy
            .model
            .hooks_mut()
            .tear_down(&env.exchanges, &env.markets)
            .await;
        let teardown_error = match teardown {
            Ok(()) => None,
            Err(source) => {
                let error = EngineError::Teardown {
                    strategy: name.clone(),
                    source,
                };
                log::error!("{}", error);
                Some(error)
            }
        };
        self.transition(StrategyState::Stopped);

        let outcome = self.outcome(None, teardown_error);
        log::info!(
            "[{}] 策略已停止，共执行 {} 次更新，失败 {} 次",
            name,
            outcome.status.ticks,
            outcome.status.failed_ticks
        );
        outcome
    }

    async fn tick_loop(&mut self, env: &SharedEnv) {
        let interval = self.strategy.interval();
        // 首个周期从进入 Running 起计时
        let mut deadline = Instant::now() + interval;

        loop {
            tokio::select! {
                biased;
                _ = stop_signal(&mut self.shutdown) => break,
                _ = sleep_until(deadline) => {}
            }

            self.tick(env).await;
            // 下一周期从本次更新完成时起计时，慢更新不会叠加
            deadline = Instant::now() + interval;
        }
    }

    async fn tick(&mut self, env: &SharedEnv) {
        let mut tick = 0;
        self.status.send_modify(|status| tick = status.record_tick());
        log::debug!("[{}] 第{}次更新", self.strategy.name(), tick);

        let result = self
            .strategy
            .model
            .hooks_mut()
            .on_update(&env.exchanges, &env.markets)
            .await;

        if let Err(source) = result {
            let error = EngineError::Update {
                strategy: self.strategy.name().to_string(),
                tick,
                source,
            };
            log::warn!("{}", error);
            let message = error.to_string();
            self.status.send_modify(|status| status.record_failure(message));
            self.strategy.model.hooks_mut().on_error(&error).await;
        }
    }

    fn transition(&self, next: StrategyState) {
        let name = self.strategy.name();
        self.status.send_modify(|status| {
            let current = status.state;
            if !status.advance(next) {
                log::warn!("[{}] 忽略非法状态迁移 {:?} -> {:?}", name, current, next);
            }
        });
    }

    fn stop_requested(&self) -> bool {
        *self.shutdown.borrow()
    }

    fn outcome(
        &self,
        fatal: Option<EngineError>,
        teardown_error: Option<EngineError>,
    ) -> StrategyOutcome {
        StrategyOutcome {
            status: self.status.borrow().clone(),
            fatal,
            teardown_error,
        }
    }
}
