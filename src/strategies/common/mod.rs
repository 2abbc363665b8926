pub mod application;

pub use application::{
    parse_params, run, IntervalStrategy, RunHandle, RunReport, SinkFactory, StrategyContext,
    StrategyHooks, StrategyModel, StrategyOutcome, StrategyRegistry, StrategyState,
    StrategyStatus,
};
