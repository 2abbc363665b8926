pub mod deps;
pub mod interval;
pub mod registry;
pub mod runner;
pub mod status;
pub mod strategy;

pub use deps::{SinkFactory, StrategyContext};
pub use interval::IntervalStrategy;
pub use registry::{parse_params, StrategyRegistry};
pub use runner::{run, RunHandle, RunReport, StrategyOutcome};
pub use status::{StrategyState, StrategyStatus};
pub use strategy::{StrategyHooks, StrategyModel};
