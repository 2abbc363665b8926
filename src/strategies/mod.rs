// 周期策略运行时
pub mod common;

// 内置策略
pub mod notify;
pub mod watch_market;

pub use common::*;
pub use notify::{NotifyParams, NotifyStrategy};
pub use watch_market::{WatchMarket, WatchMarketParams};
