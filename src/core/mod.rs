// 核心模块 - 配置、错误与行情接口
pub mod config;
pub mod error;
pub mod exchange;
pub mod types;

pub use config::*;
pub use error::*;
pub use exchange::*;
pub use types::{Market, MarketSummary};
