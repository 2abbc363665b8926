pub mod core;
pub mod exchanges;
pub mod strategies;
pub mod utils;

pub use core::{config::*, error::*, exchange::*, types::*};
pub use exchanges::*;
pub use strategies::*;
pub use utils::*;
