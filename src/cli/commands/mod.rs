//! CLI command implementations.

mod ask;
mod config;
mod refresh;
mod search;
mod serve;

pub use ask::run_ask;
pub use config::run_config;
pub use refresh::run_refresh;
pub use search::run_search;
pub use serve::run_serve;
