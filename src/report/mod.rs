pub mod export;
pub mod run_log;

pub use export::MarketRow;
pub use run_log::{RunLog, RunRecord};
