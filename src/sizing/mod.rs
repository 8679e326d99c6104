//! Dynamic position sizing
//!
//! Kelly criterion over rolling trade-outcome windows, with per-instrument
//! specificity and a fixed conservative fallback when history is thin.

mod kelly;
mod types;
mod window;

pub use kelly::{HistorySummary, KellyEngine};
pub use types::{CalculationSource, KellyStats, SizingError, SizingResult, TradeRecord};
pub use window::TradeHistoryWindow;
