//! Signal reading boundary
//!
//! Validated reading DTOs and the source trait the decision engine consumes.
//! How readings are produced (OCR, API, manual entry) is not this crate's
//! concern; only the shape and validity of each reading is.

mod source;
mod types;

pub use source::ReplaySource;
pub use types::{
    ConfluenceTier, DirectionalColor, FilterState, MarketContext, Outcome, ReadingError,
    SessionTag, SignalReading, TradeOutcome,
};

use async_trait::async_trait;
use tokio::sync::mpsc;

/// Trait for signal reading sources
#[async_trait]
pub trait ReadingSource: Send + Sync {
    /// Subscribe to the stream of validated readings
    async fn subscribe(&self) -> anyhow::Result<mpsc::Receiver<SignalReading>>;
}
