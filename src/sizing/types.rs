//! Position sizing types

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Position sizing errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SizingError {
    /// Entry equals stop (or worse): no risk per unit to size against
    #[error("invalid stop: entry {entry} and stop {stop} leave no risk per unit")]
    InvalidStop { entry: Decimal, stop: Decimal },
    /// Non-positive entry price
    #[error("invalid entry price: {0}")]
    InvalidEntry(Decimal),
    /// Non-positive equity update
    #[error("invalid equity: {0}")]
    InvalidEquity(Decimal),
}

/// Which statistics window produced a sizing result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CalculationSource {
    /// Per-instrument window had enough samples
    Instrument,
    /// Fell back to the global window
    Global,
    /// Fixed conservative risk; no window qualified
    Default,
}

/// A completed trade record for Kelly calculations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeRecord {
    pub timestamp: DateTime<Utc>,
    pub instrument: String,
    pub pnl: Decimal,
    pub win: bool,
}

/// Cached statistics over a trade window
#[derive(Debug, Clone, Serialize)]
pub struct KellyStats {
    pub win_rate: Decimal,
    pub avg_win: Decimal,
    pub avg_loss: Decimal,
    /// avg_win / avg_loss; zero when no losses are recorded
    pub payoff_ratio: Decimal,
    /// Clamped to [0, 0.25]
    pub kelly_fraction: Decimal,
    pub half_kelly_fraction: Decimal,
    pub confidence: Decimal,
    pub sample_size: usize,
    pub last_updated: DateTime<Utc>,
}

impl KellyStats {
    pub fn empty() -> Self {
        Self {
            win_rate: Decimal::ZERO,
            avg_win: Decimal::ZERO,
            avg_loss: Decimal::ZERO,
            payoff_ratio: Decimal::ZERO,
            kelly_fraction: Decimal::ZERO,
            half_kelly_fraction: Decimal::ZERO,
            confidence: Decimal::ZERO,
            sample_size: 0,
            last_updated: Utc::now(),
        }
    }
}

/// Risk-capped position sizing recommendation
#[derive(Debug, Clone, Serialize)]
pub struct SizingResult {
    /// Unit count (shares/contracts)
    pub position_size: Decimal,
    /// Units * entry price
    pub position_value: Decimal,
    /// Dollar amount at risk to the stop
    pub risk_amount: Decimal,
    /// Risk as a percentage of equity
    pub risk_percentage: Decimal,
    pub kelly_fraction: Decimal,
    pub half_kelly_fraction: Decimal,
    pub win_rate: Decimal,
    pub payoff_ratio: Decimal,
    pub confidence: Decimal,
    pub signal_strength: Decimal,
    /// Position value ceiling applied
    pub max_position_value: Decimal,
    pub source: CalculationSource,
}
