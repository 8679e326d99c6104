//! Signal reading types

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Confluence tier reported by the signal panel, lowest to highest
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ConfluenceTier {
    L1,
    L2,
    L3,
    L4,
}

/// Directional color of the signal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DirectionalColor {
    Green,
    Red,
    Blue,
    Pink,
    Neutral,
}

impl DirectionalColor {
    /// Whether the color implies a tradeable direction
    pub fn is_directional(&self) -> bool {
        !matches!(self, DirectionalColor::Neutral)
    }
}

/// Secondary trend-filter state relative to the signal direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterState {
    Aligned,
    Opposed,
    Neutral,
}

/// Trading session tag derived from wall-clock time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionTag {
    Morning,
    Afternoon,
    Overnight,
}

/// Errors producing or validating a reading
#[derive(Debug, Error)]
pub enum ReadingError {
    /// Power score outside the configured domain
    #[error("power score {0} outside domain {1}..={2}")]
    PowerOutOfRange(u16, u8, u8),
}

/// One validated observation from the external signal reader.
///
/// Immutable once constructed; consumed exactly once by the decision engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalReading {
    pub timestamp: DateTime<Utc>,
    pub power_score: u8,
    pub confluence: ConfluenceTier,
    pub color: DirectionalColor,
    pub filter_state: FilterState,
    pub session: SessionTag,
}

impl SignalReading {
    /// Validate and construct a reading. Out-of-domain power scores are
    /// rejected rather than clamped.
    pub fn new(
        timestamp: DateTime<Utc>,
        power_score: u16,
        confluence: ConfluenceTier,
        color: DirectionalColor,
        filter_state: FilterState,
        session: SessionTag,
        power_domain: (u8, u8),
    ) -> Result<Self, ReadingError> {
        let (min, max) = power_domain;
        if power_score < min as u16 || power_score > max as u16 {
            return Err(ReadingError::PowerOutOfRange(power_score, min, max));
        }
        Ok(Self {
            timestamp,
            power_score: power_score as u8,
            confluence,
            color,
            filter_state,
            session,
        })
    }
}

/// Outcome of a signal trade
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Win,
    Loss,
}

/// A settled trade reported back to the decision core
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeOutcome {
    pub timestamp: DateTime<Utc>,
    pub instrument: String,
    pub pnl: Decimal,
    pub win: bool,
    pub session: SessionTag,
}

impl TradeOutcome {
    pub fn outcome(&self) -> Outcome {
        if self.win {
            Outcome::Win
        } else {
            Outcome::Loss
        }
    }
}

/// Externally supplied market context for a reading: the implied entry price
/// and an ATR-style volatility distance. Not computed here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketContext {
    pub instrument: String,
    pub entry_price: Decimal,
    pub atr: Decimal,
}
