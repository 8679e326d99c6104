//! Decision output types

use crate::sizing::SizingResult;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// What the engine recommends for one reading
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// Full conviction entry at the computed size
    Trade,
    /// Entry permitted at half the computed size
    CautiousTrade,
    /// Stand aside
    NoTrade,
}

/// One complete decision, the unit published to subscribers and audited.
///
/// `reasoning` carries every factor that contributed, in evaluation order,
/// so a reviewer can reconstruct the verdict without replaying state.
#[derive(Debug, Clone, Serialize)]
pub struct Decision {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub instrument: String,
    pub action: Action,
    /// Signal quality score in [0, 1]
    pub confidence: Decimal,
    pub position_size: Decimal,
    pub risk_amount: Decimal,
    pub kelly_fraction: Decimal,
    pub stop_distance: Decimal,
    pub target_distance: Decimal,
    pub compliance_approved: bool,
    pub reasoning: Vec<String>,
    /// Full sizing breakdown when sizing ran; absent for early disqualifiers
    pub sizing: Option<SizingResult>,
}

impl Decision {
    /// A stand-aside decision that never reached the sizing stage
    pub fn no_trade(instrument: &str, timestamp: DateTime<Utc>, reasoning: Vec<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp,
            instrument: instrument.to_string(),
            action: Action::NoTrade,
            confidence: Decimal::ZERO,
            position_size: Decimal::ZERO,
            risk_amount: Decimal::ZERO,
            kelly_fraction: Decimal::ZERO,
            stop_distance: Decimal::ZERO,
            target_distance: Decimal::ZERO,
            compliance_approved: false,
            reasoning,
            sizing: None,
        }
    }

    pub fn is_actionable(&self) -> bool {
        !matches!(self.action, Action::NoTrade)
    }
}
