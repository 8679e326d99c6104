//! Compliance monitoring
//!
//! Owns authoritative account state and a fixed rule table; classifies every
//! rule as safe/warning/critical/violation and enforces a latching trading
//! stop on auto-stop violations.

mod monitor;
mod rules;

pub use monitor::{
    AccountState, ComplianceMonitor, ComplianceReport, ComplianceStats, PositionCheck, RuleCheck,
};
pub use rules::{ComplianceLevel, ComplianceRule, RuleId, RuleTable};
