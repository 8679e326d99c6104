//! signal-guardian: risk-checked trade decisions from discrete signal readings
//!
//! This library provides the core components for:
//! - Validated signal-reading ingestion
//! - Consecutive-failure cadence tracking per trading session
//! - Kelly criterion position sizing over rolling trade windows
//! - Multi-tier compliance monitoring with auto-stop enforcement
//! - A decision engine combining all three into one verdict
//! - Non-blocking decision broadcast to subscribers
//! - Append-only audit logging
//! - Full observability stack

pub mod audit;
pub mod broadcast;
pub mod cadence;
pub mod cli;
pub mod compliance;
pub mod config;
pub mod decision;
pub mod reading;
pub mod sizing;
pub mod telemetry;
