//! Signal cadence tracking
//!
//! Consecutive-failure streaks per trading session gate high-probability
//! entries: the morning session alerts after 2 consecutive failures, the
//! afternoon (and overnight) after 3.

mod tracker;

pub use tracker::{CadenceStatus, CadenceTracker, SessionStats};
