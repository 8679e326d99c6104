//! Decision engine
//!
//! The orchestrator: one reading in, one published and audited decision out.

mod engine;
mod types;

pub use engine::DecisionEngine;
pub use types::{Action, Decision};
