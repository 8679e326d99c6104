//! Shared fixtures

use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use signal_guardian::audit::{AuditSink, MemorySink};
use signal_guardian::broadcast::Broadcaster;
use signal_guardian::config::Config;
use signal_guardian::decision::DecisionEngine;
use signal_guardian::reading::{
    ConfluenceTier, DirectionalColor, FilterState, MarketContext, SessionTag, SignalReading,
    TradeOutcome,
};
use std::sync::Arc;

pub fn at(hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 3, hour, minute, 0).unwrap()
}

pub struct Harness {
    pub engine: DecisionEngine,
    pub broadcaster: Arc<Broadcaster>,
    pub audit: Arc<MemorySink>,
}

pub fn harness() -> Harness {
    let audit = Arc::new(MemorySink::new());
    let broadcaster = Arc::new(Broadcaster::new(64));
    let engine = DecisionEngine::new(
        &Config::default(),
        Arc::clone(&broadcaster),
        Arc::clone(&audit) as Arc<dyn AuditSink>,
        at(9, 0),
    )
    .unwrap();
    Harness {
        engine,
        broadcaster,
        audit,
    }
}

pub fn reading(
    power: u8,
    confluence: ConfluenceTier,
    filter: FilterState,
    hour: u32,
    minute: u32,
) -> SignalReading {
    SignalReading {
        timestamp: at(hour, minute),
        power_score: power,
        confluence,
        color: DirectionalColor::Green,
        filter_state: filter,
        session: SessionTag::Morning,
    }
}

pub fn nq_context() -> MarketContext {
    MarketContext {
        instrument: "NQ".to_string(),
        entry_price: dec!(100),
        atr: dec!(2),
    }
}

pub fn outcome(pnl: Decimal, win: bool, minute: u32) -> TradeOutcome {
    TradeOutcome {
        timestamp: at(10, minute),
        instrument: "NQ".to_string(),
        pnl,
        win,
        session: SessionTag::Morning,
    }
}

/// Thirty trades at a 60% win rate and 2:1 payoff, ending on two losses
/// so the morning cadence threshold is live.
pub async fn seed_history(engine: &DecisionEngine) {
    for block in 0..6u32 {
        for i in 0..3 {
            engine
                .record_outcome(outcome(dec!(200), true, block * 5 + i))
                .await;
        }
        for i in 3..5 {
            engine
                .record_outcome(outcome(dec!(-100), false, block * 5 + i))
                .await;
        }
    }
}
