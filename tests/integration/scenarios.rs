//! End-to-end decision scenarios

use crate::common::{at, harness, nq_context, outcome, reading, seed_history};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use signal_guardian::broadcast::SubscriberClass;
use signal_guardian::decision::Action;
use signal_guardian::reading::{ConfluenceTier, FilterState, SessionTag};

/// A weak, opposed reading must never produce an entry, and the refusal
/// must be audited with its disqualifier.
#[tokio::test]
async fn weak_opposed_reading_stands_aside() {
    let h = harness();

    let r = reading(5, ConfluenceTier::L1, FilterState::Opposed, 10, 0);
    let d = h.engine.evaluate(&r, &nq_context()).await;

    assert_eq!(d.action, Action::NoTrade);
    assert_eq!(d.position_size, Decimal::ZERO);
    // Every failed criterion shows up, not just the first
    assert!(d.reasoning.iter().any(|l| l.contains("below minimum")));
    assert!(d
        .reasoning
        .iter()
        .any(|l| l.contains("confluence at lowest tier")));
    assert!(d.reasoning.iter().any(|l| l.contains("filter opposed")));
    assert_eq!(h.audit.of_kind("decision_made").len(), 1);
}

/// Two morning losses arm the cadence threshold; the next strong reading
/// with healthy Kelly statistics and a clean account trades at full size,
/// and every subscriber sees the decision.
#[tokio::test]
async fn armed_cadence_and_strong_signal_trade() {
    let h = harness();
    seed_history(&h.engine).await;

    let (_, mut dashboard) = h.broadcaster.subscribe(SubscriberClass::Dashboard);
    let (_, mut execution) = h.broadcaster.subscribe(SubscriberClass::Execution);

    let r = reading(80, ConfluenceTier::L4, FilterState::Aligned, 10, 30);
    let d = h.engine.evaluate(&r, &nq_context()).await;

    assert_eq!(d.action, Action::Trade);
    assert_eq!(d.confidence, Decimal::ONE);
    assert!(d.compliance_approved);
    assert_eq!(d.kelly_fraction, dec!(0.125));
    assert!(d.position_size > Decimal::ZERO);
    assert!(d
        .reasoning
        .iter()
        .any(|line| line.contains("cadence threshold met")));

    assert_eq!(dashboard.recv().await.unwrap().id, d.id);
    assert_eq!(execution.recv().await.unwrap().id, d.id);
}

/// A winning outcome disarms the cadence streak; an otherwise identical
/// reading loses the cadence bonus.
#[tokio::test]
async fn win_disarms_cadence_bonus() {
    let h = harness();
    seed_history(&h.engine).await;
    h.engine.record_outcome(outcome(dec!(200), true, 31)).await;

    let r = reading(80, ConfluenceTier::L4, FilterState::Neutral, 10, 35);
    let d = h.engine.evaluate(&r, &nq_context()).await;
    // L4 + strong power only
    assert_eq!(d.confidence, dec!(0.6));
    assert!(!d
        .reasoning
        .iter()
        .any(|line| line.contains("cadence threshold met")));
}

/// A daily loss landing exactly on the hard limit is a violation: the
/// emergency stop latches and a perfect signal cannot trade through it.
#[tokio::test]
async fn daily_loss_at_hard_limit_latches_stop() {
    let h = harness();
    // 5% of the 50k account, as one settled loss
    h.engine
        .record_outcome(outcome(dec!(-2500), false, 0))
        .await;

    let r = reading(80, ConfluenceTier::L4, FilterState::Aligned, 10, 10);
    let d = h.engine.evaluate(&r, &nq_context()).await;

    assert_eq!(d.action, Action::NoTrade);
    assert!(!d.compliance_approved);
    assert_eq!(d.position_size, Decimal::ZERO);
    assert!(d
        .reasoning
        .iter()
        .any(|line| line.contains("compliance denied")));

    let compliance = h.engine.compliance();
    let guard = compliance.read().await;
    assert!(guard.emergency_stop());
    assert!(!guard.trading_enabled());
    drop(guard);

    assert!(!h.audit.of_kind("compliance_alert").is_empty());

    // Recovery alone does not lift the stop
    h.engine.record_outcome(outcome(dec!(3000), true, 20)).await;
    let d = h.engine.evaluate(&r, &nq_context()).await;
    assert_eq!(d.action, Action::NoTrade);

    // An operator override does
    h.engine
        .compliance()
        .write()
        .await
        .reset_emergency_stop(true);
    let d = h.engine.evaluate(&r, &nq_context()).await;
    assert!(d.compliance_approved);
}

/// Overnight readings use the afternoon cadence threshold.
#[tokio::test]
async fn overnight_session_uses_afternoon_threshold() {
    let h = harness();
    for minute in 0..2 {
        let mut o = outcome(dec!(-100), false, minute);
        o.session = SessionTag::Overnight;
        h.engine.record_outcome(o).await;
    }
    // Two failures meet the morning threshold but not the overnight one
    let cadence = h.engine.cadence();
    let guard = cadence.read().await;
    assert!(guard.threshold_met(SessionTag::Morning));
    assert!(!guard.threshold_met(SessionTag::Overnight));
}

/// Every reading produces exactly one audited decision, trade or not.
#[tokio::test]
async fn one_decision_per_reading() {
    let h = harness();
    let readings = [
        reading(5, ConfluenceTier::L4, FilterState::Aligned, 10, 0),
        reading(80, ConfluenceTier::L4, FilterState::Aligned, 10, 1),
        reading(16, ConfluenceTier::L3, FilterState::Neutral, 10, 2),
        reading(80, ConfluenceTier::L2, FilterState::Opposed, 10, 3),
    ];
    for r in &readings {
        h.engine.evaluate(r, &nq_context()).await;
    }
    assert_eq!(h.audit.of_kind("decision_made").len(), readings.len());
    assert_eq!(h.broadcaster.stats().published, readings.len() as u64);
}

/// Settled outcomes propagate to sizing equity and compliance balance
/// identically.
#[tokio::test]
async fn outcome_keeps_equity_and_balance_aligned() {
    let h = harness();
    h.engine.record_outcome(outcome(dec!(500), true, 0)).await;
    h.engine
        .record_outcome(outcome(dec!(-200), false, 1))
        .await;

    let balance = h
        .engine
        .compliance()
        .read()
        .await
        .snapshot()
        .current_balance;
    let equity = h.engine.sizing().read().await.equity();
    assert_eq!(balance, dec!(50300));
    assert_eq!(equity, balance);
    assert_eq!(h.audit.of_kind("outcome_recorded").len(), 2);

    // Daily reset clears the day counters but not the balance
    let report = h.engine.compliance().write().await.evaluate(at(17, 1));
    assert!(report.trading_enabled);
    let snap = h.engine.compliance().read().await.snapshot();
    assert_eq!(snap.daily_pnl, Decimal::ZERO);
    assert_eq!(snap.current_balance, dec!(50300));
}
