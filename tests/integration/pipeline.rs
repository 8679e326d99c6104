//! Replay, configuration, and audit persistence wiring

use crate::common::{at, nq_context, reading};
use rust_decimal_macros::dec;
use signal_guardian::audit::{AuditSink, JsonlSink};
use signal_guardian::broadcast::Broadcaster;
use signal_guardian::config::Config;
use signal_guardian::decision::DecisionEngine;
use signal_guardian::reading::{
    ConfluenceTier, FilterState, ReadingSource, ReplaySource, SignalReading,
};
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

fn write_jsonl(readings: &[SignalReading]) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    for r in readings {
        writeln!(file, "{}", serde_json::to_string(r).unwrap()).unwrap();
    }
    file
}

/// Readings replayed from a capture flow through the engine one decision
/// per reading, and the audit trail lands on disk as JSONL.
#[tokio::test]
async fn replay_capture_through_engine() {
    let capture = write_jsonl(&[
        reading(80, ConfluenceTier::L4, FilterState::Aligned, 10, 0),
        reading(5, ConfluenceTier::L4, FilterState::Aligned, 10, 1),
        reading(16, ConfluenceTier::L3, FilterState::Neutral, 10, 2),
    ]);
    let audit_dir = tempfile::tempdir().unwrap();
    let audit_path = audit_dir.path().join("audit.jsonl");

    let broadcaster = Arc::new(Broadcaster::new(64));
    let audit: Arc<dyn AuditSink> = Arc::new(JsonlSink::open(&audit_path).unwrap());
    let engine =
        DecisionEngine::new(&Config::default(), broadcaster, audit, at(9, 0)).unwrap();

    let source = ReplaySource::new(capture.path(), Duration::from_millis(1), (0, 100));
    let mut rx = source.subscribe().await.unwrap();

    let mut decisions = 0;
    while let Some(r) = rx.recv().await {
        engine.evaluate(&r, &nq_context()).await;
        decisions += 1;
    }
    assert_eq!(decisions, 3);

    let contents = std::fs::read_to_string(&audit_path).unwrap();
    let lines: Vec<&str> = contents.lines().collect();
    assert_eq!(lines.len(), 3);
    for line in lines {
        let value: serde_json::Value = serde_json::from_str(line).unwrap();
        assert_eq!(value["event"], "decision_made");
        assert!(value["decision"]["id"].is_string());
    }
}

/// A TOML file drives every component threshold end to end.
#[tokio::test]
async fn config_file_drives_engine_thresholds() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"
        [cadence]
        morning_threshold = 1

        [decision]
        min_power = 30

        [compliance]
        account_size = 10000.0
        "#
    )
    .unwrap();

    let config = Config::load(file.path()).unwrap();
    assert_eq!(config.cadence.morning_threshold, 1);

    let broadcaster = Arc::new(Broadcaster::new(64));
    let audit: Arc<dyn AuditSink> =
        Arc::new(signal_guardian::audit::MemorySink::new());
    let engine = DecisionEngine::new(&config, broadcaster, audit, at(9, 0)).unwrap();

    // Power 25 clears the default minimum but not the configured one
    let r = reading(25, ConfluenceTier::L4, FilterState::Aligned, 10, 0);
    let d = engine.evaluate(&r, &nq_context()).await;
    assert_eq!(d.action, signal_guardian::decision::Action::NoTrade);
    assert!(d
        .reasoning
        .iter()
        .any(|line| line.contains("below minimum 30")));

    // The smaller account scales the compliance balance
    let snapshot = engine.compliance().read().await.snapshot();
    assert_eq!(snapshot.starting_balance, dec!(10000));
}

/// Invalid configuration is rejected at load, before any component starts.
#[test]
fn invalid_config_rejected_at_load() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"
        [sizing]
        max_position_pct = 2.0
        "#
    )
    .unwrap();
    assert!(Config::load(file.path()).is_err());
}

/// Out-of-domain power scores in a capture are dropped by the source,
/// never reaching the engine.
#[tokio::test]
async fn replay_filters_out_of_domain_readings() {
    let in_domain = reading(40, ConfluenceTier::L3, FilterState::Neutral, 10, 0);
    let out_of_domain = reading(90, ConfluenceTier::L3, FilterState::Neutral, 10, 1);
    let capture = write_jsonl(&[in_domain, out_of_domain]);

    // Domain capped at 50 for this run
    let source = ReplaySource::new(capture.path(), Duration::from_millis(1), (0, 50));
    let mut rx = source.subscribe().await.unwrap();

    assert_eq!(rx.recv().await.unwrap().power_score, 40);
    assert!(rx.recv().await.is_none());
}
