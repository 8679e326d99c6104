//! The decision loop

use crate::audit::{AuditSink, JsonlSink};
use crate::broadcast::{Broadcaster, SubscriberClass};
use crate::config::Config;
use crate::decision::DecisionEngine;
use crate::reading::{MarketContext, ReadingSource, ReplaySource, TradeOutcome};
use crate::telemetry;
use chrono::Utc;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::timeout;

pub struct RunArgs {
    pub readings: PathBuf,
    pub outcomes: Option<PathBuf>,
    pub audit_log: PathBuf,
    pub instrument: String,
    pub entry: Decimal,
    pub atr: Decimal,
}

/// Drive the engine from a readings replay until the capture is exhausted
/// or the process is interrupted.
pub async fn run(config: Config, args: RunArgs) -> anyhow::Result<()> {
    telemetry::init_metrics(&config.telemetry)?;

    let broadcaster = Arc::new(Broadcaster::new(config.broadcast.queue_capacity));
    let audit: Arc<dyn AuditSink> = Arc::new(JsonlSink::open(&args.audit_log)?);
    let engine = DecisionEngine::new(&config, Arc::clone(&broadcaster), audit, Utc::now())?;

    // A local dashboard subscriber so fan-out is observable in the logs
    let (dashboard_id, mut dashboard_rx) = broadcaster.subscribe(SubscriberClass::Dashboard);
    tokio::spawn(async move {
        while let Some(decision) = dashboard_rx.recv().await {
            tracing::info!(
                id = %decision.id,
                action = ?decision.action,
                size = %decision.position_size,
                "dashboard: decision received"
            );
        }
    });

    let source = ReplaySource::new(
        &args.readings,
        Duration::from_millis(config.reading.replay_interval_ms),
        config.reading.power_domain(),
    );
    let mut readings = source.subscribe().await?;
    let mut outcomes = match &args.outcomes {
        Some(path) => {
            spawn_outcome_replay(
                path.clone(),
                Duration::from_millis(config.reading.replay_interval_ms),
            )
            .await?
        }
        None => mpsc::channel(1).1,
    };

    let context = MarketContext {
        instrument: args.instrument,
        entry_price: args.entry,
        atr: args.atr,
    };
    let read_timeout = Duration::from_secs(config.reading.read_timeout_secs);
    tracing::info!(
        readings = %args.readings.display(),
        instrument = %context.instrument,
        "Decision loop started"
    );

    loop {
        tokio::select! {
            reading = timeout(read_timeout, readings.recv()) => match reading {
                Ok(Some(reading)) => {
                    metrics::counter!("guardian_readings_total", "disposition" => "consumed").increment(1);
                    engine.evaluate(&reading, &context).await;
                }
                Ok(None) => {
                    tracing::info!("Reading stream closed, shutting down");
                    break;
                }
                // Silence is a cycle with nothing to decide, not a failure
                Err(_) => {
                    metrics::counter!("guardian_readings_total", "disposition" => "idle").increment(1);
                    tracing::debug!("No new reading this cycle");
                }
            },
            Some(outcome) = outcomes.recv() => {
                engine.record_outcome(outcome).await;
                let snapshot = engine.compliance().read().await.snapshot();
                metrics::gauge!("guardian_account_balance")
                    .set(snapshot.current_balance.to_f64().unwrap_or(0.0));
                metrics::gauge!("guardian_consecutive_failures")
                    .set(f64::from(engine.cadence().read().await.consecutive_failures()));
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Interrupt received, shutting down");
                break;
            }
        }
    }

    broadcaster.unsubscribe(dashboard_id);
    let summary = engine.sizing().read().await.history_summary();
    let account = engine.compliance().read().await.snapshot();
    tracing::info!(
        trades = summary.total_trades,
        win_rate = %summary.win_rate,
        balance = %account.current_balance,
        "Decision loop finished"
    );
    Ok(())
}

/// Replay settled outcomes from a JSONL capture
async fn spawn_outcome_replay(
    path: PathBuf,
    interval: Duration,
) -> anyhow::Result<mpsc::Receiver<TradeOutcome>> {
    let content = tokio::fs::read_to_string(&path).await?;
    let (tx, rx) = mpsc::channel(64);

    tokio::spawn(async move {
        for (line_no, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let outcome: TradeOutcome = match serde_json::from_str(line) {
                Ok(o) => o,
                Err(e) => {
                    tracing::warn!(line = line_no + 1, error = %e, "Skipping malformed outcome");
                    continue;
                }
            };
            if tx.send(outcome).await.is_err() {
                return;
            }
            tokio::time::sleep(interval).await;
        }
        tracing::info!("Outcome replay exhausted");
    });

    Ok(rx)
}
