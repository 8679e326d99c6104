//! Audit trail
//!
//! Append-only record of every decision, compliance alert, and settled
//! outcome. Sinks are pluggable; the shipped ones are a JSONL file for
//! durability and an in-memory ring for tests and status queries.

use crate::compliance::{ComplianceLevel, RuleId};
use crate::decision::Decision;
use crate::reading::TradeOutcome;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// One audit entry
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum AuditEvent {
    DecisionMade {
        timestamp: DateTime<Utc>,
        decision: Decision,
    },
    ComplianceAlert {
        timestamp: DateTime<Utc>,
        rule: RuleId,
        level: ComplianceLevel,
        detail: String,
    },
    OutcomeRecorded {
        timestamp: DateTime<Utc>,
        outcome: TradeOutcome,
    },
}

impl AuditEvent {
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            AuditEvent::DecisionMade { timestamp, .. }
            | AuditEvent::ComplianceAlert { timestamp, .. }
            | AuditEvent::OutcomeRecorded { timestamp, .. } => *timestamp,
        }
    }

    /// Stable kind tag for filtering
    pub fn kind(&self) -> &'static str {
        match self {
            AuditEvent::DecisionMade { .. } => "decision_made",
            AuditEvent::ComplianceAlert { .. } => "compliance_alert",
            AuditEvent::OutcomeRecorded { .. } => "outcome_recorded",
        }
    }
}

/// Destination for audit entries
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn record(&self, event: AuditEvent) -> anyhow::Result<()>;
}

/// One JSON object per line, appended and flushed per event
pub struct JsonlSink {
    path: PathBuf,
    file: Mutex<std::fs::File>,
}

impl JsonlSink {
    pub fn open(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)?;
        tracing::info!(path = %path.display(), "Audit log opened");
        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl AuditSink for JsonlSink {
    async fn record(&self, event: AuditEvent) -> anyhow::Result<()> {
        let line = serde_json::to_string(&event)?;
        let mut file = self
            .file
            .lock()
            .map_err(|_| anyhow::anyhow!("audit file lock poisoned"))?;
        writeln!(file, "{line}")?;
        file.flush()?;
        Ok(())
    }
}

/// In-memory sink with simple queries. Used by tests and the status surface.
#[derive(Default)]
pub struct MemorySink {
    events: Mutex<Vec<AuditEvent>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.events.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All events whose timestamp falls in `[from, to)`
    pub fn in_range(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> Vec<AuditEvent> {
        self.events
            .lock()
            .map(|events| {
                events
                    .iter()
                    .filter(|e| e.timestamp() >= from && e.timestamp() < to)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// All events of one kind
    pub fn of_kind(&self, kind: &str) -> Vec<AuditEvent> {
        self.events
            .lock()
            .map(|events| {
                events
                    .iter()
                    .filter(|e| e.kind() == kind)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn last(&self) -> Option<AuditEvent> {
        self.events.lock().ok().and_then(|e| e.last().cloned())
    }
}

#[async_trait]
impl AuditSink for MemorySink {
    async fn record(&self, event: AuditEvent) -> anyhow::Result<()> {
        self.events
            .lock()
            .map_err(|_| anyhow::anyhow!("audit buffer lock poisoned"))?
            .push(event);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decision::Decision;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn at(minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 3, 10, minute, 0).unwrap()
    }

    fn decision_event(minute: u32) -> AuditEvent {
        AuditEvent::DecisionMade {
            timestamp: at(minute),
            decision: Decision::no_trade("NQ", at(minute), vec!["test".to_string()]),
        }
    }

    #[tokio::test]
    async fn test_jsonl_sink_appends_one_line_per_event() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.jsonl");
        let sink = JsonlSink::open(&path).unwrap();

        sink.record(decision_event(0)).await.unwrap();
        sink.record(AuditEvent::OutcomeRecorded {
            timestamp: at(1),
            outcome: TradeOutcome {
                timestamp: at(1),
                instrument: "NQ".to_string(),
                pnl: dec!(-100),
                win: false,
                session: crate::reading::SessionTag::Morning,
            },
        })
        .await
        .unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["event"], "decision_made");
        let second: serde_json::Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(second["event"], "outcome_recorded");
        assert_eq!(second["outcome"]["pnl"], "-100");
    }

    #[tokio::test]
    async fn test_jsonl_sink_reopens_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.jsonl");
        {
            let sink = JsonlSink::open(&path).unwrap();
            sink.record(decision_event(0)).await.unwrap();
        }
        let sink = JsonlSink::open(&path).unwrap();
        sink.record(decision_event(1)).await.unwrap();
        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().count(), 2);
    }

    #[tokio::test]
    async fn test_memory_sink_range_query() {
        let sink = MemorySink::new();
        for minute in [0, 5, 10, 15] {
            sink.record(decision_event(minute)).await.unwrap();
        }
        // Half-open: includes 5, excludes 15
        let hits = sink.in_range(at(5), at(15));
        assert_eq!(hits.len(), 2);
    }

    #[tokio::test]
    async fn test_memory_sink_kind_query() {
        let sink = MemorySink::new();
        sink.record(decision_event(0)).await.unwrap();
        sink.record(AuditEvent::ComplianceAlert {
            timestamp: at(1),
            rule: RuleId::DailyLoss,
            level: ComplianceLevel::Warning,
            detail: "daily loss at warning threshold".to_string(),
        })
        .await
        .unwrap();

        assert_eq!(sink.of_kind("decision_made").len(), 1);
        assert_eq!(sink.of_kind("compliance_alert").len(), 1);
        assert_eq!(sink.of_kind("outcome_recorded").len(), 0);
    }
}
