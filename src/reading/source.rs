//! JSONL replay reading source
//!
//! Replays captured signal readings from a JSONL file for paper runs.
//! Malformed lines are logged and skipped; the stream continues.

use super::{ReadingSource, SignalReading};
use async_trait::async_trait;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::mpsc;

/// Replays readings from a JSONL capture file at a fixed interval
pub struct ReplaySource {
    path: PathBuf,
    interval: Duration,
    power_domain: (u8, u8),
}

impl ReplaySource {
    pub fn new(path: impl Into<PathBuf>, interval: Duration, power_domain: (u8, u8)) -> Self {
        Self {
            path: path.into(),
            interval,
            power_domain,
        }
    }
}

#[async_trait]
impl ReadingSource for ReplaySource {
    async fn subscribe(&self) -> anyhow::Result<mpsc::Receiver<SignalReading>> {
        let content = tokio::fs::read_to_string(&self.path).await?;
        let (tx, rx) = mpsc::channel(64);
        let interval = self.interval;
        let domain = self.power_domain;

        tokio::spawn(async move {
            for (line_no, line) in content.lines().enumerate() {
                if line.trim().is_empty() {
                    continue;
                }
                let reading: SignalReading = match serde_json::from_str(line) {
                    Ok(r) => r,
                    Err(e) => {
                        tracing::warn!(line = line_no + 1, error = %e, "Skipping malformed reading");
                        continue;
                    }
                };
                // Re-validate the power domain; captures may predate config changes
                let (min, max) = domain;
                if reading.power_score < min || reading.power_score > max {
                    tracing::warn!(
                        line = line_no + 1,
                        power = reading.power_score,
                        "Discarding out-of-domain reading"
                    );
                    continue;
                }
                if tx.send(reading).await.is_err() {
                    tracing::debug!("Reading receiver dropped, stopping replay");
                    return;
                }
                tokio::time::sleep(interval).await;
            }
            tracing::info!("Replay source exhausted");
        });

        Ok(rx)
    }
}
