//! Consecutive-failure cadence tracking

use crate::config::CadenceConfig;
use crate::reading::{Outcome, SessionTag};
use chrono::{DateTime, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashMap;

/// Per-session win/loss counts
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct SessionStats {
    pub wins: u32,
    pub losses: u32,
}

impl SessionStats {
    pub fn total(&self) -> u32 {
        self.wins + self.losses
    }
}

/// Cadence status report
#[derive(Debug, Clone, Serialize)]
pub struct CadenceStatus {
    pub consecutive_failures: u32,
    pub consecutive_successes: u32,
    pub current_session: SessionTag,
    pub threshold_met: bool,
    pub last_signal_at: Option<DateTime<Utc>>,
    pub win_rate: Decimal,
}

/// Tracks consecutive signal failures per trading session.
///
/// Two counters form a simple accumulator: a win zeroes the failure streak
/// and extends the success streak, a loss does the inverse. At most one
/// counter is non-zero at any time.
pub struct CadenceTracker {
    morning_threshold: u32,
    afternoon_threshold: u32,
    morning_start: NaiveTime,
    morning_end: NaiveTime,
    afternoon_end: NaiveTime,
    consecutive_failures: u32,
    consecutive_successes: u32,
    last_signal_at: Option<DateTime<Utc>>,
    session_stats: HashMap<SessionTag, SessionStats>,
}

impl CadenceTracker {
    pub fn new(config: &CadenceConfig) -> anyhow::Result<Self> {
        let (morning_start, morning_end, afternoon_end) = config.windows()?;
        Ok(Self {
            morning_threshold: config.morning_threshold,
            afternoon_threshold: config.afternoon_threshold,
            morning_start,
            morning_end,
            afternoon_end,
            consecutive_failures: 0,
            consecutive_successes: 0,
            last_signal_at: None,
            session_stats: HashMap::new(),
        })
    }

    /// Record a settled signal outcome. Never fails.
    pub fn record_outcome(&mut self, outcome: Outcome, session: SessionTag, at: DateTime<Utc>) {
        let stats = self.session_stats.entry(session).or_default();
        match outcome {
            Outcome::Win => {
                self.consecutive_failures = 0;
                self.consecutive_successes += 1;
                stats.wins += 1;
            }
            Outcome::Loss => {
                self.consecutive_successes = 0;
                self.consecutive_failures += 1;
                stats.losses += 1;
            }
        }
        self.last_signal_at = Some(at);
        tracing::debug!(
            ?outcome,
            ?session,
            failures = self.consecutive_failures,
            successes = self.consecutive_successes,
            "Cadence outcome recorded"
        );
    }

    /// Whether the entry threshold for the given session is met. Pure read.
    pub fn threshold_met(&self, session: SessionTag) -> bool {
        self.consecutive_failures >= self.threshold(session)
    }

    /// Failure threshold for a session. Overnight reuses the afternoon value.
    pub fn threshold(&self, session: SessionTag) -> u32 {
        match session {
            SessionTag::Morning => self.morning_threshold,
            SessionTag::Afternoon | SessionTag::Overnight => self.afternoon_threshold,
        }
    }

    /// Derive the session tag for a wall-clock time
    pub fn session_at(&self, time: NaiveTime) -> SessionTag {
        if time >= self.morning_start && time < self.morning_end {
            SessionTag::Morning
        } else if time >= self.morning_end && time < self.afternoon_end {
            SessionTag::Afternoon
        } else {
            SessionTag::Overnight
        }
    }

    /// Win rate for one session, or across all sessions when `None`.
    /// Returns zero when no trades are recorded.
    pub fn win_rate(&self, session: Option<SessionTag>) -> Decimal {
        let (wins, total) = match session {
            Some(tag) => {
                let stats = self.session_stats.get(&tag).copied().unwrap_or_default();
                (stats.wins, stats.total())
            }
            None => self
                .session_stats
                .values()
                .fold((0, 0), |(w, t), s| (w + s.wins, t + s.total())),
        };
        if total == 0 {
            return Decimal::ZERO;
        }
        Decimal::from(wins) / Decimal::from(total)
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    pub fn consecutive_successes(&self) -> u32 {
        self.consecutive_successes
    }

    pub fn session_stats(&self, session: SessionTag) -> SessionStats {
        self.session_stats.get(&session).copied().unwrap_or_default()
    }

    /// Status snapshot for reporting
    pub fn status(&self, now: DateTime<Utc>) -> CadenceStatus {
        let session = self.session_at(now.time());
        CadenceStatus {
            consecutive_failures: self.consecutive_failures,
            consecutive_successes: self.consecutive_successes,
            current_session: session,
            threshold_met: self.threshold_met(session),
            last_signal_at: self.last_signal_at,
            win_rate: self.win_rate(None),
        }
    }

    /// Operator reset of the streak counters; session statistics are kept
    pub fn reset(&mut self) {
        self.consecutive_failures = 0;
        self.consecutive_successes = 0;
        tracing::info!("Cadence streaks reset");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CadenceConfig;
    use rust_decimal_macros::dec;

    fn tracker() -> CadenceTracker {
        CadenceTracker::new(&CadenceConfig::default()).unwrap()
    }

    #[test]
    fn test_counters_never_both_nonzero() {
        let mut t = tracker();
        let outcomes = [
            Outcome::Loss,
            Outcome::Loss,
            Outcome::Win,
            Outcome::Loss,
            Outcome::Win,
            Outcome::Win,
            Outcome::Loss,
        ];
        for outcome in outcomes {
            t.record_outcome(outcome, SessionTag::Morning, Utc::now());
            assert!(
                t.consecutive_failures() == 0 || t.consecutive_successes() == 0,
                "both streak counters non-zero"
            );
        }
    }

    #[test]
    fn test_win_resets_failures() {
        let mut t = tracker();
        t.record_outcome(Outcome::Loss, SessionTag::Morning, Utc::now());
        t.record_outcome(Outcome::Loss, SessionTag::Morning, Utc::now());
        assert_eq!(t.consecutive_failures(), 2);

        t.record_outcome(Outcome::Win, SessionTag::Morning, Utc::now());
        assert_eq!(t.consecutive_failures(), 0);
        assert_eq!(t.consecutive_successes(), 1);
    }

    #[test]
    fn test_morning_threshold_two_losses() {
        let mut t = tracker();
        assert!(!t.threshold_met(SessionTag::Morning));

        t.record_outcome(Outcome::Loss, SessionTag::Morning, Utc::now());
        assert!(!t.threshold_met(SessionTag::Morning));

        t.record_outcome(Outcome::Loss, SessionTag::Morning, Utc::now());
        assert!(t.threshold_met(SessionTag::Morning));
        // Afternoon needs three
        assert!(!t.threshold_met(SessionTag::Afternoon));
    }

    #[test]
    fn test_overnight_reuses_afternoon_threshold() {
        let mut t = tracker();
        for _ in 0..3 {
            t.record_outcome(Outcome::Loss, SessionTag::Overnight, Utc::now());
        }
        assert!(t.threshold_met(SessionTag::Overnight));
        assert!(t.threshold_met(SessionTag::Afternoon));
    }

    #[test]
    fn test_threshold_not_met_after_interrupting_win() {
        let mut t = tracker();
        t.record_outcome(Outcome::Loss, SessionTag::Morning, Utc::now());
        t.record_outcome(Outcome::Win, SessionTag::Morning, Utc::now());
        t.record_outcome(Outcome::Loss, SessionTag::Morning, Utc::now());
        assert!(!t.threshold_met(SessionTag::Morning));
    }

    #[test]
    fn test_session_derivation() {
        let t = tracker();
        let at = |h, m| NaiveTime::from_hms_opt(h, m, 0).unwrap();
        assert_eq!(t.session_at(at(9, 30)), SessionTag::Morning);
        assert_eq!(t.session_at(at(11, 59)), SessionTag::Morning);
        assert_eq!(t.session_at(at(12, 0)), SessionTag::Afternoon);
        assert_eq!(t.session_at(at(15, 59)), SessionTag::Afternoon);
        assert_eq!(t.session_at(at(16, 0)), SessionTag::Overnight);
        assert_eq!(t.session_at(at(2, 0)), SessionTag::Overnight);
    }

    #[test]
    fn test_win_rate_division_safe() {
        let t = tracker();
        assert_eq!(t.win_rate(None), Decimal::ZERO);
        assert_eq!(t.win_rate(Some(SessionTag::Morning)), Decimal::ZERO);
    }

    #[test]
    fn test_win_rate_per_session() {
        let mut t = tracker();
        t.record_outcome(Outcome::Win, SessionTag::Morning, Utc::now());
        t.record_outcome(Outcome::Loss, SessionTag::Morning, Utc::now());
        t.record_outcome(Outcome::Win, SessionTag::Afternoon, Utc::now());

        assert_eq!(t.win_rate(Some(SessionTag::Morning)), dec!(0.5));
        assert_eq!(t.win_rate(Some(SessionTag::Afternoon)), Decimal::ONE);
        // Overall: 2 wins of 3
        assert_eq!(t.win_rate(None).round_dp(4), dec!(0.6667));
    }

    #[test]
    fn test_reset_clears_streaks_keeps_stats() {
        let mut t = tracker();
        t.record_outcome(Outcome::Loss, SessionTag::Morning, Utc::now());
        t.record_outcome(Outcome::Loss, SessionTag::Morning, Utc::now());
        t.reset();
        assert_eq!(t.consecutive_failures(), 0);
        assert_eq!(t.session_stats(SessionTag::Morning).losses, 2);
    }

    #[test]
    fn test_status_report() {
        let mut t = tracker();
        t.record_outcome(Outcome::Loss, SessionTag::Morning, Utc::now());
        let status = t.status(Utc::now());
        assert_eq!(status.consecutive_failures, 1);
        assert!(status.last_signal_at.is_some());
    }

    #[test]
    fn test_last_signal_uses_outcome_timestamp() {
        use chrono::TimeZone;
        let mut t = tracker();
        // Replayed outcomes carry their own timestamps, not wall-clock time
        let settled = Utc.with_ymd_and_hms(2025, 3, 3, 10, 15, 0).unwrap();
        t.record_outcome(Outcome::Win, SessionTag::Morning, settled);
        assert_eq!(t.status(settled).last_signal_at, Some(settled));
    }
}
