//! Fixed-capacity trade history window

use super::types::{KellyStats, TradeRecord};
use chrono::Utc;
use rust_decimal::Decimal;
use std::collections::VecDeque;

const KELLY_CAP: Decimal = Decimal::from_parts(25, 0, 0, false, 2); // 0.25
const RECENT_SAMPLE: usize = 10;

/// Ring buffer of completed trades; oldest entries evicted first
pub struct TradeHistoryWindow {
    capacity: usize,
    records: VecDeque<TradeRecord>,
}

impl TradeHistoryWindow {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            records: VecDeque::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, record: TradeRecord) {
        if self.records.len() == self.capacity {
            self.records.pop_front();
        }
        self.records.push_back(record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TradeRecord> {
        self.records.iter()
    }

    /// Recompute Kelly statistics over the full window.
    ///
    /// Kelly = (b*p - q) / b with b the payoff ratio, p the win rate and
    /// q the loss rate, clamped to [0, 0.25]. A window with no losses has
    /// payoff ratio 0 and Kelly 0 rather than a division by zero.
    pub fn stats(
        &self,
        min_trades: usize,
        kelly_multiplier: Decimal,
        consistency_penalty_weight: Decimal,
    ) -> KellyStats {
        let total = self.records.len();
        if total == 0 {
            return KellyStats::empty();
        }

        let wins: Vec<Decimal> = self
            .records
            .iter()
            .filter(|r| r.win)
            .map(|r| r.pnl)
            .collect();
        let losses: Vec<Decimal> = self
            .records
            .iter()
            .filter(|r| !r.win)
            .map(|r| r.pnl.abs())
            .collect();

        let total_dec = Decimal::from(total);
        let win_rate = Decimal::from(wins.len()) / total_dec;
        let loss_rate = Decimal::from(losses.len()) / total_dec;

        let avg_win = mean(&wins);
        let avg_loss = mean(&losses);

        let payoff_ratio = if avg_loss > Decimal::ZERO {
            avg_win / avg_loss
        } else {
            Decimal::ZERO
        };

        let kelly_fraction = if payoff_ratio > Decimal::ZERO && loss_rate > Decimal::ZERO {
            ((payoff_ratio * win_rate - loss_rate) / payoff_ratio)
                .clamp(Decimal::ZERO, KELLY_CAP)
        } else {
            Decimal::ZERO
        };

        KellyStats {
            win_rate,
            avg_win,
            avg_loss,
            payoff_ratio,
            kelly_fraction,
            half_kelly_fraction: kelly_fraction * kelly_multiplier,
            confidence: self.confidence(min_trades, win_rate, consistency_penalty_weight),
            sample_size: total,
            last_updated: Utc::now(),
        }
    }

    /// Confidence in the statistics: discrete bands by sample size,
    /// penalized when the recent win rate diverges from the overall one.
    fn confidence(&self, min_trades: usize, overall_win_rate: Decimal, weight: Decimal) -> Decimal {
        let total = self.records.len();
        if total < min_trades {
            return Decimal::ZERO;
        }

        let mut confidence = if total < 50 {
            Decimal::new(6, 1) // 0.6
        } else if total < 100 {
            Decimal::new(8, 1) // 0.8
        } else {
            Decimal::new(9, 1) // 0.9
        };

        if total >= RECENT_SAMPLE {
            let recent_wins = self
                .records
                .iter()
                .rev()
                .take(RECENT_SAMPLE)
                .filter(|r| r.win)
                .count();
            let recent_win_rate = Decimal::from(recent_wins) / Decimal::from(RECENT_SAMPLE);
            let divergence = (recent_win_rate - overall_win_rate).abs();
            confidence *= Decimal::ONE - weight * divergence;
        }

        confidence.clamp(Decimal::ZERO, Decimal::ONE)
    }
}

fn mean(values: &[Decimal]) -> Decimal {
    if values.is_empty() {
        return Decimal::ZERO;
    }
    values.iter().sum::<Decimal>() / Decimal::from(values.len())
}
