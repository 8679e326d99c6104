//! Kelly criterion position sizing engine
//!
//! Maintains rolling trade windows (global and per instrument), recomputes
//! win-rate/payoff statistics on every settled trade, and answers sizing
//! requests with a risk-capped unit count. Falls back from per-instrument
//! statistics to global statistics to a fixed conservative risk when the
//! sample is too small.

use super::types::{CalculationSource, KellyStats, SizingError, SizingResult, TradeRecord};
use super::window::TradeHistoryWindow;
use crate::config::SizingConfig;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashMap;

const PCT: Decimal = Decimal::ONE_HUNDRED;

/// Summary of the recorded trade history
#[derive(Debug, Clone, Serialize)]
pub struct HistorySummary {
    pub total_trades: usize,
    pub winning_trades: usize,
    pub losing_trades: usize,
    pub win_rate: Decimal,
    pub total_pnl: Decimal,
    pub instruments: Vec<String>,
}

pub struct KellyEngine {
    config: SizingConfig,
    equity: Decimal,
    global: TradeHistoryWindow,
    by_instrument: HashMap<String, TradeHistoryWindow>,
    global_stats: KellyStats,
    instrument_stats: HashMap<String, KellyStats>,
}

impl KellyEngine {
    pub fn new(config: SizingConfig) -> Self {
        let equity = config.initial_equity;
        let global = TradeHistoryWindow::new(config.window_capacity);
        Self {
            config,
            equity,
            global,
            by_instrument: HashMap::new(),
            global_stats: KellyStats::empty(),
            instrument_stats: HashMap::new(),
        }
    }

    /// Record a settled trade and recompute cached statistics for the
    /// global window and the instrument's window.
    pub fn record_trade(&mut self, record: TradeRecord) {
        let instrument = record.instrument.clone();

        self.global.push(record.clone());
        self.by_instrument
            .entry(instrument.clone())
            .or_insert_with(|| TradeHistoryWindow::new(self.config.window_capacity))
            .push(record);

        self.global_stats = self.compute(&self.global);
        let stats = self.compute(&self.by_instrument[&instrument]);
        self.instrument_stats.insert(instrument.clone(), stats);

        tracing::debug!(
            %instrument,
            samples = self.global.len(),
            kelly = %self.global_stats.kelly_fraction,
            "Trade recorded, statistics refreshed"
        );
    }

    /// Compute a risk-capped position size for a proposed entry/stop pair.
    ///
    /// `signal_strength` scales the Kelly allocation and is clamped to [0, 1].
    pub fn size_position(
        &self,
        instrument: &str,
        entry_price: Decimal,
        stop_price: Decimal,
        signal_strength: Decimal,
    ) -> Result<SizingResult, SizingError> {
        if entry_price <= Decimal::ZERO {
            return Err(SizingError::InvalidEntry(entry_price));
        }
        let risk_per_unit = (entry_price - stop_price).abs();
        if risk_per_unit <= Decimal::ZERO {
            return Err(SizingError::InvalidStop {
                entry: entry_price,
                stop: stop_price,
            });
        }
        let strength = signal_strength.clamp(Decimal::ZERO, Decimal::ONE);

        let max_position_value = self.equity * self.config.max_position_pct;
        let max_units = max_position_value / entry_price;

        let (stats, source) = match self.select_stats(instrument) {
            // No losses yet means no measurable payoff; size conservatively
            Some((stats, source)) if stats.payoff_ratio > Decimal::ZERO => (stats, source),
            _ => return Ok(self.default_sizing(entry_price, risk_per_unit, max_units, strength)),
        };

        let kelly_allocation = self.equity * stats.half_kelly_fraction * strength;
        let units = (kelly_allocation / risk_per_unit).min(max_units);
        let risk_amount = units * risk_per_unit;

        Ok(SizingResult {
            position_size: units,
            position_value: units * entry_price,
            risk_amount,
            risk_percentage: risk_amount / self.equity * PCT,
            kelly_fraction: stats.kelly_fraction,
            half_kelly_fraction: stats.half_kelly_fraction,
            win_rate: stats.win_rate,
            payoff_ratio: stats.payoff_ratio,
            confidence: stats.confidence,
            signal_strength: strength,
            max_position_value,
            source,
        })
    }

    /// Replace the equity baseline for subsequent sizing requests.
    /// Historical statistics are not rewritten.
    pub fn update_equity(&mut self, new_equity: Decimal) -> Result<(), SizingError> {
        if new_equity <= Decimal::ZERO {
            return Err(SizingError::InvalidEquity(new_equity));
        }
        self.equity = new_equity;
        tracing::info!(equity = %new_equity, "Sizing equity baseline updated");
        Ok(())
    }

    pub fn equity(&self) -> Decimal {
        self.equity
    }

    pub fn global_stats(&self) -> &KellyStats {
        &self.global_stats
    }

    pub fn instrument_stats(&self, instrument: &str) -> Option<&KellyStats> {
        self.instrument_stats.get(instrument)
    }

    pub fn history_summary(&self) -> HistorySummary {
        let total = self.global.len();
        let wins = self.global.iter().filter(|r| r.win).count();
        let total_pnl = self.global.iter().map(|r| r.pnl).sum();
        let win_rate = if total == 0 {
            Decimal::ZERO
        } else {
            Decimal::from(wins) / Decimal::from(total)
        };
        let mut instruments: Vec<String> = self.by_instrument.keys().cloned().collect();
        instruments.sort();
        HistorySummary {
            total_trades: total,
            winning_trades: wins,
            losing_trades: total - wins,
            win_rate,
            total_pnl,
            instruments,
        }
    }

    fn compute(&self, window: &TradeHistoryWindow) -> KellyStats {
        window.stats(
            self.config.min_trades_for_kelly,
            self.config.kelly_multiplier,
            self.config.consistency_penalty_weight,
        )
    }

    /// Most specific statistics meeting the minimum sample size
    fn select_stats(&self, instrument: &str) -> Option<(&KellyStats, CalculationSource)> {
        if let Some(stats) = self.instrument_stats.get(instrument) {
            if stats.sample_size >= self.config.min_trades_for_kelly {
                return Some((stats, CalculationSource::Instrument));
            }
        }
        if self.global_stats.sample_size >= self.config.min_trades_for_kelly {
            return Some((&self.global_stats, CalculationSource::Global));
        }
        None
    }

    /// Fixed conservative risk when no window qualifies
    fn default_sizing(
        &self,
        entry_price: Decimal,
        risk_per_unit: Decimal,
        max_units: Decimal,
        strength: Decimal,
    ) -> SizingResult {
        let target_risk = self.equity * self.config.default_risk_pct;
        let units = (target_risk / risk_per_unit).min(max_units);
        let risk_amount = units * risk_per_unit;

        SizingResult {
            position_size: units,
            position_value: units * entry_price,
            risk_amount,
            risk_percentage: risk_amount / self.equity * PCT,
            kelly_fraction: Decimal::ZERO,
            half_kelly_fraction: Decimal::ZERO,
            win_rate: Decimal::ZERO,
            payoff_ratio: Decimal::ZERO,
            confidence: Decimal::ZERO,
            signal_strength: strength,
            max_position_value: self.equity * self.config.max_position_pct,
            source: CalculationSource::Default,
        }
    }
}
