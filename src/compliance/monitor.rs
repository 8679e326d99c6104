//! Account-state ownership and rule enforcement

use super::rules::{ComplianceLevel, ComplianceRule, RuleId, RuleTable};
use crate::config::ComplianceConfig;
use chrono::{DateTime, Days, NaiveDate, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::VecDeque;

const PCT: Decimal = Decimal::ONE_HUNDRED;
const ALERT_HISTORY_CAPACITY: usize = 100;

/// Authoritative account state. Owned exclusively by the monitor; other
/// components only ever see cloned snapshots.
#[derive(Debug, Clone, Serialize)]
pub struct AccountState {
    pub starting_balance: Decimal,
    pub current_balance: Decimal,
    /// Monotonic high-water mark
    pub peak_balance: Decimal,
    pub total_pnl: Decimal,
    pub daily_pnl: Decimal,
    pub daily_trade_count: u32,
    pub consecutive_losses: u32,
    pub open_position_risk: Decimal,
    pub max_drawdown: Decimal,
    pub last_trade_at: Option<DateTime<Utc>>,
}

impl AccountState {
    fn new(starting_balance: Decimal) -> Self {
        Self {
            starting_balance,
            current_balance: starting_balance,
            peak_balance: starting_balance,
            total_pnl: Decimal::ZERO,
            daily_pnl: Decimal::ZERO,
            daily_trade_count: 0,
            consecutive_losses: 0,
            open_position_risk: Decimal::ZERO,
            max_drawdown: Decimal::ZERO,
            last_trade_at: None,
        }
    }

    pub fn current_drawdown(&self) -> Decimal {
        self.peak_balance - self.current_balance
    }
}

/// Result of checking one rule
#[derive(Debug, Clone, Serialize)]
pub struct RuleCheck {
    pub rule: RuleId,
    pub level: ComplianceLevel,
    pub observed: Decimal,
    pub hard_limit: Decimal,
    pub warning_threshold: Decimal,
    pub critical_threshold: Decimal,
}

/// Outcome of a full compliance evaluation
#[derive(Debug, Clone, Serialize)]
pub struct ComplianceReport {
    pub overall: ComplianceLevel,
    pub trading_enabled: bool,
    pub emergency_stop: bool,
    pub checks: Vec<RuleCheck>,
    pub timestamp: DateTime<Utc>,
}

/// First-class admissibility verdict for a proposed trade
#[derive(Debug, Clone, Serialize)]
pub enum PositionCheck {
    Approved {
        risk_amount: Decimal,
        risk_percentage: Decimal,
    },
    Denied {
        rule: Option<RuleId>,
        reason: String,
    },
}

impl PositionCheck {
    pub fn is_approved(&self) -> bool {
        matches!(self, PositionCheck::Approved { .. })
    }
}

/// Monitor statistics for reporting
#[derive(Debug, Clone, Default, Serialize)]
pub struct ComplianceStats {
    pub total_checks: u64,
    pub warnings_issued: u64,
    pub violations_recorded: u64,
    pub auto_stops_triggered: u64,
}

/// Multi-tier compliance monitor.
///
/// Evaluates every enabled rule against account state, aggregates the worst
/// level, and latches a global trading stop when a violation hits an
/// auto-stop rule. The stop holds until an explicit operator override.
pub struct ComplianceMonitor {
    rules: RuleTable,
    account: AccountState,
    reset_time: NaiveTime,
    current_trading_day: NaiveDate,
    trading_enabled: bool,
    emergency_stop: bool,
    stats: ComplianceStats,
    alerts: VecDeque<RuleCheck>,
}

impl ComplianceMonitor {
    pub fn new(config: &ComplianceConfig, now: DateTime<Utc>) -> anyhow::Result<Self> {
        let rules = RuleTable::from_config(config);
        rules.validate()?;
        let reset_time = config.reset_time()?;
        Ok(Self {
            rules,
            account: AccountState::new(config.account_size),
            reset_time,
            current_trading_day: trading_day(now, reset_time),
            trading_enabled: true,
            emergency_stop: false,
            stats: ComplianceStats::default(),
            alerts: VecDeque::with_capacity(ALERT_HISTORY_CAPACITY),
        })
    }

    /// Apply a settled trade to the account
    pub fn apply_trade_result(&mut self, pnl: Decimal, win: bool, now: DateTime<Utc>) {
        self.maybe_daily_reset(now);

        self.account.current_balance += pnl;
        self.account.total_pnl = self.account.current_balance - self.account.starting_balance;
        if self.account.current_balance > self.account.peak_balance {
            self.account.peak_balance = self.account.current_balance;
        }
        let drawdown = self.account.current_drawdown();
        if drawdown > self.account.max_drawdown {
            self.account.max_drawdown = drawdown;
        }

        self.account.daily_pnl += pnl;
        self.account.daily_trade_count += 1;
        self.account.last_trade_at = Some(now);
        if win {
            self.account.consecutive_losses = 0;
        } else {
            self.account.consecutive_losses += 1;
        }

        tracing::debug!(
            %pnl,
            win,
            balance = %self.account.current_balance,
            daily_pnl = %self.account.daily_pnl,
            consecutive_losses = self.account.consecutive_losses,
            "Trade result applied"
        );
    }

    /// Record the risk currently tied up in open positions
    pub fn set_open_position_risk(&mut self, risk: Decimal) {
        self.account.open_position_risk = risk.abs();
    }

    /// Evaluate all enabled rules against current account state
    pub fn evaluate(&mut self, now: DateTime<Utc>) -> ComplianceReport {
        self.maybe_daily_reset(now);
        self.stats.total_checks += 1;

        let mut checks = Vec::with_capacity(self.rules.len());
        let mut overall = ComplianceLevel::Safe;
        let mut stop_rule: Option<RuleId> = None;

        for rule in self.rules.enabled() {
            let observed = self.observed_value(rule);
            let level = rule.classify(observed);
            overall = overall.max(level);

            match level {
                ComplianceLevel::Warning => self.stats.warnings_issued += 1,
                ComplianceLevel::Critical | ComplianceLevel::Violation => {
                    self.stats.violations_recorded += 1
                }
                ComplianceLevel::Safe => {}
            }
            if level == ComplianceLevel::Violation && rule.auto_stop {
                stop_rule = Some(rule.id);
            }
            if level > ComplianceLevel::Safe {
                tracing::warn!(
                    rule = %rule.id,
                    ?level,
                    %observed,
                    hard_limit = %rule.hard_limit,
                    "Compliance rule breached threshold"
                );
            }

            let check = RuleCheck {
                rule: rule.id,
                level,
                observed,
                hard_limit: rule.hard_limit,
                warning_threshold: rule.warning_threshold,
                critical_threshold: rule.critical_threshold,
            };
            if level >= ComplianceLevel::Warning {
                if self.alerts.len() == ALERT_HISTORY_CAPACITY {
                    self.alerts.pop_front();
                }
                self.alerts.push_back(check.clone());
            }
            checks.push(check);
        }

        if let Some(rule) = stop_rule {
            self.trigger_emergency_stop(rule);
        }

        ComplianceReport {
            overall,
            trading_enabled: self.trading_enabled,
            emergency_stop: self.emergency_stop,
            checks,
            timestamp: now,
        }
    }

    /// Validate a specific proposed trade.
    ///
    /// Denials are first-class results, not errors: callers branch on them.
    pub fn can_open_position(
        &mut self,
        _proposed_size: Decimal,
        proposed_risk: Decimal,
        now: DateTime<Utc>,
    ) -> PositionCheck {
        self.maybe_daily_reset(now);

        if !self.trading_enabled {
            return PositionCheck::Denied {
                rule: None,
                reason: "trading disabled by compliance stop".to_string(),
            };
        }

        // An exhausted account has no risk percentage to quote
        if self.account.current_balance <= Decimal::ZERO {
            return PositionCheck::Denied {
                rule: None,
                reason: format!(
                    "account balance {} is not positive",
                    self.account.current_balance
                ),
            };
        }

        if let Some(rule) = self.rules.get(RuleId::PositionRisk) {
            if rule.enabled && proposed_risk > rule.hard_limit {
                return PositionCheck::Denied {
                    rule: Some(RuleId::PositionRisk),
                    reason: format!(
                        "trade risk {} exceeds maximum {}",
                        proposed_risk, rule.hard_limit
                    ),
                };
            }
        }

        if let Some(rule) = self.rules.get(RuleId::RevengeTrading) {
            if rule.enabled && Decimal::from(self.account.consecutive_losses) >= rule.hard_limit {
                return PositionCheck::Denied {
                    rule: Some(RuleId::RevengeTrading),
                    reason: format!(
                        "{} consecutive losses reached limit",
                        self.account.consecutive_losses
                    ),
                };
            }
        }

        if let Some(rule) = self.rules.get(RuleId::DailyTradeLimit) {
            if rule.enabled && Decimal::from(self.account.daily_trade_count) >= rule.hard_limit {
                return PositionCheck::Denied {
                    rule: Some(RuleId::DailyTradeLimit),
                    reason: format!(
                        "daily trade limit reached ({})",
                        self.account.daily_trade_count
                    ),
                };
            }
        }

        PositionCheck::Approved {
            risk_amount: proposed_risk,
            risk_percentage: proposed_risk / self.account.current_balance * PCT,
        }
    }

    /// Atomically replace the rule table after validating it
    pub fn reload_rules(&mut self, table: RuleTable) -> anyhow::Result<()> {
        table.validate()?;
        self.rules = table;
        tracing::info!("Compliance rule table reloaded");
        Ok(())
    }

    /// Clear the emergency stop. Requires an explicit operator override.
    pub fn reset_emergency_stop(&mut self, operator_override: bool) -> bool {
        if !operator_override {
            tracing::warn!("Emergency stop reset attempted without operator override");
            return false;
        }
        self.emergency_stop = false;
        self.trading_enabled = true;
        tracing::info!("Emergency stop cleared by operator override");
        true
    }

    pub fn trading_enabled(&self) -> bool {
        self.trading_enabled
    }

    pub fn emergency_stop(&self) -> bool {
        self.emergency_stop
    }

    pub fn snapshot(&self) -> AccountState {
        self.account.clone()
    }

    pub fn stats(&self) -> &ComplianceStats {
        &self.stats
    }

    /// Most recent Warning-or-worse rule checks, oldest first
    pub fn recent_alerts(&self) -> impl Iterator<Item = &RuleCheck> {
        self.alerts.iter()
    }

    fn observed_value(&self, rule: &ComplianceRule) -> Decimal {
        match rule.id {
            RuleId::MaxLoss => self.account.total_pnl,
            RuleId::DailyLoss => self.account.daily_pnl,
            RuleId::TrailingDrawdown => self.account.current_balance - self.account.peak_balance,
            RuleId::PositionRisk => self.account.open_position_risk,
            RuleId::RevengeTrading => Decimal::from(self.account.consecutive_losses),
            RuleId::DailyTradeLimit => Decimal::from(self.account.daily_trade_count),
        }
    }

    fn trigger_emergency_stop(&mut self, rule: RuleId) {
        if self.emergency_stop {
            return;
        }
        self.trading_enabled = false;
        self.emergency_stop = true;
        self.stats.auto_stops_triggered += 1;
        metrics::counter!("guardian_emergency_stops_total").increment(1);
        tracing::error!(rule = %rule, "EMERGENCY STOP: trading disabled by compliance violation");
    }

    /// Zero the daily fields exactly once per trading-day boundary crossing
    fn maybe_daily_reset(&mut self, now: DateTime<Utc>) {
        let day = trading_day(now, self.reset_time);
        if day != self.current_trading_day {
            self.account.daily_pnl = Decimal::ZERO;
            self.account.daily_trade_count = 0;
            self.current_trading_day = day;
            tracing::info!(trading_day = %day, "Daily compliance metrics reset");
        }
    }
}

/// The trading day a timestamp belongs to. Times at or past the daily
/// cutover belong to the next calendar day's trading session.
fn trading_day(now: DateTime<Utc>, reset_time: NaiveTime) -> NaiveDate {
    let date = now.date_naive();
    if now.time() >= reset_time {
        date.checked_add_days(Days::new(1)).unwrap_or(date)
    } else {
        date
    }
}
