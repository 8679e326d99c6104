//! Compliance rule table

use crate::config::ComplianceConfig;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Compliance alert levels, least to most severe
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComplianceLevel {
    Safe,
    Warning,
    Critical,
    Violation,
}

/// Rule identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleId {
    MaxLoss,
    DailyLoss,
    TrailingDrawdown,
    PositionRisk,
    RevengeTrading,
    DailyTradeLimit,
}

impl std::fmt::Display for RuleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            RuleId::MaxLoss => "max_loss",
            RuleId::DailyLoss => "daily_loss",
            RuleId::TrailingDrawdown => "trailing_drawdown",
            RuleId::PositionRisk => "position_risk",
            RuleId::RevengeTrading => "revenge_trading",
            RuleId::DailyTradeLimit => "daily_trade_limit",
        };
        f.write_str(name)
    }
}

/// One compliance rule: configuration, not runtime state.
///
/// Loss-style rules carry negative limits and violate when the observed
/// value falls to or below them; count-style rules carry positive limits
/// and violate when the observed value rises to or above them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComplianceRule {
    pub id: RuleId,
    pub hard_limit: Decimal,
    pub warning_threshold: Decimal,
    pub critical_threshold: Decimal,
    pub enabled: bool,
    pub auto_stop: bool,
}

impl ComplianceRule {
    /// Classify an observed value against the rule thresholds
    pub fn classify(&self, observed: Decimal) -> ComplianceLevel {
        if self.hard_limit < Decimal::ZERO {
            if observed <= self.hard_limit {
                ComplianceLevel::Violation
            } else if observed <= self.critical_threshold {
                ComplianceLevel::Critical
            } else if observed <= self.warning_threshold {
                ComplianceLevel::Warning
            } else {
                ComplianceLevel::Safe
            }
        } else if observed >= self.hard_limit {
            ComplianceLevel::Violation
        } else if observed >= self.critical_threshold {
            ComplianceLevel::Critical
        } else if observed >= self.warning_threshold {
            ComplianceLevel::Warning
        } else {
            ComplianceLevel::Safe
        }
    }

    fn validate(&self) -> anyhow::Result<()> {
        let ordered = if self.hard_limit < Decimal::ZERO {
            self.hard_limit <= self.critical_threshold
                && self.critical_threshold <= self.warning_threshold
                && self.warning_threshold <= Decimal::ZERO
        } else {
            Decimal::ZERO <= self.warning_threshold
                && self.warning_threshold <= self.critical_threshold
                && self.critical_threshold <= self.hard_limit
        };
        if !ordered {
            anyhow::bail!(
                "rule {}: thresholds out of order (hard {}, critical {}, warning {})",
                self.id,
                self.hard_limit,
                self.critical_threshold,
                self.warning_threshold
            );
        }
        Ok(())
    }
}

/// The full rule table. Swapped atomically on reload, never patched in place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleTable {
    rules: Vec<ComplianceRule>,
}

impl RuleTable {
    /// Build the default rule table from percentage-based configuration
    pub fn from_config(config: &ComplianceConfig) -> Self {
        let account = config.account_size;
        let loss_rule = |id: RuleId, limit: Decimal, auto_stop: bool| ComplianceRule {
            id,
            hard_limit: -limit,
            warning_threshold: -limit * dec!(0.7),
            critical_threshold: -limit * dec!(0.9),
            enabled: true,
            auto_stop,
        };

        let revenge_hard = Decimal::from(config.revenge_loss_limit);
        let trade_hard = Decimal::from(config.daily_trade_limit);

        Self {
            rules: vec![
                loss_rule(RuleId::MaxLoss, account * config.max_loss_pct, true),
                loss_rule(RuleId::DailyLoss, account * config.daily_loss_pct, true),
                loss_rule(
                    RuleId::TrailingDrawdown,
                    account * config.trailing_drawdown_pct,
                    true,
                ),
                ComplianceRule {
                    id: RuleId::PositionRisk,
                    hard_limit: account * config.position_risk_pct,
                    warning_threshold: account * config.position_risk_pct * dec!(0.8),
                    critical_threshold: account * config.position_risk_pct * dec!(0.95),
                    enabled: true,
                    auto_stop: false,
                },
                ComplianceRule {
                    id: RuleId::RevengeTrading,
                    hard_limit: revenge_hard,
                    warning_threshold: (revenge_hard - Decimal::TWO).max(Decimal::ZERO),
                    critical_threshold: (revenge_hard - Decimal::ONE).max(Decimal::ZERO),
                    enabled: true,
                    auto_stop: true,
                },
                ComplianceRule {
                    id: RuleId::DailyTradeLimit,
                    hard_limit: trade_hard,
                    warning_threshold: trade_hard * dec!(0.7),
                    critical_threshold: trade_hard * dec!(0.9),
                    enabled: true,
                    auto_stop: false,
                },
            ],
        }
    }

    /// Validate threshold ordering for every rule
    pub fn validate(&self) -> anyhow::Result<()> {
        for rule in &self.rules {
            rule.validate()?;
        }
        Ok(())
    }

    pub fn get(&self, id: RuleId) -> Option<&ComplianceRule> {
        self.rules.iter().find(|r| r.id == id)
    }

    pub fn enabled(&self) -> impl Iterator<Item = &ComplianceRule> {
        self.rules.iter().filter(|r| r.enabled)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
