//! Decision engine
//!
//! Single writer over the decision path: scores signal quality, sizes the
//! position, asks compliance for admission, and publishes exactly one
//! decision per reading. Anything that fails along the way degrades to a
//! stand-aside decision rather than an error.

use super::types::{Action, Decision};
use crate::audit::{AuditEvent, AuditSink};
use crate::broadcast::{Broadcaster, DecisionPublisher};
use crate::cadence::CadenceTracker;
use crate::compliance::{ComplianceLevel, ComplianceMonitor, PositionCheck};
use crate::config::{Config, DecisionConfig};
use crate::reading::{ConfluenceTier, FilterState, MarketContext, SignalReading, TradeOutcome};
use crate::sizing::{CalculationSource, KellyEngine, TradeRecord};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

const CONFLUENCE_BONUS: Decimal = dec!(0.3);
const STRONG_POWER_BONUS: Decimal = dec!(0.3);
const MODERATE_POWER_BONUS: Decimal = dec!(0.2);
const FILTER_BONUS: Decimal = dec!(0.2);
const CADENCE_BONUS: Decimal = dec!(0.3);

pub struct DecisionEngine {
    config: DecisionConfig,
    stop_atr_multiplier: Decimal,
    target_atr_multiplier: Decimal,
    default_risk_pct: Decimal,
    cadence: Arc<RwLock<CadenceTracker>>,
    sizing: Arc<RwLock<KellyEngine>>,
    compliance: Arc<RwLock<ComplianceMonitor>>,
    broadcaster: Arc<Broadcaster>,
    audit: Arc<dyn AuditSink>,
}

impl DecisionEngine {
    pub fn new(
        config: &Config,
        broadcaster: Arc<Broadcaster>,
        audit: Arc<dyn AuditSink>,
        now: DateTime<Utc>,
    ) -> anyhow::Result<Self> {
        Ok(Self {
            config: config.decision.clone(),
            stop_atr_multiplier: config.sizing.stop_atr_multiplier,
            target_atr_multiplier: config.sizing.target_atr_multiplier,
            default_risk_pct: config.sizing.default_risk_pct,
            cadence: Arc::new(RwLock::new(CadenceTracker::new(&config.cadence)?)),
            sizing: Arc::new(RwLock::new(KellyEngine::new(config.sizing.clone()))),
            compliance: Arc::new(RwLock::new(ComplianceMonitor::new(&config.compliance, now)?)),
            broadcaster,
            audit,
        })
    }

    /// Evaluate one reading and publish the resulting decision.
    ///
    /// Infallible by contract: internal failures produce a stand-aside
    /// decision carrying the failure in its reasoning.
    pub async fn evaluate(&self, reading: &SignalReading, context: &MarketContext) -> Decision {
        let now = reading.timestamp;

        // Refresh compliance first so a latched stop precedes any scoring
        let report = self.compliance.write().await.evaluate(now);
        for check in &report.checks {
            if check.level >= ComplianceLevel::Warning {
                self.audit_event(AuditEvent::ComplianceAlert {
                    timestamp: now,
                    rule: check.rule,
                    level: check.level,
                    detail: format!(
                        "observed {} against hard limit {}",
                        check.observed, check.hard_limit
                    ),
                })
                .await;
            }
        }

        let decision = self.build_decision(reading, context, now).await;

        tracing::info!(
            id = %decision.id,
            instrument = %decision.instrument,
            action = ?decision.action,
            confidence = %decision.confidence,
            size = %decision.position_size,
            "Decision published"
        );
        metrics::counter!(
            "guardian_decisions_total",
            "action" => action_label(decision.action)
        )
        .increment(1);

        self.broadcaster.publish(&decision);
        self.audit_event(AuditEvent::DecisionMade {
            timestamp: now,
            decision: decision.clone(),
        })
        .await;
        decision
    }

    async fn build_decision(
        &self,
        reading: &SignalReading,
        context: &MarketContext,
        now: DateTime<Utc>,
    ) -> Decision {
        let mut reasoning = Vec::new();
        let confidence = self.confidence(reading, &mut reasoning).await;

        // Every failed criterion is reported, not just the first
        let disqualifiers = self.disqualify(reading);
        if !disqualifiers.is_empty() {
            reasoning.extend(disqualifiers);
            let mut decision = Decision::no_trade(&context.instrument, now, reasoning);
            decision.confidence = confidence;
            return decision;
        }

        if context.atr <= Decimal::ZERO {
            tracing::warn!(instrument = %context.instrument, atr = %context.atr, "Non-positive ATR, standing aside");
            reasoning.push(format!("analysis error: non-positive ATR {}", context.atr));
            return Decision::no_trade(&context.instrument, now, reasoning);
        }
        let stop_distance = context.atr * self.stop_atr_multiplier;
        let target_distance = context.atr * self.target_atr_multiplier;
        let stop_price = context.entry_price - stop_distance;

        let sizing = match self.sizing.read().await.size_position(
            &context.instrument,
            context.entry_price,
            stop_price,
            confidence,
        ) {
            Ok(sizing) => sizing,
            Err(e) => {
                tracing::warn!(instrument = %context.instrument, error = %e, "Sizing failed, standing aside");
                reasoning.push(format!("analysis error: {e}"));
                return Decision::no_trade(&context.instrument, now, reasoning);
            }
        };

        // The Kelly gate uses the recommended fraction, not the realized
        // risk, which value caps can shrink arbitrarily. The fallback path
        // is gated on its fixed risk fraction.
        let gate_fraction = match sizing.source {
            CalculationSource::Default => self.default_risk_pct,
            _ => sizing.half_kelly_fraction,
        };
        reasoning.push(format!(
            "sizing: {:?} source, kelly fraction {}, {} units",
            sizing.source, gate_fraction, sizing.position_size
        ));

        let (action, mut position_size, mut risk_amount) = if confidence
            >= self.config.trade_confidence
            && gate_fraction >= self.config.trade_kelly_floor
        {
            (Action::Trade, sizing.position_size, sizing.risk_amount)
        } else if confidence >= self.config.cautious_confidence
            && gate_fraction >= self.config.cautious_kelly_floor
        {
            reasoning.push("below full conviction, size halved".to_string());
            (
                Action::CautiousTrade,
                sizing.position_size / Decimal::TWO,
                sizing.risk_amount / Decimal::TWO,
            )
        } else {
            reasoning.push(format!(
                "confidence {} / kelly {} below entry floors",
                confidence, gate_fraction
            ));
            let mut decision = Decision::no_trade(&context.instrument, now, reasoning);
            decision.confidence = confidence;
            decision.sizing = Some(sizing);
            return decision;
        };

        // Compliance has the last word
        let check =
            self.compliance
                .write()
                .await
                .can_open_position(position_size, risk_amount, now);
        let compliance_approved = match check {
            PositionCheck::Approved { .. } => {
                reasoning.push("compliance approved".to_string());
                true
            }
            PositionCheck::Denied { rule, reason } => {
                reasoning.push(format!("compliance denied: {reason}"));
                if let Some(rule) = rule {
                    self.audit_event(AuditEvent::ComplianceAlert {
                        timestamp: now,
                        rule,
                        level: ComplianceLevel::Violation,
                        detail: reason,
                    })
                    .await;
                }
                false
            }
        };
        let action = if compliance_approved {
            action
        } else {
            position_size = Decimal::ZERO;
            risk_amount = Decimal::ZERO;
            Action::NoTrade
        };

        Decision {
            id: Uuid::new_v4(),
            timestamp: now,
            instrument: context.instrument.clone(),
            action,
            confidence,
            position_size,
            risk_amount,
            kelly_fraction: gate_fraction,
            stop_distance,
            target_distance,
            compliance_approved,
            reasoning,
            sizing: Some(sizing),
        }
    }

    /// Record a settled trade across all three stateful components
    pub async fn record_outcome(&self, outcome: TradeOutcome) {
        self.compliance
            .write()
            .await
            .apply_trade_result(outcome.pnl, outcome.win, outcome.timestamp);
        let balance = self.compliance.read().await.snapshot().current_balance;

        {
            let mut sizing = self.sizing.write().await;
            sizing.record_trade(TradeRecord {
                timestamp: outcome.timestamp,
                instrument: outcome.instrument.clone(),
                pnl: outcome.pnl,
                win: outcome.win,
            });
            if let Err(e) = sizing.update_equity(balance) {
                tracing::warn!(error = %e, "Equity update rejected, sizing keeps prior baseline");
            }
        }

        self.cadence
            .write()
            .await
            .record_outcome(outcome.outcome(), outcome.session, outcome.timestamp);

        metrics::counter!("guardian_outcomes_total", "result" => if outcome.win { "win" } else { "loss" })
            .increment(1);
        self.audit_event(AuditEvent::OutcomeRecorded {
            timestamp: outcome.timestamp,
            outcome,
        })
        .await;
    }

    pub fn cadence(&self) -> Arc<RwLock<CadenceTracker>> {
        Arc::clone(&self.cadence)
    }

    pub fn sizing(&self) -> Arc<RwLock<KellyEngine>> {
        Arc::clone(&self.sizing)
    }

    pub fn compliance(&self) -> Arc<RwLock<ComplianceMonitor>> {
        Arc::clone(&self.compliance)
    }

    fn disqualify(&self, reading: &SignalReading) -> Vec<String> {
        let mut reasons = Vec::new();
        if reading.power_score < self.config.min_power {
            reasons.push(format!(
                "power {} below minimum {}",
                reading.power_score, self.config.min_power
            ));
        }
        if reading.confluence == ConfluenceTier::L1 {
            reasons.push("confluence at lowest tier".to_string());
        }
        if reading.filter_state == FilterState::Opposed {
            reasons.push("trend filter opposed".to_string());
        }
        if !reading.color.is_directional() {
            reasons.push("no tradeable direction".to_string());
        }
        reasons
    }

    /// Additive quality score, clamped to [0, 1]
    async fn confidence(&self, reading: &SignalReading, reasoning: &mut Vec<String>) -> Decimal {
        let mut score = Decimal::ZERO;

        if reading.confluence >= ConfluenceTier::L3 {
            score += CONFLUENCE_BONUS;
            reasoning.push(format!("confluence {:?}", reading.confluence));
        }
        if reading.power_score >= self.config.strong_power {
            score += STRONG_POWER_BONUS;
            reasoning.push(format!("strong power {}", reading.power_score));
        } else if reading.power_score >= self.config.moderate_power {
            score += MODERATE_POWER_BONUS;
            reasoning.push(format!("moderate power {}", reading.power_score));
        }
        if reading.filter_state == FilterState::Aligned {
            score += FILTER_BONUS;
            reasoning.push("trend filter aligned".to_string());
        }
        if self.cadence.read().await.threshold_met(reading.session) {
            score += CADENCE_BONUS;
            reasoning.push(format!("cadence threshold met ({:?})", reading.session));
        }

        score.min(Decimal::ONE)
    }

    async fn audit_event(&self, event: AuditEvent) {
        if let Err(e) = self.audit.record(event).await {
            tracing::error!(error = %e, "Audit write failed");
        }
    }
}

fn action_label(action: Action) -> &'static str {
    match action {
        Action::Trade => "trade",
        Action::CautiousTrade => "cautious_trade",
        Action::NoTrade => "no_trade",
    }
}
