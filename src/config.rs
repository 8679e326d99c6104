//! Configuration types for signal-guardian
//!
//! All tunables are loadable from TOML and validated at load time. Invalid
//! configuration is rejected with a descriptive error, never silently
//! clamped.

use chrono::NaiveTime;
use rust_decimal::Decimal;
use serde::Deserialize;

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub reading: ReadingConfig,
    #[serde(default)]
    pub cadence: CadenceConfig,
    #[serde(default)]
    pub sizing: SizingConfig,
    #[serde(default)]
    pub compliance: ComplianceConfig,
    #[serde(default)]
    pub decision: DecisionConfig,
    #[serde(default)]
    pub broadcast: BroadcastConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

/// Reading ingestion configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ReadingConfig {
    /// Lower bound of the valid power score domain
    #[serde(default)]
    pub power_min: u8,

    /// Upper bound of the valid power score domain
    #[serde(default = "default_power_max")]
    pub power_max: u8,

    /// A source that stays silent longer than this is treated as
    /// "no new reading" for the cycle
    #[serde(default = "default_read_timeout_secs")]
    pub read_timeout_secs: u64,

    /// Replay pacing for captured readings (milliseconds)
    #[serde(default = "default_replay_interval_ms")]
    pub replay_interval_ms: u64,
}

fn default_power_max() -> u8 {
    100
}
fn default_read_timeout_secs() -> u64 {
    5
}
fn default_replay_interval_ms() -> u64 {
    250
}

impl Default for ReadingConfig {
    fn default() -> Self {
        Self {
            power_min: 0,
            power_max: 100,
            read_timeout_secs: 5,
            replay_interval_ms: 250,
        }
    }
}

impl ReadingConfig {
    pub fn power_domain(&self) -> (u8, u8) {
        (self.power_min, self.power_max)
    }
}

/// Cadence tracker configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CadenceConfig {
    /// Consecutive failures required in the morning session
    #[serde(default = "default_morning_threshold")]
    pub morning_threshold: u32,

    /// Consecutive failures required in the afternoon session.
    /// The overnight session reuses this threshold.
    #[serde(default = "default_afternoon_threshold")]
    pub afternoon_threshold: u32,

    /// Morning session start, local time (HH:MM)
    #[serde(default = "default_morning_start")]
    pub morning_start: String,

    /// Morning session end / afternoon start (HH:MM)
    #[serde(default = "default_morning_end")]
    pub morning_end: String,

    /// Afternoon session end; everything else is overnight (HH:MM)
    #[serde(default = "default_afternoon_end")]
    pub afternoon_end: String,
}

fn default_morning_threshold() -> u32 {
    2
}
fn default_afternoon_threshold() -> u32 {
    3
}
fn default_morning_start() -> String {
    "09:30".to_string()
}
fn default_morning_end() -> String {
    "12:00".to_string()
}
fn default_afternoon_end() -> String {
    "16:00".to_string()
}

impl Default for CadenceConfig {
    fn default() -> Self {
        Self {
            morning_threshold: 2,
            afternoon_threshold: 3,
            morning_start: default_morning_start(),
            morning_end: default_morning_end(),
            afternoon_end: default_afternoon_end(),
        }
    }
}

impl CadenceConfig {
    /// Parse the configured session window boundaries
    pub fn windows(&self) -> anyhow::Result<(NaiveTime, NaiveTime, NaiveTime)> {
        Ok((
            parse_time("cadence.morning_start", &self.morning_start)?,
            parse_time("cadence.morning_end", &self.morning_end)?,
            parse_time("cadence.afternoon_end", &self.afternoon_end)?,
        ))
    }
}

/// Kelly position sizing configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SizingConfig {
    /// Rolling trade window capacity (global and per instrument)
    #[serde(default = "default_window_capacity")]
    pub window_capacity: usize,

    /// Minimum samples before Kelly statistics are trusted
    #[serde(default = "default_min_trades_for_kelly")]
    pub min_trades_for_kelly: usize,

    /// Fraction of full Kelly applied (0.5 = half-Kelly)
    #[serde(default = "default_kelly_multiplier")]
    pub kelly_multiplier: Decimal,

    /// Position value cap as a fraction of equity
    #[serde(default = "default_max_position_pct")]
    pub max_position_pct: Decimal,

    /// Fixed risk fraction used when Kelly statistics are unavailable
    #[serde(default = "default_risk_pct")]
    pub default_risk_pct: Decimal,

    /// Weight of the recent-vs-overall win-rate divergence penalty
    /// applied to the sizing confidence score
    #[serde(default = "default_consistency_penalty_weight")]
    pub consistency_penalty_weight: Decimal,

    /// Starting account equity for sizing
    #[serde(default = "default_initial_equity")]
    pub initial_equity: Decimal,

    /// Stop distance as a multiple of the injected ATR
    #[serde(default = "default_stop_atr_multiplier")]
    pub stop_atr_multiplier: Decimal,

    /// Profit target distance as a multiple of the injected ATR
    #[serde(default = "default_target_atr_multiplier")]
    pub target_atr_multiplier: Decimal,
}

fn default_window_capacity() -> usize {
    100
}
fn default_min_trades_for_kelly() -> usize {
    20
}
fn default_kelly_multiplier() -> Decimal {
    Decimal::new(5, 1) // 0.5
}
fn default_max_position_pct() -> Decimal {
    Decimal::new(5, 2) // 0.05
}
fn default_risk_pct() -> Decimal {
    Decimal::new(1, 2) // 0.01
}
fn default_consistency_penalty_weight() -> Decimal {
    Decimal::ONE
}
fn default_initial_equity() -> Decimal {
    Decimal::new(50_000, 0)
}
fn default_stop_atr_multiplier() -> Decimal {
    Decimal::new(15, 1) // 1.5
}
fn default_target_atr_multiplier() -> Decimal {
    Decimal::TWO
}

impl Default for SizingConfig {
    fn default() -> Self {
        Self {
            window_capacity: default_window_capacity(),
            min_trades_for_kelly: default_min_trades_for_kelly(),
            kelly_multiplier: default_kelly_multiplier(),
            max_position_pct: default_max_position_pct(),
            default_risk_pct: default_risk_pct(),
            consistency_penalty_weight: default_consistency_penalty_weight(),
            initial_equity: default_initial_equity(),
            stop_atr_multiplier: default_stop_atr_multiplier(),
            target_atr_multiplier: default_target_atr_multiplier(),
        }
    }
}

/// Compliance monitor configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ComplianceConfig {
    /// Account size the percentage-based rule limits are derived from
    #[serde(default = "default_account_size")]
    pub account_size: Decimal,

    /// Total loss limit as a fraction of account size
    #[serde(default = "default_max_loss_pct")]
    pub max_loss_pct: Decimal,

    /// Daily loss limit as a fraction of account size
    #[serde(default = "default_daily_loss_pct")]
    pub daily_loss_pct: Decimal,

    /// Trailing drawdown limit from peak balance as a fraction of account size
    #[serde(default = "default_trailing_drawdown_pct")]
    pub trailing_drawdown_pct: Decimal,

    /// Single-trade risk limit as a fraction of account size
    #[serde(default = "default_position_risk_pct")]
    pub position_risk_pct: Decimal,

    /// Consecutive losses before trading stops
    #[serde(default = "default_revenge_loss_limit")]
    pub revenge_loss_limit: u32,

    /// Maximum trades per day
    #[serde(default = "default_daily_trade_limit")]
    pub daily_trade_limit: u32,

    /// Daily reset boundary, local time (HH:MM)
    #[serde(default = "default_daily_reset_time")]
    pub daily_reset_time: String,
}

fn default_account_size() -> Decimal {
    Decimal::new(50_000, 0)
}
fn default_max_loss_pct() -> Decimal {
    Decimal::new(8, 2) // 0.08
}
fn default_daily_loss_pct() -> Decimal {
    Decimal::new(5, 2) // 0.05
}
fn default_trailing_drawdown_pct() -> Decimal {
    Decimal::new(5, 2) // 0.05
}
fn default_position_risk_pct() -> Decimal {
    Decimal::new(2, 2) // 0.02
}
fn default_revenge_loss_limit() -> u32 {
    5
}
fn default_daily_trade_limit() -> u32 {
    50
}
fn default_daily_reset_time() -> String {
    "17:00".to_string()
}

impl Default for ComplianceConfig {
    fn default() -> Self {
        Self {
            account_size: default_account_size(),
            max_loss_pct: default_max_loss_pct(),
            daily_loss_pct: default_daily_loss_pct(),
            trailing_drawdown_pct: default_trailing_drawdown_pct(),
            position_risk_pct: default_position_risk_pct(),
            revenge_loss_limit: default_revenge_loss_limit(),
            daily_trade_limit: default_daily_trade_limit(),
            daily_reset_time: default_daily_reset_time(),
        }
    }
}

impl ComplianceConfig {
    pub fn reset_time(&self) -> anyhow::Result<NaiveTime> {
        parse_time("compliance.daily_reset_time", &self.daily_reset_time)
    }
}

/// Decision engine thresholds
#[derive(Debug, Clone, Deserialize)]
pub struct DecisionConfig {
    /// Power scores below this disqualify the reading outright
    #[serde(default = "default_min_power")]
    pub min_power: u8,

    /// Power score earning a moderate confidence contribution
    #[serde(default = "default_moderate_power")]
    pub moderate_power: u8,

    /// Power score earning the full confidence contribution
    #[serde(default = "default_strong_power")]
    pub strong_power: u8,

    /// Combined confidence required for a full TRADE
    #[serde(default = "default_trade_confidence")]
    pub trade_confidence: Decimal,

    /// Combined confidence required for a CAUTIOUS_TRADE
    #[serde(default = "default_cautious_confidence")]
    pub cautious_confidence: Decimal,

    /// Kelly fraction floor for a full TRADE
    #[serde(default = "default_trade_kelly_floor")]
    pub trade_kelly_floor: Decimal,

    /// Kelly fraction floor for a CAUTIOUS_TRADE
    #[serde(default = "default_cautious_kelly_floor")]
    pub cautious_kelly_floor: Decimal,
}

fn default_min_power() -> u8 {
    10
}
fn default_moderate_power() -> u8 {
    15
}
fn default_strong_power() -> u8 {
    20
}
fn default_trade_confidence() -> Decimal {
    Decimal::new(7, 1) // 0.7
}
fn default_cautious_confidence() -> Decimal {
    Decimal::new(5, 1) // 0.5
}
fn default_trade_kelly_floor() -> Decimal {
    Decimal::new(2, 2) // 0.02
}
fn default_cautious_kelly_floor() -> Decimal {
    Decimal::new(1, 2) // 0.01
}

impl Default for DecisionConfig {
    fn default() -> Self {
        Self {
            min_power: default_min_power(),
            moderate_power: default_moderate_power(),
            strong_power: default_strong_power(),
            trade_confidence: default_trade_confidence(),
            cautious_confidence: default_cautious_confidence(),
            trade_kelly_floor: default_trade_kelly_floor(),
            cautious_kelly_floor: default_cautious_kelly_floor(),
        }
    }
}

/// Broadcast boundary configuration
#[derive(Debug, Clone, Deserialize)]
pub struct BroadcastConfig {
    /// Bounded queue depth per subscriber
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

fn default_queue_capacity() -> usize {
    64
}

impl Default for BroadcastConfig {
    fn default() -> Self {
        Self {
            queue_capacity: default_queue_capacity(),
        }
    }
}

/// Telemetry configuration
#[derive(Debug, Clone, Deserialize)]
pub struct TelemetryConfig {
    #[serde(default = "default_metrics_port")]
    pub metrics_port: u16,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_metrics_port() -> u16 {
    9090
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            metrics_port: default_metrics_port(),
            log_level: default_log_level(),
        }
    }
}

fn parse_time(field: &str, value: &str) -> anyhow::Result<NaiveTime> {
    NaiveTime::parse_from_str(value, "%H:%M")
        .map_err(|e| anyhow::anyhow!("{field}: invalid time {value:?}: {e}"))
}

fn check_fraction(field: &str, value: Decimal) -> anyhow::Result<()> {
    if value <= Decimal::ZERO || value > Decimal::ONE {
        anyhow::bail!("{field} must be in (0, 1], got {value}");
    }
    Ok(())
}

fn check_unit_interval(field: &str, value: Decimal) -> anyhow::Result<()> {
    if value < Decimal::ZERO || value > Decimal::ONE {
        anyhow::bail!("{field} must be in [0, 1], got {value}");
    }
    Ok(())
}

impl Config {
    /// Load configuration from a TOML file and validate it
    pub fn load(path: impl AsRef<std::path::Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate numeric ranges and threshold ordering
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.reading.power_min >= self.reading.power_max {
            anyhow::bail!(
                "reading.power_min ({}) must be below power_max ({})",
                self.reading.power_min,
                self.reading.power_max
            );
        }

        let (morning_start, morning_end, afternoon_end) = self.cadence.windows()?;
        if morning_start >= morning_end || morning_end > afternoon_end {
            anyhow::bail!("cadence session windows must be ordered: morning_start < morning_end <= afternoon_end");
        }

        if self.sizing.window_capacity == 0 {
            anyhow::bail!("sizing.window_capacity must be positive");
        }
        if self.sizing.min_trades_for_kelly == 0 {
            anyhow::bail!("sizing.min_trades_for_kelly must be positive");
        }
        check_fraction("sizing.kelly_multiplier", self.sizing.kelly_multiplier)?;
        check_fraction("sizing.max_position_pct", self.sizing.max_position_pct)?;
        check_fraction("sizing.default_risk_pct", self.sizing.default_risk_pct)?;
        check_unit_interval(
            "sizing.consistency_penalty_weight",
            self.sizing.consistency_penalty_weight,
        )?;
        if self.sizing.initial_equity <= Decimal::ZERO {
            anyhow::bail!("sizing.initial_equity must be positive");
        }
        if self.sizing.stop_atr_multiplier <= Decimal::ZERO
            || self.sizing.target_atr_multiplier <= Decimal::ZERO
        {
            anyhow::bail!("sizing ATR multipliers must be positive");
        }

        if self.compliance.account_size <= Decimal::ZERO {
            anyhow::bail!("compliance.account_size must be positive");
        }
        check_fraction("compliance.max_loss_pct", self.compliance.max_loss_pct)?;
        check_fraction("compliance.daily_loss_pct", self.compliance.daily_loss_pct)?;
        check_fraction(
            "compliance.trailing_drawdown_pct",
            self.compliance.trailing_drawdown_pct,
        )?;
        check_fraction(
            "compliance.position_risk_pct",
            self.compliance.position_risk_pct,
        )?;
        if self.compliance.revenge_loss_limit == 0 {
            anyhow::bail!("compliance.revenge_loss_limit must be positive");
        }
        if self.compliance.daily_trade_limit == 0 {
            anyhow::bail!("compliance.daily_trade_limit must be positive");
        }
        self.compliance.reset_time()?;

        if self.decision.min_power > self.decision.moderate_power
            || self.decision.moderate_power > self.decision.strong_power
        {
            anyhow::bail!("decision power thresholds must be ordered: min <= moderate <= strong");
        }
        check_unit_interval("decision.trade_confidence", self.decision.trade_confidence)?;
        check_unit_interval(
            "decision.cautious_confidence",
            self.decision.cautious_confidence,
        )?;
        if self.decision.cautious_confidence > self.decision.trade_confidence {
            anyhow::bail!("decision.cautious_confidence must not exceed trade_confidence");
        }
        check_unit_interval("decision.trade_kelly_floor", self.decision.trade_kelly_floor)?;
        check_unit_interval(
            "decision.cautious_kelly_floor",
            self.decision.cautious_kelly_floor,
        )?;
        if self.decision.cautious_kelly_floor > self.decision.trade_kelly_floor {
            anyhow::bail!("decision.cautious_kelly_floor must not exceed trade_kelly_floor");
        }

        if self.broadcast.queue_capacity == 0 {
            anyhow::bail!("broadcast.queue_capacity must be positive");
        }

        Ok(())
    }
}
