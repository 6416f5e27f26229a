//! Risk limit configuration.

use std::collections::HashSet;

use rust_decimal::Decimal;
use serde::Deserialize;

use crate::application::risk::RiskLimits;

/// Risk limits as they appear in the TOML file.
#[derive(Debug, Clone, Deserialize)]
pub struct RiskConfig {
    /// Maximum notional size for a single action, in dollars.
    #[serde(default = "default_max_position_size")]
    pub max_position_size: Decimal,
    /// Maximum cumulative realized loss per day.
    #[serde(default = "default_daily_loss_limit")]
    pub daily_loss_limit: Decimal,
    /// Maximum simultaneously open positions.
    #[serde(default = "default_max_open_positions")]
    pub max_open_positions: u32,
    /// Tokens that are never traded.
    #[serde(default)]
    pub blacklist: HashSet<String>,
    /// Tools that always require human confirmation.
    #[serde(default)]
    pub confirm_tools: HashSet<String>,
    /// Tools treated as high-risk (pre/post hooks apply).
    #[serde(default = "default_high_risk_tools")]
    pub high_risk_tools: HashSet<String>,
    /// Consecutive losses that trip the circuit breaker.
    #[serde(default = "default_breaker_threshold")]
    pub breaker_threshold: u32,
    /// Cooldown before a tripped breaker resets, in minutes.
    #[serde(default = "default_breaker_cooldown_minutes")]
    pub breaker_cooldown_minutes: i64,
    /// Master switch for the breaker.
    #[serde(default = "default_true")]
    pub breaker_enabled: bool,
}

fn default_max_position_size() -> Decimal {
    Decimal::from(1000)
}

fn default_daily_loss_limit() -> Decimal {
    Decimal::from(500)
}

const fn default_max_open_positions() -> u32 {
    10
}

fn default_high_risk_tools() -> HashSet<String> {
    ["execute_trade", "close_position"]
        .into_iter()
        .map(String::from)
        .collect()
}

const fn default_breaker_threshold() -> u32 {
    3
}

const fn default_breaker_cooldown_minutes() -> i64 {
    30
}

const fn default_true() -> bool {
    true
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            max_position_size: default_max_position_size(),
            daily_loss_limit: default_daily_loss_limit(),
            max_open_positions: default_max_open_positions(),
            blacklist: HashSet::new(),
            confirm_tools: HashSet::new(),
            high_risk_tools: default_high_risk_tools(),
            breaker_threshold: default_breaker_threshold(),
            breaker_cooldown_minutes: default_breaker_cooldown_minutes(),
            breaker_enabled: default_true(),
        }
    }
}

impl From<RiskConfig> for RiskLimits {
    fn from(config: RiskConfig) -> Self {
        Self {
            max_position_size: config.max_position_size,
            daily_loss_limit: config.daily_loss_limit,
            max_open_positions: config.max_open_positions,
            blacklist: config.blacklist,
            confirm_tools: config.confirm_tools,
            breaker_threshold: config.breaker_threshold,
            breaker_cooldown_minutes: config.breaker_cooldown_minutes,
            breaker_enabled: config.breaker_enabled,
        }
    }
}
