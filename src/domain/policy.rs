//! Persisted, user-configurable trading policy.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Hard limits the policy engine enforces against every trade plan.
///
/// Persisted as a single versioned JSON document; `version` bumps on every
/// accepted update.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyConfig {
    /// Maximum risk a single plan may carry, as a portfolio percentage.
    pub max_position_size_pct: Decimal,
    /// Maximum same-direction risk across the trailing 24 hours.
    pub max_portfolio_risk_pct: Decimal,
    /// Maximum 24h risk concentrated in one asset.
    pub max_asset_concentration_pct: Decimal,
    /// Minimum minutes between executions of the same token.
    pub cooldown_minutes: i64,
    /// When set, every plan is refused until cleared.
    pub kill_switch_enabled: bool,
    /// Linear factor for the conviction-to-allocation mismatch heuristic.
    /// Advisory only; drives warnings, never violations.
    #[serde(default = "default_conviction_scaling")]
    pub conviction_scaling: Decimal,
    pub version: u64,
}

fn default_conviction_scaling() -> Decimal {
    Decimal::ONE
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            max_position_size_pct: Decimal::from(10),
            max_portfolio_risk_pct: Decimal::from(25),
            max_asset_concentration_pct: Decimal::from(15),
            cooldown_minutes: 60,
            kill_switch_enabled: false,
            conviction_scaling: default_conviction_scaling(),
            version: 1,
        }
    }
}

/// Partial update to [`PolicyConfig`]. `None` fields are left untouched.
///
/// Validation is all-or-nothing: every present field is range-checked
/// before any field is assigned.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PolicyUpdate {
    pub max_position_size_pct: Option<Decimal>,
    pub max_portfolio_risk_pct: Option<Decimal>,
    pub max_asset_concentration_pct: Option<Decimal>,
    pub cooldown_minutes: Option<i64>,
    pub conviction_scaling: Option<Decimal>,
}

/// Result of vetting a plan against the policy.
///
/// A pure value: identical `(config, log, plan)` inputs always produce an
/// identical verdict. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyVerdict {
    pub passed: bool,
    pub violations: Vec<String>,
    pub warnings: Vec<String>,
}

impl PolicyVerdict {
    #[must_use]
    pub fn pass() -> Self {
        Self {
            passed: true,
            violations: Vec::new(),
            warnings: Vec::new(),
        }
    }
}
