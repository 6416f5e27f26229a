//! Trade plans and the append-only execution log.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Direction of a planned trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Long,
    Short,
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::Long => write!(f, "long"),
            Direction::Short => write!(f, "short"),
        }
    }
}

/// A proposed trade submitted to the policy engine for vetting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradePlan {
    /// Caller-assigned plan identifier, carried into the execution log.
    pub plan_id: String,
    /// Asset symbol the plan trades.
    pub token: String,
    pub direction: Direction,
    /// Portfolio share this plan puts at risk, as a percentage.
    pub risk_percent: Decimal,
    /// Optional agent conviction (0-100) backing the plan.
    pub conviction_percent: Option<Decimal>,
}

impl TradePlan {
    #[must_use]
    pub fn new(
        plan_id: impl Into<String>,
        token: impl Into<String>,
        direction: Direction,
        risk_percent: Decimal,
    ) -> Self {
        Self {
            plan_id: plan_id.into(),
            token: token.into(),
            direction,
            risk_percent,
            conviction_percent: None,
        }
    }

    #[must_use]
    pub fn with_conviction(mut self, conviction_percent: Decimal) -> Self {
        self.conviction_percent = Some(conviction_percent);
        self
    }
}

/// One executed plan in the rolling exposure log.
///
/// Entries are never deleted; exposure is reconstructed by time-filtering
/// at read.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionLogEntry {
    pub plan_id: String,
    pub timestamp: DateTime<Utc>,
    pub token: String,
    pub direction: Direction,
    pub risk_percent: Decimal,
}

impl ExecutionLogEntry {
    /// Record a plan as executed at `timestamp`.
    #[must_use]
    pub fn from_plan(plan: &TradePlan, timestamp: DateTime<Utc>) -> Self {
        Self {
            plan_id: plan.plan_id.clone(),
            timestamp,
            token: plan.token.clone(),
            direction: plan.direction,
            risk_percent: plan.risk_percent,
        }
    }
}
