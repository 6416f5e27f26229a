//! Risk manager: pre/post hooks gating high-risk agent actions.
//!
//! Checks run in a fixed order and short-circuit on the first failure:
//! circuit breaker, position size, daily loss, open positions, blacklist,
//! confirmation required. Non-fatal findings accumulate as warnings.

mod state;

pub use state::{BreakerSnapshot, BreakerState, RiskLimits, RiskState};

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{info, warn};

use crate::application::approval::{ApprovalTicket, ApprovalWorkflow};
use crate::domain::{ApprovalDecision, ApprovalId};
use crate::error::RiskError;

/// Context extracted from a tool invocation for risk evaluation.
#[derive(Debug, Clone)]
pub struct ToolCtx {
    pub tool_name: String,
    pub token: Option<String>,
    pub position_size: Option<Decimal>,
}

impl ToolCtx {
    /// Build a context from a tool call's JSON input.
    ///
    /// Recognizes the conventional `token`/`symbol` and `size`/`amount`
    /// fields; anything else is simply absent and skips the related checks.
    #[must_use]
    pub fn from_input(tool_name: impl Into<String>, input: &serde_json::Value) -> Self {
        let token = input
            .get("token")
            .or_else(|| input.get("symbol"))
            .and_then(|v| v.as_str())
            .map(str::to_string);
        let position_size = input
            .get("size")
            .or_else(|| input.get("amount"))
            .and_then(|v| {
                v.as_str()
                    .and_then(|s| s.parse::<Decimal>().ok())
                    .or_else(|| v.as_f64().and_then(Decimal::from_f64_retain))
            });
        Self {
            tool_name: tool_name.into(),
            token,
            position_size,
        }
    }
}

/// Observed outcome of a completed high-risk tool call.
#[derive(Debug, Clone, Default)]
pub struct ToolOutcome {
    /// Realized profit (positive) or loss (negative), when reported.
    pub pnl: Option<Decimal>,
    pub opened_position: bool,
    pub closed_position: bool,
}

impl ToolOutcome {
    /// Parse the conventional result payload fields (`pnl`, `position`).
    #[must_use]
    pub fn from_result(result: &str) -> Self {
        let Ok(value) = serde_json::from_str::<serde_json::Value>(result) else {
            return Self::default();
        };
        let pnl = value
            .get("pnl")
            .and_then(|v| {
                v.as_str()
                    .and_then(|s| s.parse::<Decimal>().ok())
                    .or_else(|| v.as_f64().and_then(Decimal::from_f64_retain))
            });
        let position = value.get("position").and_then(|v| v.as_str());
        Self {
            pnl,
            opened_position: position == Some("opened"),
            closed_position: position == Some("closed"),
        }
    }
}

/// Decision from the pre-hook. Never persisted.
#[derive(Debug, Clone)]
pub struct RiskCheckResult {
    pub allowed: bool,
    pub reason: Option<String>,
    pub warnings: Vec<String>,
    /// Refusal is a confirmation gate, not a hard block: the caller may
    /// create an approval request and proceed on approval.
    pub needs_approval: bool,
}

impl RiskCheckResult {
    fn allow(warnings: Vec<String>) -> Self {
        Self {
            allowed: true,
            reason: None,
            warnings,
            needs_approval: false,
        }
    }

    fn block(error: &RiskError, warnings: Vec<String>) -> Self {
        Self {
            allowed: false,
            reason: Some(error.to_string()),
            warnings,
            needs_approval: matches!(error, RiskError::ConfirmationRequired { .. }),
        }
    }

    #[must_use]
    pub fn is_allowed(&self) -> bool {
        self.allowed
    }
}

/// Read-only risk snapshot for status queries.
#[derive(Debug, Clone, Serialize)]
pub struct RiskMetrics {
    pub daily_loss: Decimal,
    pub daily_loss_limit: Decimal,
    pub open_positions: u32,
    pub max_open_positions: u32,
    pub max_position_size: Decimal,
    pub circuit_breaker: BreakerMetrics,
    pub pending_approvals: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct BreakerMetrics {
    pub enabled: bool,
    pub tripped: bool,
    pub consecutive_losses: u32,
    pub cooldown_remaining_minutes: i64,
}

/// Fraction of a limit at which a warning fires.
const WARN_RATIO: f64 = 0.8;

/// Gates high-risk tool calls against shared limits and the circuit
/// breaker, and owns the pending-approval registry.
pub struct RiskManager {
    state: Arc<RiskState>,
    high_risk_tools: HashSet<String>,
    approvals: Arc<ApprovalWorkflow>,
}

impl RiskManager {
    #[must_use]
    pub fn new(
        state: Arc<RiskState>,
        high_risk_tools: HashSet<String>,
        approvals: Arc<ApprovalWorkflow>,
    ) -> Self {
        Self {
            state,
            high_risk_tools,
            approvals,
        }
    }

    #[must_use]
    pub fn is_high_risk(&self, tool_name: &str) -> bool {
        self.high_risk_tools.contains(tool_name)
    }

    #[must_use]
    pub fn state(&self) -> &Arc<RiskState> {
        &self.state
    }

    #[must_use]
    pub fn approvals(&self) -> &Arc<ApprovalWorkflow> {
        &self.approvals
    }

    /// Pre-action hook. Runs the layered checks for high-risk tools; other
    /// tools pass through untouched.
    pub fn pre_tool_use(&self, ctx: &ToolCtx) -> RiskCheckResult {
        if !self.is_high_risk(&ctx.tool_name) {
            return RiskCheckResult::allow(Vec::new());
        }

        let mut warnings = Vec::new();

        if let Err(e) = self.check_circuit_breaker(&mut warnings) {
            warn!(tool = %ctx.tool_name, reason = %e, "Action blocked");
            return RiskCheckResult::block(&e, warnings);
        }
        if let Err(e) = self.check_position_size(ctx, &mut warnings) {
            warn!(tool = %ctx.tool_name, reason = %e, "Action blocked");
            return RiskCheckResult::block(&e, warnings);
        }
        if let Err(e) = self.check_daily_loss(&mut warnings) {
            warn!(tool = %ctx.tool_name, reason = %e, "Action blocked");
            return RiskCheckResult::block(&e, warnings);
        }
        if let Err(e) = self.check_open_positions(&mut warnings) {
            warn!(tool = %ctx.tool_name, reason = %e, "Action blocked");
            return RiskCheckResult::block(&e, warnings);
        }
        if let Err(e) = self.check_blacklist(ctx) {
            warn!(tool = %ctx.tool_name, reason = %e, "Action blocked");
            return RiskCheckResult::block(&e, warnings);
        }
        if let Err(e) = self.check_confirmation(ctx) {
            info!(tool = %ctx.tool_name, "Action gated pending confirmation");
            return RiskCheckResult::block(&e, warnings);
        }

        RiskCheckResult::allow(warnings)
    }

    /// Post-action hook: fold the observed outcome into shared counters.
    pub fn post_tool_use(&self, ctx: &ToolCtx, outcome: &ToolOutcome) {
        if !self.is_high_risk(&ctx.tool_name) {
            return;
        }

        if outcome.opened_position {
            self.state.position_opened();
        }
        if outcome.closed_position {
            self.state.position_closed();
        }
        match outcome.pnl {
            Some(pnl) if pnl < Decimal::ZERO => {
                let breaker = self.state.record_loss_trade(-pnl);
                info!(tool = %ctx.tool_name, pnl = %pnl, breaker = ?breaker, "Loss recorded");
            }
            Some(pnl) if pnl > Decimal::ZERO => {
                self.state.record_win_trade();
                info!(tool = %ctx.tool_name, pnl = %pnl, "Win recorded");
            }
            _ => {}
        }
    }

    /// Open an approval request for a gated action.
    pub async fn create_approval_request(
        &self,
        ctx: &ToolCtx,
        params: serde_json::Value,
        ttl: std::time::Duration,
    ) -> ApprovalTicket {
        self.approvals
            .create_request(&ctx.tool_name, params, ttl)
            .await
    }

    /// Resolve a pending approval as approved. Idempotent.
    pub async fn approve_request(&self, id: &ApprovalId) -> bool {
        self.approvals.resolve(id, ApprovalDecision::Approve).await
    }

    /// Resolve a pending approval as rejected. Idempotent.
    pub async fn reject_request(&self, id: &ApprovalId) -> bool {
        self.approvals.resolve(id, ApprovalDecision::Reject).await
    }

    /// Read-only metrics snapshot.
    #[must_use]
    pub fn metrics(&self) -> RiskMetrics {
        let limits = self.state.limits();
        let snap = self.state.breaker_snapshot(Utc::now());
        RiskMetrics {
            daily_loss: self.state.daily_loss(),
            daily_loss_limit: limits.daily_loss_limit,
            open_positions: self.state.open_positions(),
            max_open_positions: limits.max_open_positions,
            max_position_size: limits.max_position_size,
            circuit_breaker: BreakerMetrics {
                enabled: limits.breaker_enabled,
                tripped: snap.state == BreakerState::Tripped,
                consecutive_losses: snap.consecutive_losses,
                cooldown_remaining_minutes: snap.remaining_cooldown_minutes,
            },
            pending_approvals: self.approvals.pending_count(),
        }
    }

    fn check_circuit_breaker(&self, warnings: &mut Vec<String>) -> Result<(), RiskError> {
        let snap = self.state.breaker_snapshot(Utc::now());
        match snap.state {
            BreakerState::Tripped => Err(RiskError::CircuitOpen {
                consecutive_losses: snap.consecutive_losses,
                remaining_minutes: snap.remaining_cooldown_minutes,
            }),
            BreakerState::Warning => {
                warnings.push(format!(
                    "one more consecutive loss will trip the circuit breaker ({} of {})",
                    snap.consecutive_losses,
                    self.state.limits().breaker_threshold
                ));
                Ok(())
            }
            BreakerState::Normal => Ok(()),
        }
    }

    fn check_position_size(
        &self,
        ctx: &ToolCtx,
        warnings: &mut Vec<String>,
    ) -> Result<(), RiskError> {
        let Some(size) = ctx.position_size else {
            return Ok(());
        };
        let limit = self.state.limits().max_position_size;
        if size > limit {
            return Err(RiskError::PositionSizeExceeded {
                requested: size,
                limit,
            });
        }
        if size >= limit * warn_fraction() {
            warnings.push(format!(
                "position size {size} is approaching 80% of the {limit} limit"
            ));
        }
        Ok(())
    }

    fn check_daily_loss(&self, warnings: &mut Vec<String>) -> Result<(), RiskError> {
        let current = self.state.daily_loss();
        let limit = self.state.limits().daily_loss_limit;
        if current >= limit {
            return Err(RiskError::DailyLossExceeded { current, limit });
        }
        if current >= limit * warn_fraction() {
            warnings.push(format!(
                "daily loss {current} is approaching 80% of the {limit} limit"
            ));
        }
        Ok(())
    }

    fn check_open_positions(&self, warnings: &mut Vec<String>) -> Result<(), RiskError> {
        let current = self.state.open_positions();
        let limit = self.state.limits().max_open_positions;
        if current >= limit {
            return Err(RiskError::OpenPositionsExceeded { current, limit });
        }
        if f64::from(current) >= f64::from(limit) * WARN_RATIO {
            warnings.push(format!(
                "open positions {current} approaching 80% of the {limit} limit"
            ));
        }
        Ok(())
    }

    fn check_blacklist(&self, ctx: &ToolCtx) -> Result<(), RiskError> {
        if let Some(token) = &ctx.token {
            if self.state.limits().blacklist.contains(token) {
                return Err(RiskError::Blacklisted {
                    token: token.clone(),
                });
            }
        }
        Ok(())
    }

    fn check_confirmation(&self, ctx: &ToolCtx) -> Result<(), RiskError> {
        if self.state.limits().confirm_tools.contains(&ctx.tool_name) {
            return Err(RiskError::ConfirmationRequired {
                tool: ctx.tool_name.clone(),
            });
        }
        Ok(())
    }
}

fn warn_fraction() -> Decimal {
    Decimal::new(8, 1) // 0.8
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::NullNotifier;
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn manager_with(limits: RiskLimits) -> RiskManager {
        let approvals = Arc::new(ApprovalWorkflow::new(Arc::new(NullNotifier)));
        RiskManager::new(
            Arc::new(RiskState::new(limits)),
            ["execute_trade".to_string()].into_iter().collect(),
            approvals,
        )
    }

    fn trade_ctx(size: Decimal) -> ToolCtx {
        ToolCtx::from_input("execute_trade", &json!({"token": "SOL", "size": size.to_string()}))
    }

    #[test]
    fn low_risk_tools_pass_without_checks() {
        let manager = manager_with(RiskLimits::default());
        let ctx = ToolCtx::from_input("get_price", &json!({}));
        assert!(manager.pre_tool_use(&ctx).is_allowed());
    }

    #[test]
    fn position_size_over_limit_is_blocked() {
        let manager = manager_with(RiskLimits {
            max_position_size: dec!(100),
            ..Default::default()
        });
        let result = manager.pre_tool_use(&trade_ctx(dec!(150)));

        assert!(!result.is_allowed());
        assert!(!result.needs_approval);
        let reason = result.reason.unwrap();
        assert!(reason.contains("150"));
        assert!(reason.contains("100"));
    }

    #[test]
    fn position_size_near_limit_warns() {
        let manager = manager_with(RiskLimits {
            max_position_size: dec!(100),
            ..Default::default()
        });
        let result = manager.pre_tool_use(&trade_ctx(dec!(85)));

        assert!(result.is_allowed());
        assert_eq!(result.warnings.len(), 1);
        assert!(result.warnings[0].contains("80%"));
    }

    #[test]
    fn tripped_breaker_blocks_all_high_risk_calls() {
        let manager = manager_with(RiskLimits::default());
        for _ in 0..3 {
            manager.state().record_loss_trade(dec!(1));
        }

        let result = manager.pre_tool_use(&trade_ctx(dec!(10)));
        assert!(!result.is_allowed());
        assert!(result.reason.unwrap().contains("cooldown"));
    }

    #[test]
    fn blacklisted_token_is_blocked() {
        let manager = manager_with(RiskLimits {
            blacklist: ["SCAM".to_string()].into_iter().collect(),
            ..Default::default()
        });
        let ctx = ToolCtx::from_input("execute_trade", &json!({"token": "SCAM", "size": 5}));
        let result = manager.pre_tool_use(&ctx);

        assert!(!result.is_allowed());
        assert!(result.reason.unwrap().contains("SCAM"));
    }

    #[test]
    fn confirm_tool_is_gated_not_blocked() {
        let manager = manager_with(RiskLimits {
            confirm_tools: ["execute_trade".to_string()].into_iter().collect(),
            ..Default::default()
        });
        let result = manager.pre_tool_use(&trade_ctx(dec!(10)));

        assert!(!result.is_allowed());
        assert!(result.needs_approval);
    }

    #[test]
    fn daily_loss_at_limit_blocks() {
        let manager = manager_with(RiskLimits {
            daily_loss_limit: dec!(100),
            breaker_enabled: false,
            ..Default::default()
        });
        manager.state().add_daily_loss(dec!(100));

        let result = manager.pre_tool_use(&trade_ctx(dec!(10)));
        assert!(!result.is_allowed());
        assert!(result.reason.unwrap().contains("daily loss"));
    }

    #[test]
    fn open_position_limit_blocks() {
        let manager = manager_with(RiskLimits {
            max_open_positions: 2,
            ..Default::default()
        });
        manager.state().position_opened();
        manager.state().position_opened();

        let result = manager.pre_tool_use(&trade_ctx(dec!(10)));
        assert!(!result.is_allowed());
    }

    #[test]
    fn post_hook_feeds_breaker_and_positions() {
        let manager = manager_with(RiskLimits::default());
        let ctx = trade_ctx(dec!(10));

        let outcome = ToolOutcome::from_result(r#"{"pnl": -25.0, "position": "opened"}"#);
        manager.post_tool_use(&ctx, &outcome);

        assert_eq!(manager.state().consecutive_losses(), 1);
        assert_eq!(manager.state().open_positions(), 1);
        assert_eq!(manager.state().daily_loss(), dec!(25));

        let win = ToolOutcome::from_result(r#"{"pnl": 40.0, "position": "closed"}"#);
        manager.post_tool_use(&ctx, &win);
        assert_eq!(manager.state().consecutive_losses(), 0);
        assert_eq!(manager.state().open_positions(), 0);
    }

    #[test]
    fn metrics_snapshot_reflects_state() {
        let manager = manager_with(RiskLimits::default());
        manager.state().position_opened();
        manager.state().record_loss_trade(dec!(15));

        let metrics = manager.metrics();
        assert_eq!(metrics.open_positions, 1);
        assert_eq!(metrics.daily_loss, dec!(15));
        assert_eq!(metrics.circuit_breaker.consecutive_losses, 1);
        assert!(!metrics.circuit_breaker.tripped);
        assert_eq!(metrics.pending_approvals, 0);
    }
}
