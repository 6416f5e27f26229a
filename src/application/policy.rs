//! Policy engine: persisted user limits checked against the execution log.
//!
//! [`evaluate`] is a pure function of `(PolicyConfig, log, plan, now)`.
//! The engine wraps it with the persisted config and append-only log, and
//! keeps both durable: every accepted mutation is written through the
//! stores before the call returns.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::{info, warn};

use crate::domain::{ExecutionLogEntry, PolicyConfig, PolicyUpdate, PolicyVerdict, TradePlan};
use crate::error::{PolicyError, Result};
use crate::port::{ExecutionLogStore, PolicyStore};

/// Fraction of a limit at which a warning fires.
const WARN_RATIO: Decimal = dec!(0.8);

/// Rolling exposure window.
const EXPOSURE_WINDOW_HOURS: i64 = 24;

/// Check a plan against the policy. Pure: no clocks, no stores.
///
/// Checks run in order and all violations are collected (a verdict can
/// carry several): kill switch, position size, per-token cooldown,
/// 24h same-direction portfolio risk, per-asset concentration.
#[must_use]
pub fn evaluate(
    config: &PolicyConfig,
    log: &[ExecutionLogEntry],
    plan: &TradePlan,
    now: DateTime<Utc>,
) -> PolicyVerdict {
    let mut verdict = PolicyVerdict::pass();

    if config.kill_switch_enabled {
        verdict.violations.push("kill switch is enabled; all trading is halted".to_string());
        verdict.passed = false;
        return verdict;
    }

    // Position size.
    if plan.risk_percent > config.max_position_size_pct {
        verdict.violations.push(format!(
            "plan risk {}% exceeds max position size {}%",
            plan.risk_percent, config.max_position_size_pct
        ));
    } else if plan.risk_percent >= config.max_position_size_pct * WARN_RATIO {
        verdict.warnings.push(format!(
            "plan risk {}% is above 80% of the {}% position limit",
            plan.risk_percent, config.max_position_size_pct
        ));
    }

    // Per-token cooldown.
    let last_for_token = log
        .iter()
        .filter(|e| e.token == plan.token)
        .max_by_key(|e| e.timestamp);
    if let Some(last) = last_for_token {
        let since = now - last.timestamp;
        let cooldown = Duration::minutes(config.cooldown_minutes);
        if since < cooldown {
            let remaining = (cooldown - since).num_minutes().max(0) + 1;
            verdict.violations.push(format!(
                "{} was traded {} minutes ago; cooldown of {} minutes has {} minutes remaining",
                plan.token,
                since.num_minutes(),
                config.cooldown_minutes,
                remaining
            ));
        }
    }

    // Trailing 24h same-direction portfolio risk.
    let window_start = now - Duration::hours(EXPOSURE_WINDOW_HOURS);
    let portfolio: Decimal = log
        .iter()
        .filter(|e| e.timestamp >= window_start && e.direction == plan.direction)
        .map(|e| e.risk_percent)
        .sum();
    let portfolio_after = portfolio + plan.risk_percent;
    if portfolio_after > config.max_portfolio_risk_pct {
        verdict.violations.push(format!(
            "24h {} exposure {}% + plan {}% exceeds max portfolio risk {}%",
            plan.direction, portfolio, plan.risk_percent, config.max_portfolio_risk_pct
        ));
    } else if portfolio_after >= config.max_portfolio_risk_pct * WARN_RATIO {
        verdict.warnings.push(format!(
            "24h {} exposure would reach {}%, above 80% of the {}% limit",
            plan.direction, portfolio_after, config.max_portfolio_risk_pct
        ));
    }

    // Same, scoped to the plan's token.
    let token_exposure: Decimal = log
        .iter()
        .filter(|e| {
            e.timestamp >= window_start && e.direction == plan.direction && e.token == plan.token
        })
        .map(|e| e.risk_percent)
        .sum();
    let token_after = token_exposure + plan.risk_percent;
    if token_after > config.max_asset_concentration_pct {
        verdict.violations.push(format!(
            "24h exposure to {} would reach {}%, exceeding max asset concentration {}%",
            plan.token, token_after, config.max_asset_concentration_pct
        ));
    } else if token_after >= config.max_asset_concentration_pct * WARN_RATIO {
        verdict.warnings.push(format!(
            "24h exposure to {} would reach {}%, above 80% of the {}% concentration limit",
            plan.token, token_after, config.max_asset_concentration_pct
        ));
    }

    // Conviction mismatch heuristic: advisory only.
    if let Some(conviction) = plan.conviction_percent {
        let expected = conviction / Decimal::from(100)
            * config.max_position_size_pct
            * config.conviction_scaling;
        if expected > Decimal::ZERO && plan.risk_percent > expected * Decimal::from(2) {
            verdict.warnings.push(format!(
                "plan risk {}% is more than twice the {}% suggested by {}% conviction",
                plan.risk_percent, expected.round_dp(2), conviction
            ));
        }
    }

    verdict.passed = verdict.violations.is_empty();
    verdict
}

/// Persisted policy plus the rolling execution log.
pub struct PolicyEngine {
    config: RwLock<PolicyConfig>,
    log: RwLock<Vec<ExecutionLogEntry>>,
    policy_store: Arc<dyn PolicyStore>,
    log_store: Arc<dyn ExecutionLogStore>,
}

impl PolicyEngine {
    /// Load the engine from its stores.
    ///
    /// A missing policy document starts from defaults; a corrupt one is
    /// logged and replaced by defaults rather than crashing (last-known-good
    /// semantics live in the store layer).
    pub async fn load(
        policy_store: Arc<dyn PolicyStore>,
        log_store: Arc<dyn ExecutionLogStore>,
    ) -> Result<Self> {
        let config = match policy_store.load().await {
            Ok(Some(config)) => config,
            Ok(None) => {
                info!("No policy document found, starting from defaults");
                PolicyConfig::default()
            }
            Err(e) => {
                warn!(error = %e, "Policy document unreadable, falling back to defaults");
                PolicyConfig::default()
            }
        };
        let log = log_store.load().await.unwrap_or_else(|e| {
            warn!(error = %e, "Execution log unreadable, starting empty");
            Vec::new()
        });

        Ok(Self {
            config: RwLock::new(config),
            log: RwLock::new(log),
            policy_store,
            log_store,
        })
    }

    /// Check a plan against current policy and the execution log.
    #[must_use]
    pub fn check_policy(&self, plan: &TradePlan) -> PolicyVerdict {
        let verdict = evaluate(&self.config.read(), &self.log.read(), plan, Utc::now());
        if !verdict.passed {
            warn!(
                plan_id = %plan.plan_id,
                token = %plan.token,
                violations = verdict.violations.len(),
                "Plan rejected by policy"
            );
        }
        verdict
    }

    /// Apply a partial limit update transactionally.
    ///
    /// Every present field is validated before any field is assigned; an
    /// invalid field rejects the whole update with the config untouched.
    /// Returns the new version.
    pub async fn set_limits(&self, update: PolicyUpdate) -> Result<u64> {
        validate_update(&update)?;

        let updated = {
            let mut config = self.config.write();
            if let Some(v) = update.max_position_size_pct {
                config.max_position_size_pct = v;
            }
            if let Some(v) = update.max_portfolio_risk_pct {
                config.max_portfolio_risk_pct = v;
            }
            if let Some(v) = update.max_asset_concentration_pct {
                config.max_asset_concentration_pct = v;
            }
            if let Some(v) = update.cooldown_minutes {
                config.cooldown_minutes = v;
            }
            if let Some(v) = update.conviction_scaling {
                config.conviction_scaling = v;
            }
            config.version += 1;
            config.clone()
        };

        self.policy_store.save(&updated).await?;
        info!(version = updated.version, "Policy limits updated");
        Ok(updated.version)
    }

    /// Flip the kill switch and persist.
    pub async fn set_kill_switch(&self, enabled: bool) -> Result<()> {
        let updated = {
            let mut config = self.config.write();
            config.kill_switch_enabled = enabled;
            config.version += 1;
            config.clone()
        };
        self.policy_store.save(&updated).await?;
        warn!(enabled, "Kill switch changed");
        Ok(())
    }

    /// Append an execution to the log and persist.
    pub async fn record_execution(&self, entry: ExecutionLogEntry) -> Result<()> {
        self.log_store.append(&entry).await?;
        self.log.write().push(entry);
        Ok(())
    }

    /// Current config snapshot.
    #[must_use]
    pub fn config(&self) -> PolicyConfig {
        self.config.read().clone()
    }
}

fn validate_update(update: &PolicyUpdate) -> std::result::Result<(), PolicyError> {
    let percent_fields = [
        ("max_position_size_pct", update.max_position_size_pct),
        ("max_portfolio_risk_pct", update.max_portfolio_risk_pct),
        (
            "max_asset_concentration_pct",
            update.max_asset_concentration_pct,
        ),
    ];
    for (field, value) in percent_fields {
        if let Some(v) = value {
            if v <= Decimal::ZERO || v > Decimal::from(100) {
                return Err(PolicyError::OutOfRange {
                    field,
                    value: v.to_string(),
                    min: "0".to_string(),
                    max: "100".to_string(),
                });
            }
        }
    }
    if let Some(minutes) = update.cooldown_minutes {
        if !(0..=1440).contains(&minutes) {
            return Err(PolicyError::OutOfRange {
                field: "cooldown_minutes",
                value: minutes.to_string(),
                min: "0".to_string(),
                max: "1440".to_string(),
            });
        }
    }
    if let Some(scaling) = update.conviction_scaling {
        if scaling <= Decimal::ZERO || scaling > Decimal::from(100) {
            return Err(PolicyError::OutOfRange {
                field: "conviction_scaling",
                value: scaling.to_string(),
                min: "0".to_string(),
                max: "100".to_string(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Direction;
    use rust_decimal_macros::dec;

    fn config() -> PolicyConfig {
        PolicyConfig {
            max_position_size_pct: dec!(10),
            max_portfolio_risk_pct: dec!(25),
            max_asset_concentration_pct: dec!(15),
            cooldown_minutes: 5,
            ..Default::default()
        }
    }

    fn entry(token: &str, direction: Direction, risk: Decimal, age_minutes: i64) -> ExecutionLogEntry {
        ExecutionLogEntry {
            plan_id: format!("p-{token}-{age_minutes}"),
            timestamp: Utc::now() - Duration::minutes(age_minutes),
            token: token.to_string(),
            direction,
            risk_percent: risk,
        }
    }

    #[test]
    fn oversized_plan_cites_both_numbers() {
        let plan = TradePlan::new("p1", "SOL", Direction::Long, dec!(12));
        let verdict = evaluate(&config(), &[], &plan, Utc::now());

        assert!(!verdict.passed);
        assert!(verdict.violations[0].contains("12"));
        assert!(verdict.violations[0].contains("10"));
    }

    #[test]
    fn kill_switch_rejects_everything() {
        let mut cfg = config();
        cfg.kill_switch_enabled = true;
        let plan = TradePlan::new("p1", "SOL", Direction::Long, dec!(1));
        let verdict = evaluate(&cfg, &[], &plan, Utc::now());

        assert!(!verdict.passed);
        assert!(verdict.violations[0].contains("kill switch"));
    }

    #[test]
    fn cooldown_violation_cites_remaining_minutes() {
        let log = vec![entry("SOL", Direction::Long, dec!(2), 2)];
        let plan = TradePlan::new("p2", "SOL", Direction::Long, dec!(2));
        let verdict = evaluate(&config(), &log, &plan, Utc::now());

        assert!(!verdict.passed);
        let violation = &verdict.violations[0];
        assert!(violation.contains("cooldown"));
        assert!(violation.contains("remaining"));
        // 5 minute cooldown, traded 2 minutes ago: > 0 minutes remain.
        assert!(violation.contains("3 minutes remaining") || violation.contains("4 minutes remaining"));
    }

    #[test]
    fn portfolio_risk_sums_same_direction_in_window() {
        let log = vec![
            entry("SOL", Direction::Long, dec!(10), 60),
            entry("ETH", Direction::Long, dec!(10), 120),
            entry("BTC", Direction::Short, dec!(10), 60), // other direction, ignored
            entry("DOGE", Direction::Long, dec!(10), 60 * 30), // outside 24h, ignored
        ];
        let plan = TradePlan::new("p3", "AVAX", Direction::Long, dec!(8));
        let verdict = evaluate(&config(), &log, &plan, Utc::now());

        // 10 + 10 + 8 = 28 > 25
        assert!(!verdict.passed);
        assert!(verdict.violations.iter().any(|v| v.contains("portfolio risk")));
    }

    #[test]
    fn concentration_is_scoped_to_token() {
        let log = vec![
            entry("SOL", Direction::Long, dec!(9), 30),
            entry("ETH", Direction::Long, dec!(9), 30),
        ];
        // Token cooldown applies too, so look past it with a clean token
        // exposure: 9 + 8 = 17 > 15 for SOL only.
        let mut cfg = config();
        cfg.cooldown_minutes = 0;
        let plan = TradePlan::new("p4", "SOL", Direction::Long, dec!(8));
        let verdict = evaluate(&cfg, &log, &plan, Utc::now());

        assert!(!verdict.passed);
        assert!(verdict.violations.iter().any(|v| v.contains("concentration")));
    }

    #[test]
    fn warnings_fire_at_eighty_percent() {
        let plan = TradePlan::new("p5", "SOL", Direction::Long, dec!(9));
        let verdict = evaluate(&config(), &[], &plan, Utc::now());

        assert!(verdict.passed);
        assert!(verdict.warnings.iter().any(|w| w.contains("position limit")));
    }

    #[test]
    fn evaluate_is_pure() {
        let log = vec![entry("SOL", Direction::Long, dec!(5), 60)];
        let plan = TradePlan::new("p6", "ETH", Direction::Long, dec!(5));
        let now = Utc::now();

        let first = evaluate(&config(), &log, &plan, now);
        let second = evaluate(&config(), &log, &plan, now);
        assert_eq!(first, second);
    }

    #[test]
    fn conviction_mismatch_warns_only() {
        let plan = TradePlan::new("p7", "SOL", Direction::Long, dec!(8)).with_conviction(dec!(20));
        // expected = 20% of 10% = 2%; 8% > 4% triggers the warning.
        let verdict = evaluate(&config(), &[], &plan, Utc::now());

        assert!(verdict.passed);
        assert!(verdict.warnings.iter().any(|w| w.contains("conviction")));
    }

    #[test]
    fn update_validation_rejects_out_of_range() {
        let update = PolicyUpdate {
            max_position_size_pct: Some(dec!(101)),
            ..Default::default()
        };
        assert!(validate_update(&update).is_err());

        let update = PolicyUpdate {
            cooldown_minutes: Some(1441),
            ..Default::default()
        };
        assert!(validate_update(&update).is_err());

        let update = PolicyUpdate {
            max_position_size_pct: Some(dec!(5)),
            cooldown_minutes: Some(30),
            ..Default::default()
        };
        assert!(validate_update(&update).is_ok());
    }
}
