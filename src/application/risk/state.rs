//! Shared risk counters and the consecutive-loss circuit breaker.
//!
//! One [`RiskState`] instance is shared by every concurrent run via `Arc`;
//! all counters sit behind atomics or `parking_lot` locks so mutation is
//! safe on a multi-threaded runtime.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU32, Ordering};

use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use rust_decimal::Decimal;
use tracing::{info, warn};

/// Hard limits applied by the risk manager's pre-hook.
#[derive(Debug, Clone)]
pub struct RiskLimits {
    /// Maximum notional size for a single action, in dollars.
    pub max_position_size: Decimal,
    /// Maximum cumulative realized loss per day.
    pub daily_loss_limit: Decimal,
    /// Maximum simultaneously open positions.
    pub max_open_positions: u32,
    /// Tokens that are never traded.
    pub blacklist: HashSet<String>,
    /// Tools that always require human confirmation.
    pub confirm_tools: HashSet<String>,
    /// Consecutive losses that trip the circuit breaker.
    pub breaker_threshold: u32,
    /// Cooldown before a tripped breaker resets.
    pub breaker_cooldown_minutes: i64,
    /// Master switch for the breaker.
    pub breaker_enabled: bool,
}

impl Default for RiskLimits {
    fn default() -> Self {
        Self {
            max_position_size: Decimal::from(1000),
            daily_loss_limit: Decimal::from(500),
            max_open_positions: 10,
            blacklist: HashSet::new(),
            confirm_tools: HashSet::new(),
            breaker_threshold: 3,
            breaker_cooldown_minutes: 30,
            breaker_enabled: true,
        }
    }
}

/// Circuit breaker states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerState {
    Normal,
    /// One more consecutive loss trips the breaker.
    Warning,
    Tripped,
}

/// Snapshot of the breaker for metrics and check messages.
#[derive(Debug, Clone, Copy)]
pub struct BreakerSnapshot {
    pub state: BreakerState,
    pub consecutive_losses: u32,
    pub remaining_cooldown_minutes: i64,
}

/// Process-shared mutable risk state.
#[derive(Debug)]
pub struct RiskState {
    limits: RiskLimits,
    daily_loss: RwLock<Decimal>,
    open_positions: AtomicU32,
    consecutive_losses: AtomicU32,
    tripped_at: RwLock<Option<DateTime<Utc>>>,
}

impl RiskState {
    #[must_use]
    pub fn new(limits: RiskLimits) -> Self {
        Self {
            limits,
            daily_loss: RwLock::new(Decimal::ZERO),
            open_positions: AtomicU32::new(0),
            consecutive_losses: AtomicU32::new(0),
            tripped_at: RwLock::new(None),
        }
    }

    #[must_use]
    pub fn limits(&self) -> &RiskLimits {
        &self.limits
    }

    /// Record a losing trade and return the resulting breaker state.
    pub fn record_loss_trade(&self, loss: Decimal) -> BreakerState {
        if loss > Decimal::ZERO {
            *self.daily_loss.write() += loss;
        }

        let losses = self.consecutive_losses.fetch_add(1, Ordering::SeqCst) + 1;
        if self.limits.breaker_enabled && losses >= self.limits.breaker_threshold {
            let mut tripped = self.tripped_at.write();
            if tripped.is_none() {
                *tripped = Some(Utc::now());
                warn!(
                    consecutive_losses = losses,
                    threshold = self.limits.breaker_threshold,
                    cooldown_minutes = self.limits.breaker_cooldown_minutes,
                    "Circuit breaker tripped"
                );
            }
            return BreakerState::Tripped;
        }
        if self.limits.breaker_enabled && losses + 1 == self.limits.breaker_threshold {
            return BreakerState::Warning;
        }
        BreakerState::Normal
    }

    /// Record a winning trade: resets the loss streak and clears any trip.
    pub fn record_win_trade(&self) {
        self.consecutive_losses.store(0, Ordering::SeqCst);
        let mut tripped = self.tripped_at.write();
        if tripped.take().is_some() {
            info!("Circuit breaker cleared by winning trade");
        }
    }

    /// Manually reset the breaker and loss streak.
    pub fn reset_breaker(&self) {
        self.consecutive_losses.store(0, Ordering::SeqCst);
        *self.tripped_at.write() = None;
        info!("Circuit breaker reset");
    }

    /// Current breaker snapshot, applying the lazy cooldown reset.
    ///
    /// A tripped breaker whose cooldown has elapsed transitions back to
    /// Normal here, on the next read, rather than via a timer.
    pub fn breaker_snapshot(&self, now: DateTime<Utc>) -> BreakerSnapshot {
        if !self.limits.breaker_enabled {
            return BreakerSnapshot {
                state: BreakerState::Normal,
                consecutive_losses: self.consecutive_losses.load(Ordering::SeqCst),
                remaining_cooldown_minutes: 0,
            };
        }

        let tripped_at = *self.tripped_at.read();
        if let Some(at) = tripped_at {
            let elapsed = now - at;
            let cooldown = Duration::minutes(self.limits.breaker_cooldown_minutes);
            if elapsed > cooldown {
                // Cooldown elapsed; reset lazily.
                self.consecutive_losses.store(0, Ordering::SeqCst);
                *self.tripped_at.write() = None;
                info!("Circuit breaker cooldown elapsed, resuming");
            } else {
                let remaining = (cooldown - elapsed).num_minutes().max(0) + 1;
                return BreakerSnapshot {
                    state: BreakerState::Tripped,
                    consecutive_losses: self.consecutive_losses.load(Ordering::SeqCst),
                    remaining_cooldown_minutes: remaining,
                };
            }
        }

        let losses = self.consecutive_losses.load(Ordering::SeqCst);
        let state = if self.limits.breaker_threshold > 0 && losses + 1 == self.limits.breaker_threshold
        {
            BreakerState::Warning
        } else {
            BreakerState::Normal
        };
        BreakerSnapshot {
            state,
            consecutive_losses: losses,
            remaining_cooldown_minutes: 0,
        }
    }

    /// Whether the breaker is currently tripped (no lazy reset applied).
    #[must_use]
    pub fn is_tripped(&self) -> bool {
        self.tripped_at.read().is_some()
    }

    #[must_use]
    pub fn consecutive_losses(&self) -> u32 {
        self.consecutive_losses.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn daily_loss(&self) -> Decimal {
        *self.daily_loss.read()
    }

    /// Add realized loss outside of the breaker path (fees, slippage).
    pub fn add_daily_loss(&self, amount: Decimal) {
        *self.daily_loss.write() += amount;
    }

    /// Reset the daily loss counter (called at day rollover).
    pub fn reset_daily_loss(&self) {
        *self.daily_loss.write() = Decimal::ZERO;
    }

    #[must_use]
    pub fn open_positions(&self) -> u32 {
        self.open_positions.load(Ordering::SeqCst)
    }

    pub fn position_opened(&self) {
        self.open_positions.fetch_add(1, Ordering::SeqCst);
    }

    pub fn position_closed(&self) {
        let _ = self
            .open_positions
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
    }
}

impl Default for RiskState {
    fn default() -> Self {
        Self::new(RiskLimits::default())
    }
}
