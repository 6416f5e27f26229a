//! Iteration governor: bounds unbounded agent loops.

use tracing::warn;

/// Verdict for one recorded iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IterationVerdict {
    /// Under budget, keep consuming.
    Proceed,
    /// Crossed the warning threshold. Fires exactly once per run.
    Warn { used: u32, max: u32 },
    /// Budget exhausted; stop consuming and degrade gracefully.
    LimitReached,
}

/// Counts loop iterations against a hard maximum.
///
/// Warns once at 80% of the limit. Reaching the limit is not an error:
/// the run loop stops consuming and synthesizes a progress summary.
#[derive(Debug)]
pub struct IterationGovernor {
    count: u32,
    max: u32,
    warn_threshold: u32,
    warned: bool,
}

impl IterationGovernor {
    #[must_use]
    pub fn new(max_iterations: u32) -> Self {
        let max = max_iterations.max(1);
        Self {
            count: 0,
            max,
            warn_threshold: (max as f64 * 0.8).floor() as u32,
            warned: false,
        }
    }

    /// Record one iteration and report where the run stands.
    ///
    /// The counter saturates at the maximum; it never exceeds it.
    pub fn record_iteration(&mut self) -> IterationVerdict {
        if self.count >= self.max {
            return IterationVerdict::LimitReached;
        }
        self.count += 1;

        if self.count >= self.max {
            warn!(iterations = self.count, max = self.max, "Iteration limit reached");
            return IterationVerdict::LimitReached;
        }

        if !self.warned && self.count >= self.warn_threshold {
            self.warned = true;
            warn!(
                iterations = self.count,
                max = self.max,
                "Approaching iteration limit"
            );
            return IterationVerdict::Warn {
                used: self.count,
                max: self.max,
            };
        }

        IterationVerdict::Proceed
    }

    #[must_use]
    pub fn iteration_count(&self) -> u32 {
        self.count
    }

    #[must_use]
    pub fn remaining(&self) -> u32 {
        self.max - self.count
    }
}
