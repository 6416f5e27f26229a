//! Workflow stages for the multi-step trading workflow.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A named phase of the trading workflow, in canonical order.
///
/// The order is advisory: the session manager accepts any transition,
/// including regression to an earlier stage ("go back and revise").
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkflowStage {
    Discovery,
    StrategyBuild,
    Backtest,
    Analysis,
    Execution,
    Review,
}

impl WorkflowStage {
    /// All stages in canonical order.
    pub const ALL: [WorkflowStage; 6] = [
        WorkflowStage::Discovery,
        WorkflowStage::StrategyBuild,
        WorkflowStage::Backtest,
        WorkflowStage::Analysis,
        WorkflowStage::Execution,
        WorkflowStage::Review,
    ];
}

impl std::fmt::Display for WorkflowStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            WorkflowStage::Discovery => "DISCOVERY",
            WorkflowStage::StrategyBuild => "STRATEGY_BUILD",
            WorkflowStage::Backtest => "BACKTEST",
            WorkflowStage::Analysis => "ANALYSIS",
            WorkflowStage::Execution => "EXECUTION",
            WorkflowStage::Review => "REVIEW",
        };
        write!(f, "{name}")
    }
}

/// One recorded stage change. History is append-only; the current stage is
/// the most recent entry's `to`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageTransition {
    pub from: WorkflowStage,
    pub to: WorkflowStage,
    pub reason: String,
    pub triggered_by: String,
    pub timestamp: DateTime<Utc>,
}
