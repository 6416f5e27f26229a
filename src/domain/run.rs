//! Per-invocation bookkeeping and the structured run result.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::stage::WorkflowStage;

/// Mutable bookkeeping for one agent invocation.
///
/// Created at run entry, mutated on each event, terminal at stream end,
/// abort, or iteration limit.
#[derive(Debug, Clone)]
pub struct AgentRun {
    pub agent_id: String,
    pub stage: WorkflowStage,
    pub started_at: DateTime<Utc>,
    pub iteration_count: u32,
    pub max_iterations: u32,
    pub session_id: Option<String>,
}

impl AgentRun {
    #[must_use]
    pub fn new(agent_id: impl Into<String>, stage: WorkflowStage, max_iterations: u32) -> Self {
        Self {
            agent_id: agent_id.into(),
            stage,
            started_at: Utc::now(),
            iteration_count: 0,
            max_iterations,
            session_id: None,
        }
    }
}

/// One think/act/observe step in the reasoning trace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReasoningStep {
    pub thought: String,
    pub action: Option<String>,
    pub action_input: Option<serde_json::Value>,
    pub observation: Option<String>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Structured outcome of a governed agent run.
///
/// A run never panics or propagates stream failures; whatever happened is
/// folded into this value. `degraded` marks a best-effort output produced
/// because a resource bound was hit, which is independent of `success`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentResult {
    pub success: bool,
    pub output: String,
    pub iterations: u32,
    pub degraded: bool,
    pub aborted: bool,
    pub warnings: Vec<String>,
    pub trace: Vec<ReasoningStep>,
    pub context_tokens_used: usize,
    pub session_id: Option<String>,
}
