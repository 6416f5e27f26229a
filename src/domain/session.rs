//! Session aggregate: the persisted state of one trading workflow.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::approval::PendingApproval;
use super::plan::Direction;
use super::stage::{StageTransition, WorkflowStage};

/// A trade queued for execution but not yet executed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingTrade {
    pub plan_id: String,
    pub token: String,
    pub direction: Direction,
    pub risk_percent: Decimal,
    pub queued_at: DateTime<Utc>,
}

/// A trade that has been executed, with realized outcome when known.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutedTrade {
    pub plan_id: String,
    pub token: String,
    pub direction: Direction,
    pub risk_percent: Decimal,
    pub executed_at: DateTime<Utc>,
    pub pnl: Option<Decimal>,
}

/// An open position held by the session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    pub token: String,
    pub direction: Direction,
    pub size: Decimal,
    pub entry_price: Decimal,
    pub opened_at: DateTime<Utc>,
}

/// Aggregate root for one workflow session.
///
/// Loaded and saved as a single JSON document keyed by `session_id`.
/// Every mutation persists the full aggregate before returning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionState {
    pub session_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub current_stage: WorkflowStage,
    pub stage_history: Vec<StageTransition>,
    /// Agent-engine session ids recorded per stage, for resumption.
    pub agent_session_ids: HashMap<String, String>,
    pub pending_trades: Vec<PendingTrade>,
    pub executed_trades: Vec<ExecutedTrade>,
    pub current_positions: Vec<Position>,
    pub pending_approvals: Vec<PendingApproval>,
    pub discovery_insights: Vec<String>,
    pub analysis_results: Vec<String>,
}

impl SessionState {
    /// Create a fresh session starting at [`WorkflowStage::Discovery`].
    #[must_use]
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            session_id: Uuid::new_v4().to_string(),
            created_at: now,
            updated_at: now,
            current_stage: WorkflowStage::Discovery,
            stage_history: Vec::new(),
            agent_session_ids: HashMap::new(),
            pending_trades: Vec::new(),
            executed_trades: Vec::new(),
            current_positions: Vec::new(),
            pending_approvals: Vec::new(),
            discovery_insights: Vec::new(),
            analysis_results: Vec::new(),
        }
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

/// Read-only projection of the session fields relevant to one stage.
#[derive(Debug, Clone, Default, Serialize)]
pub struct StageContext {
    pub stage: Option<WorkflowStage>,
    pub insights: Vec<String>,
    pub analysis: Vec<String>,
    pub pending_trades: Vec<PendingTrade>,
    pub executed_trades: Vec<ExecutedTrade>,
    pub positions: Vec<Position>,
    pub pending_approvals: Vec<PendingApproval>,
}
