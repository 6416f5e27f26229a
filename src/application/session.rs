//! Session manager: the workflow state machine and its durable aggregate.
//!
//! Every mutating method writes the full session document through the
//! store before returning. Write amplification is accepted for the
//! guarantee that acknowledged state is never lost.

use std::sync::Arc;

use chrono::Utc;
use tracing::info;

use crate::domain::{
    ExecutedTrade, PendingApproval, PendingTrade, Position, SessionState, StageContext,
    StageTransition, WorkflowStage,
};
use crate::error::{Result, SessionError};
use crate::port::SessionStore;

/// Owns one session aggregate and persists it on every mutation.
pub struct SessionManager {
    state: SessionState,
    store: Arc<dyn SessionStore>,
}

impl SessionManager {
    /// Start a new session and persist its initial document.
    pub async fn start(store: Arc<dyn SessionStore>) -> Result<Self> {
        let state = SessionState::new();
        store.save(&state).await?;
        info!(session_id = %state.session_id, "Session started");
        Ok(Self { state, store })
    }

    /// Load an existing session.
    pub async fn load(store: Arc<dyn SessionStore>, session_id: &str) -> Result<Self> {
        let state = store.load(session_id).await?.ok_or_else(|| {
            crate::error::Error::from(SessionError::NotFound {
                session_id: session_id.to_string(),
            })
        })?;
        Ok(Self { state, store })
    }

    #[must_use]
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    #[must_use]
    pub fn session_id(&self) -> &str {
        &self.state.session_id
    }

    #[must_use]
    pub fn current_stage(&self) -> WorkflowStage {
        self.state.current_stage
    }

    /// Move to any stage, including regression to an earlier one.
    ///
    /// No transition table: going back means "revise", and the history
    /// records it rather than forbidding it.
    pub async fn transition_stage(
        &mut self,
        to: WorkflowStage,
        reason: impl Into<String>,
        triggered_by: impl Into<String>,
    ) -> Result<()> {
        let transition = StageTransition {
            from: self.state.current_stage,
            to,
            reason: reason.into(),
            triggered_by: triggered_by.into(),
            timestamp: Utc::now(),
        };
        info!(
            from = %transition.from,
            to = %transition.to,
            triggered_by = %transition.triggered_by,
            "Stage transition"
        );
        self.state.current_stage = to;
        self.state.stage_history.push(transition);
        self.persist().await
    }

    /// Record the agent-engine session id for a stage, for resumption.
    pub async fn set_agent_session_id(
        &mut self,
        stage: WorkflowStage,
        agent_session_id: impl Into<String>,
    ) -> Result<()> {
        self.state
            .agent_session_ids
            .insert(stage.to_string(), agent_session_id.into());
        self.persist().await
    }

    pub async fn add_pending_trade(&mut self, trade: PendingTrade) -> Result<()> {
        self.state.pending_trades.push(trade);
        self.persist().await
    }

    /// Move a pending trade (matched by plan id) into the executed list.
    pub async fn record_executed_trade(&mut self, trade: ExecutedTrade) -> Result<()> {
        self.state
            .pending_trades
            .retain(|p| p.plan_id != trade.plan_id);
        self.state.executed_trades.push(trade);
        self.persist().await
    }

    /// Replace the position snapshot.
    pub async fn update_positions(&mut self, positions: Vec<Position>) -> Result<()> {
        self.state.current_positions = positions;
        self.persist().await
    }

    /// Mirror an approval request into the session document.
    pub async fn record_approval(&mut self, approval: PendingApproval) -> Result<()> {
        self.state.pending_approvals.push(approval);
        self.persist().await
    }

    /// Drop an approval from the session document once resolved.
    pub async fn clear_approval(&mut self, id: &crate::domain::ApprovalId) -> Result<()> {
        self.state.pending_approvals.retain(|a| &a.id != id);
        self.persist().await
    }

    pub async fn add_insight(&mut self, insight: impl Into<String>) -> Result<()> {
        self.state.discovery_insights.push(insight.into());
        self.persist().await
    }

    pub async fn add_analysis(&mut self, analysis: impl Into<String>) -> Result<()> {
        self.state.analysis_results.push(analysis.into());
        self.persist().await
    }

    /// Read-only projection of the fields relevant to `stage`.
    #[must_use]
    pub fn context_for_stage(&self, stage: WorkflowStage) -> StageContext {
        let mut ctx = StageContext {
            stage: Some(stage),
            ..Default::default()
        };
        match stage {
            WorkflowStage::Discovery => {
                ctx.insights = self.state.discovery_insights.clone();
            }
            WorkflowStage::StrategyBuild => {
                ctx.insights = self.state.discovery_insights.clone();
                ctx.analysis = self.state.analysis_results.clone();
            }
            WorkflowStage::Backtest | WorkflowStage::Analysis => {
                ctx.analysis = self.state.analysis_results.clone();
                ctx.pending_trades = self.state.pending_trades.clone();
            }
            WorkflowStage::Execution => {
                ctx.pending_trades = self.state.pending_trades.clone();
                ctx.positions = self.state.current_positions.clone();
                ctx.pending_approvals = self.state.pending_approvals.clone();
            }
            WorkflowStage::Review => {
                ctx.executed_trades = self.state.executed_trades.clone();
                ctx.positions = self.state.current_positions.clone();
                ctx.analysis = self.state.analysis_results.clone();
            }
        }
        ctx
    }

    async fn persist(&mut self) -> Result<()> {
        self.state.updated_at = Utc::now();
        self.store.save(&self.state).await
    }
}
