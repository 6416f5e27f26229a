//! Engine-agnostic value types: events, plans, stages, approvals, sessions.

pub mod approval;
pub mod event;
pub mod plan;
pub mod policy;
pub mod run;
pub mod session;
pub mod stage;

pub use approval::{ApprovalAction, ApprovalDecision, ApprovalId, ApprovalOutcome, PendingApproval};
pub use event::{AgentEvent, ResultSubtype};
pub use plan::{Direction, ExecutionLogEntry, TradePlan};
pub use policy::{PolicyConfig, PolicyUpdate, PolicyVerdict};
pub use run::{AgentResult, AgentRun, ReasoningStep};
pub use session::{ExecutedTrade, PendingTrade, Position, SessionState, StageContext};
pub use stage::{StageTransition, WorkflowStage};
