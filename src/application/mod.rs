//! Governance services: the run loop and everything it composes.

pub mod approval;
pub mod context;
pub mod governor;
pub mod policy;
pub mod risk;
pub mod runner;
pub mod scratchpad;
pub mod session;

pub use approval::{ApprovalTicket, ApprovalWorkflow};
pub use context::{ContextManager, ContextUsage};
pub use governor::{IterationGovernor, IterationVerdict};
pub use policy::{evaluate, PolicyEngine};
pub use risk::{RiskCheckResult, RiskLimits, RiskManager, RiskMetrics, RiskState, ToolCtx, ToolOutcome};
pub use runner::{AgentRunner, RunnerConfig};
pub use scratchpad::ReasoningScratchpad;
pub use session::SessionManager;
