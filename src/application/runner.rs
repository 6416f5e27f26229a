//! Orchestrating run loop: composes governor, context, scratchpad, risk,
//! and session per agent invocation.
//!
//! The loop is the single consumer of one external event stream. It is
//! strictly sequential: each event is fully processed (hooks included)
//! before the next is awaited. An abort signal takes effect at the next
//! event boundary, never preemptively.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{watch, Mutex};
use tracing::{error, info, warn};

use crate::application::context::ContextManager;
use crate::application::governor::{IterationGovernor, IterationVerdict};
use crate::application::risk::{RiskManager, ToolCtx, ToolOutcome};
use crate::application::scratchpad::ReasoningScratchpad;
use crate::application::session::SessionManager;
use crate::domain::{AgentEvent, AgentResult, AgentRun, ApprovalOutcome, ResultSubtype, WorkflowStage};
use crate::error::Result;
use crate::port::AgentEventStream;

/// Knobs for one runner instance.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    pub agent_id: String,
    pub max_iterations: u32,
    pub max_context_tokens: usize,
    pub compaction_ratio: f64,
    pub summary_threshold_tokens: usize,
    /// TTL for approvals requested mid-run.
    pub approval_ttl: Duration,
    /// How many recent actions degradation output includes.
    pub recent_actions: usize,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            agent_id: "agent".to_string(),
            max_iterations: 50,
            max_context_tokens: 100_000,
            compaction_ratio: 0.8,
            summary_threshold_tokens: 2_000,
            approval_ttl: Duration::from_secs(300),
            recent_actions: 5,
        }
    }
}

/// Why the consumption loop stopped.
enum StopReason {
    StreamEnded,
    IterationLimit,
    Aborted,
}

/// Governs one agent invocation end to end.
pub struct AgentRunner {
    config: RunnerConfig,
    risk: Arc<RiskManager>,
    session: Option<Arc<Mutex<SessionManager>>>,
}

impl AgentRunner {
    #[must_use]
    pub fn new(config: RunnerConfig, risk: Arc<RiskManager>) -> Self {
        Self {
            config,
            risk,
            session: None,
        }
    }

    /// Attach a session so the run records engine session ids and approvals.
    #[must_use]
    pub fn with_session(mut self, session: Arc<Mutex<SessionManager>>) -> Self {
        self.session = Some(session);
        self
    }

    /// Consume the event stream under governance and return a structured
    /// result. Never panics and never propagates stream failures: whatever
    /// happens is folded into the [`AgentResult`].
    pub async fn run(
        &self,
        prompt: &str,
        stage: WorkflowStage,
        stream: &mut dyn AgentEventStream,
        abort: watch::Receiver<bool>,
    ) -> AgentResult {
        let mut run = AgentRun::new(self.config.agent_id.clone(), stage, self.config.max_iterations);
        let mut governor = IterationGovernor::new(self.config.max_iterations);
        let mut context = ContextManager::new(
            self.config.max_context_tokens,
            self.config.compaction_ratio,
            self.config.summary_threshold_tokens,
        );
        let mut scratchpad = ReasoningScratchpad::new();
        scratchpad.record_thought(format!("Objective: {prompt}"));

        info!(
            agent_id = %run.agent_id,
            stage = %stage,
            max_iterations = self.config.max_iterations,
            "Agent run starting"
        );

        let mut warnings = Vec::new();
        let mut final_output: Option<String> = None;
        let mut success = true;

        let stop = match self
            .consume(
                &mut run,
                &mut governor,
                &mut context,
                &mut scratchpad,
                &mut warnings,
                &mut final_output,
                &mut success,
                stream,
                abort,
            )
            .await
        {
            Ok(stop) => stop,
            Err(e) => {
                // Unexpected hook or persistence failure: contained here,
                // surfaced as a failed run.
                error!(error = %e, "Run failed inside event loop");
                success = false;
                final_output = Some(format!("run failed: {e}"));
                StopReason::StreamEnded
            }
        };

        run.iteration_count = governor.iteration_count();
        let (degraded, aborted, output) = match stop {
            StopReason::IterationLimit => (
                true,
                false,
                scratchpad.progress_summary(self.config.recent_actions),
            ),
            StopReason::Aborted => (
                false,
                true,
                scratchpad.partial_result("abort requested", self.config.recent_actions),
            ),
            StopReason::StreamEnded => (false, false, final_output.unwrap_or_default()),
        };

        info!(
            agent_id = %run.agent_id,
            iterations = run.iteration_count,
            success,
            degraded,
            aborted,
            "Agent run finished"
        );

        AgentResult {
            success,
            output,
            iterations: run.iteration_count,
            degraded,
            aborted,
            warnings,
            trace: scratchpad.take_trace(),
            context_tokens_used: context.usage().total_tokens,
            session_id: run.session_id,
        }
    }

    #[allow(clippy::too_many_arguments)]
    async fn consume(
        &self,
        run: &mut AgentRun,
        governor: &mut IterationGovernor,
        context: &mut ContextManager,
        scratchpad: &mut ReasoningScratchpad,
        warnings: &mut Vec<String>,
        final_output: &mut Option<String>,
        success: &mut bool,
        stream: &mut dyn AgentEventStream,
        mut abort: watch::Receiver<bool>,
    ) -> Result<StopReason> {
        // A dropped sender means this run can never be aborted, not that it
        // was; from then on only the stream is polled.
        let mut abort_open = true;
        loop {
            let event = if abort_open {
                tokio::select! {
                    changed = abort.changed() => {
                        if *abort.borrow() {
                            info!(agent_id = %run.agent_id, "Abort signal received");
                            return Ok(StopReason::Aborted);
                        }
                        if changed.is_err() {
                            abort_open = false;
                        }
                        continue;
                    }
                    event = stream.next_event() => event,
                }
            } else {
                stream.next_event().await
            };
            let Some(event) = event else {
                return Ok(StopReason::StreamEnded);
            };

            match governor.record_iteration() {
                IterationVerdict::Proceed => {}
                IterationVerdict::Warn { used, max } => {
                    warnings.push(format!("iteration budget at {used} of {max}"));
                }
                IterationVerdict::LimitReached => return Ok(StopReason::IterationLimit),
            }

            match event {
                AgentEvent::Init { session_id } => {
                    run.session_id = Some(session_id.clone());
                    if let Some(session) = &self.session {
                        session
                            .lock()
                            .await
                            .set_agent_session_id(run.stage, session_id)
                            .await?;
                    }
                }
                AgentEvent::Text { text } => {
                    scratchpad.record_thought(text);
                }
                AgentEvent::ToolUse {
                    tool_name,
                    tool_input,
                } => {
                    self.handle_tool_use(run, scratchpad, warnings, tool_name, tool_input)
                        .await?;
                }
                AgentEvent::ToolResult { tool_name, result } => {
                    let outcome = context.add_tool_result(&tool_name, &result);
                    if outcome.summarized {
                        warnings.push(format!("oversized {tool_name} result was summarized"));
                    }
                    if context.needs_compaction() {
                        let removed = context.compact();
                        info!(removed, "Context window compacted mid-run");
                    }
                    scratchpad.record_observation(&result);
                    if self.risk.is_high_risk(&tool_name) {
                        let ctx = ToolCtx::from_input(&tool_name, &serde_json::Value::Null);
                        self.risk
                            .post_tool_use(&ctx, &ToolOutcome::from_result(&result));
                    }
                }
                AgentEvent::Result { subtype, result } => {
                    *success = matches!(subtype, ResultSubtype::Success);
                    *final_output = Some(result);
                }
            }
        }
    }

    async fn handle_tool_use(
        &self,
        run: &AgentRun,
        scratchpad: &mut ReasoningScratchpad,
        warnings: &mut Vec<String>,
        tool_name: String,
        tool_input: serde_json::Value,
    ) -> Result<()> {
        scratchpad.record_action(&tool_name, tool_input.clone());

        let ctx = ToolCtx::from_input(&tool_name, &tool_input);
        let check = self.risk.pre_tool_use(&ctx);
        warnings.extend(check.warnings.iter().cloned());

        if check.is_allowed() {
            return Ok(());
        }

        let reason = check.reason.unwrap_or_else(|| "risk check failed".to_string());
        if !check.needs_approval {
            warn!(agent_id = %run.agent_id, tool = %tool_name, reason = %reason, "High-risk action refused");
            scratchpad.record_observation(format!("action blocked: {reason}"));
            return Ok(());
        }

        // Confirmation gate: block on the human-in-the-loop rendezvous.
        let ticket = self
            .risk
            .create_approval_request(&ctx, tool_input, self.config.approval_ttl)
            .await;
        let approval = ticket.approval().clone();
        if let Some(session) = &self.session {
            session.lock().await.record_approval(approval.clone()).await?;
        }

        let outcome = ticket.wait().await;
        if let Some(session) = &self.session {
            session.lock().await.clear_approval(&approval.id).await?;
        }
        match outcome {
            ApprovalOutcome::Approved => {
                info!(tool = %tool_name, id = %approval.id, "Action approved by operator");
                scratchpad.record_observation("action approved by operator");
            }
            ApprovalOutcome::Rejected => {
                warn!(tool = %tool_name, id = %approval.id, "Action rejected by operator");
                scratchpad.record_observation("action rejected by operator");
            }
            ApprovalOutcome::Expired => {
                warn!(tool = %tool_name, id = %approval.id, "Approval expired unanswered");
                scratchpad
                    .record_observation("approval request expired; action not taken");
            }
        }
        Ok(())
    }
}
