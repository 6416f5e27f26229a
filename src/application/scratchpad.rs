//! Append-only reasoning trace for audit and partial-result synthesis.

use chrono::Utc;

use crate::domain::ReasoningStep;

/// Owns the ordered think/act/observe steps for one run.
///
/// The scratchpad is the source for graceful-degradation output: when a
/// resource bound or abort cuts a run short, the last steps become the
/// best-effort result instead of an error.
#[derive(Debug, Default)]
pub struct ReasoningScratchpad {
    steps: Vec<ReasoningStep>,
}

impl ReasoningScratchpad {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record agent reasoning text as a new step.
    pub fn record_thought(&mut self, thought: impl Into<String>) {
        self.steps.push(ReasoningStep {
            thought: thought.into(),
            action: None,
            action_input: None,
            observation: None,
            started_at: Utc::now(),
            completed_at: None,
        });
    }

    /// Record a tool invocation. Attaches to the latest open step, or opens
    /// a new one when the previous step already acted.
    pub fn record_action(&mut self, action: impl Into<String>, input: serde_json::Value) {
        match self.steps.last_mut() {
            Some(step) if step.action.is_none() && step.completed_at.is_none() => {
                step.action = Some(action.into());
                step.action_input = Some(input);
            }
            _ => self.steps.push(ReasoningStep {
                thought: String::new(),
                action: Some(action.into()),
                action_input: Some(input),
                observation: None,
                started_at: Utc::now(),
                completed_at: None,
            }),
        }
    }

    /// Record a tool observation, completing the open step.
    pub fn record_observation(&mut self, observation: impl Into<String>) {
        let observation = observation.into();
        match self.steps.last_mut() {
            Some(step) if step.completed_at.is_none() => {
                step.observation = Some(observation);
                step.completed_at = Some(Utc::now());
            }
            _ => {
                let now = Utc::now();
                self.steps.push(ReasoningStep {
                    thought: String::new(),
                    action: None,
                    action_input: None,
                    observation: Some(observation),
                    started_at: now,
                    completed_at: Some(now),
                });
            }
        }
    }

    #[must_use]
    pub fn steps(&self) -> &[ReasoningStep] {
        &self.steps
    }

    /// Clear the trace. Steps are owned exclusively by one run.
    pub fn reset(&mut self) {
        self.steps.clear();
    }

    /// Drain the trace into an owned vector for the run result.
    #[must_use]
    pub fn take_trace(&mut self) -> Vec<ReasoningStep> {
        std::mem::take(&mut self.steps)
    }

    /// Degradation output: the last `last_n` actions plus the latest thought.
    ///
    /// Non-empty whenever at least one step was recorded.
    #[must_use]
    pub fn progress_summary(&self, last_n: usize) -> String {
        let mut out = String::from("Iteration limit reached; progress so far:\n");
        out.push_str(&self.recent_actions(last_n));
        if let Some(thought) = self.last_thought() {
            out.push_str(&format!("Last reasoning: {thought}\n"));
        }
        if self.steps.is_empty() {
            out.push_str("No steps were recorded before the limit.\n");
        }
        out
    }

    /// Abort output: reason, recent actions, and a resumability note.
    #[must_use]
    pub fn partial_result(&self, reason: &str, last_n: usize) -> String {
        let mut out = format!("Run stopped early: {reason}\nRecent actions:\n");
        out.push_str(&self.recent_actions(last_n));
        out.push_str("The session can be resumed; completed work is preserved above.\n");
        out
    }

    fn recent_actions(&self, last_n: usize) -> String {
        let actions: Vec<&ReasoningStep> =
            self.steps.iter().filter(|s| s.action.is_some()).collect();
        let start = actions.len().saturating_sub(last_n);

        let mut out = String::new();
        for step in &actions[start..] {
            let action = step.action.as_deref().unwrap_or_default();
            match &step.observation {
                Some(obs) => {
                    let obs_head: String = obs.chars().take(120).collect();
                    out.push_str(&format!("- {action}: {obs_head}\n"));
                }
                None => out.push_str(&format!("- {action}: (no result)\n")),
            }
        }
        if out.is_empty() {
            out.push_str("- (no actions taken)\n");
        }
        out
    }

    fn last_thought(&self) -> Option<&str> {
        self.steps
            .iter()
            .rev()
            .map(|s| s.thought.as_str())
            .find(|t| !t.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn thought_action_observation_share_one_step() {
        let mut pad = ReasoningScratchpad::new();
        pad.record_thought("check the price first");
        pad.record_action("get_price", json!({"token": "SOL"}));
        pad.record_observation("212.44");

        assert_eq!(pad.steps().len(), 1);
        let step = &pad.steps()[0];
        assert_eq!(step.thought, "check the price first");
        assert_eq!(step.action.as_deref(), Some("get_price"));
        assert_eq!(step.observation.as_deref(), Some("212.44"));
        assert!(step.completed_at.is_some());
    }

    #[test]
    fn action_after_completed_step_opens_new_step() {
        let mut pad = ReasoningScratchpad::new();
        pad.record_action("get_price", json!({}));
        pad.record_observation("212.44");
        pad.record_action("get_balance", json!({}));

        assert_eq!(pad.steps().len(), 2);
    }

    #[test]
    fn progress_summary_lists_recent_actions_and_last_thought() {
        let mut pad = ReasoningScratchpad::new();
        for i in 0..5 {
            pad.record_thought(format!("step {i}"));
            pad.record_action(format!("tool_{i}"), json!({}));
            pad.record_observation("ok");
        }

        let summary = pad.progress_summary(3);
        assert!(summary.contains("tool_4"));
        assert!(summary.contains("tool_2"));
        assert!(!summary.contains("tool_1"));
        assert!(summary.contains("step 4"));
    }

    #[test]
    fn progress_summary_is_non_empty_with_no_steps() {
        let pad = ReasoningScratchpad::new();
        let summary = pad.progress_summary(5);
        assert!(!summary.is_empty());
        assert!(summary.contains("No steps"));
    }

    #[test]
    fn partial_result_includes_reason_and_resumability_note() {
        let mut pad = ReasoningScratchpad::new();
        pad.record_action("execute_trade", json!({}));
        pad.record_observation("filled");

        let partial = pad.partial_result("operator abort", 5);
        assert!(partial.contains("operator abort"));
        assert!(partial.contains("execute_trade"));
        assert!(partial.contains("resumed"));
    }

    #[test]
    fn reset_clears_steps() {
        let mut pad = ReasoningScratchpad::new();
        pad.record_thought("x");
        pad.reset();
        assert!(pad.steps().is_empty());
    }
}
