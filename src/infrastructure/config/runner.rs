//! Run loop configuration.

use std::time::Duration;

use serde::Deserialize;

use crate::application::runner::RunnerConfig;

/// Runner knobs as they appear in the TOML file.
#[derive(Debug, Clone, Deserialize)]
pub struct RunnerAppConfig {
    #[serde(default = "default_agent_id")]
    pub agent_id: String,
    /// Hard per-run iteration cap.
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,
    /// Context window budget in estimated tokens.
    #[serde(default = "default_max_context_tokens")]
    pub max_context_tokens: usize,
    /// Fraction of the budget that triggers compaction.
    #[serde(default = "default_compaction_ratio")]
    pub compaction_ratio: f64,
    /// Tool results above this size are summarized on ingest.
    #[serde(default = "default_summary_threshold_tokens")]
    pub summary_threshold_tokens: usize,
    /// How long an approval request waits before expiring, in seconds.
    #[serde(default = "default_approval_ttl_secs")]
    pub approval_ttl_secs: u64,
    /// How many recent actions degradation output includes.
    #[serde(default = "default_recent_actions")]
    pub recent_actions: usize,
}

fn default_agent_id() -> String {
    "agent".to_string()
}

const fn default_max_iterations() -> u32 {
    50
}

const fn default_max_context_tokens() -> usize {
    100_000
}

const fn default_compaction_ratio() -> f64 {
    0.8
}

const fn default_summary_threshold_tokens() -> usize {
    2_000
}

const fn default_approval_ttl_secs() -> u64 {
    300
}

const fn default_recent_actions() -> usize {
    5
}

impl Default for RunnerAppConfig {
    fn default() -> Self {
        Self {
            agent_id: default_agent_id(),
            max_iterations: default_max_iterations(),
            max_context_tokens: default_max_context_tokens(),
            compaction_ratio: default_compaction_ratio(),
            summary_threshold_tokens: default_summary_threshold_tokens(),
            approval_ttl_secs: default_approval_ttl_secs(),
            recent_actions: default_recent_actions(),
        }
    }
}

impl From<RunnerAppConfig> for RunnerConfig {
    fn from(config: RunnerAppConfig) -> Self {
        Self {
            agent_id: config.agent_id,
            max_iterations: config.max_iterations,
            max_context_tokens: config.max_context_tokens,
            compaction_ratio: config.compaction_ratio,
            summary_threshold_tokens: config.summary_threshold_tokens,
            approval_ttl: Duration::from_secs(config.approval_ttl_secs),
            recent_actions: config.recent_actions,
        }
    }
}
