//! Events produced by an external agent engine.
//!
//! The governance core never talks to an LLM directly; it consumes a typed
//! event sequence emitted by the agent SDK and reacts to it. The wire shape
//! here matches the SDK's streaming message format so recorded sessions can
//! be replayed byte-for-byte through the [`JsonlReplayStream`].
//!
//! [`JsonlReplayStream`]: crate::adapter::replay::JsonlReplayStream

use serde::{Deserialize, Serialize};

/// A single event from the agent event stream.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentEvent {
    /// Stream opened; carries the engine-assigned session id.
    Init { session_id: String },

    /// The agent requested a tool invocation.
    ToolUse {
        tool_name: String,
        tool_input: serde_json::Value,
    },

    /// A tool invocation completed and produced output.
    ToolResult { tool_name: String, result: String },

    /// Free-form reasoning text from the agent.
    Text { text: String },

    /// Terminal event carrying the final result of the run.
    Result {
        subtype: ResultSubtype,
        result: String,
    },
}

/// Whether the terminal event reports success or an engine-side error.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ResultSubtype {
    Success,
    Error,
}

impl AgentEvent {
    /// Tool name if this event concerns a tool, `None` otherwise.
    #[must_use]
    pub fn tool_name(&self) -> Option<&str> {
        match self {
            AgentEvent::ToolUse { tool_name, .. } | AgentEvent::ToolResult { tool_name, .. } => {
                Some(tool_name)
            }
            _ => None,
        }
    }
}
