//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use warden::application::approval::ApprovalWorkflow;
use warden::application::risk::{RiskLimits, RiskManager, RiskState};
use warden::domain::{AgentEvent, SessionState};
use warden::error::{Result, StoreError};
use warden::port::{NullNotifier, SessionStore};
use warden::testkit::MemoryStore;

/// Risk manager with `execute_trade` as the only high-risk tool.
pub fn risk_manager(limits: RiskLimits) -> Arc<RiskManager> {
    let workflow = Arc::new(ApprovalWorkflow::new(Arc::new(NullNotifier)));
    Arc::new(RiskManager::new(
        Arc::new(RiskState::new(limits)),
        ["execute_trade".to_string()].into_iter().collect(),
        workflow,
    ))
}

pub fn text(text: &str) -> AgentEvent {
    AgentEvent::Text {
        text: text.to_string(),
    }
}

pub fn trade(token: &str, size: f64) -> AgentEvent {
    AgentEvent::ToolUse {
        tool_name: "execute_trade".to_string(),
        tool_input: json!({"token": token, "size": size}),
    }
}

pub fn trade_result(payload: &str) -> AgentEvent {
    AgentEvent::ToolResult {
        tool_name: "execute_trade".to_string(),
        result: payload.to_string(),
    }
}

/// Session store that starts failing writes after `allowed` successful saves.
pub struct FlakyStore {
    inner: MemoryStore,
    allowed: u32,
    saves: AtomicU32,
}

impl FlakyStore {
    pub fn failing_after(allowed: u32) -> Self {
        Self {
            inner: MemoryStore::new(),
            allowed,
            saves: AtomicU32::new(0),
        }
    }
}

#[async_trait]
impl SessionStore for FlakyStore {
    async fn save(&self, state: &SessionState) -> Result<()> {
        if self.saves.fetch_add(1, Ordering::SeqCst) >= self.allowed {
            return Err(StoreError::Write {
                key: state.session_id.clone(),
                source: std::io::Error::new(std::io::ErrorKind::Other, "disk full"),
            }
            .into());
        }
        self.inner.save(state).await
    }

    async fn load(&self, session_id: &str) -> Result<Option<SessionState>> {
        self.inner.load(session_id).await
    }

    async fn delete(&self, session_id: &str) -> Result<bool> {
        self.inner.delete(session_id).await
    }

    async fn list(&self) -> Result<Vec<String>> {
        self.inner.list().await
    }
}
