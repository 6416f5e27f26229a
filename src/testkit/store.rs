//! In-memory store implementing all persistence ports.

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::RwLock;

use crate::domain::{ExecutionLogEntry, PolicyConfig, SessionState};
use crate::error::Result;
use crate::port::{ExecutionLogStore, PolicyStore, SessionStore};

/// In-memory blob store. Implements every store port so one instance can
/// back a whole test fixture.
#[derive(Default)]
pub struct MemoryStore {
    sessions: DashMap<String, SessionState>,
    policy: RwLock<Option<PolicyConfig>>,
    log: RwLock<Vec<ExecutionLogEntry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of session documents currently stored.
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn save(&self, state: &SessionState) -> Result<()> {
        self.sessions
            .insert(state.session_id.clone(), state.clone());
        Ok(())
    }

    async fn load(&self, session_id: &str) -> Result<Option<SessionState>> {
        Ok(self.sessions.get(session_id).map(|s| s.value().clone()))
    }

    async fn delete(&self, session_id: &str) -> Result<bool> {
        Ok(self.sessions.remove(session_id).is_some())
    }

    async fn list(&self) -> Result<Vec<String>> {
        let mut ids: Vec<String> = self.sessions.iter().map(|e| e.key().clone()).collect();
        ids.sort();
        Ok(ids)
    }
}

#[async_trait]
impl PolicyStore for MemoryStore {
    async fn save(&self, config: &PolicyConfig) -> Result<()> {
        *self.policy.write() = Some(config.clone());
        Ok(())
    }

    async fn load(&self) -> Result<Option<PolicyConfig>> {
        Ok(self.policy.read().clone())
    }
}

#[async_trait]
impl ExecutionLogStore for MemoryStore {
    async fn append(&self, entry: &ExecutionLogEntry) -> Result<()> {
        self.log.write().push(entry.clone());
        Ok(())
    }

    async fn load(&self) -> Result<Vec<ExecutionLogEntry>> {
        Ok(self.log.read().clone())
    }
}
