//! Persistence ports: JSON-blob-per-aggregate stores.
//!
//! The governance core treats persistence as a key-value blob store. Each
//! aggregate (session document, policy document, execution log) is written
//! whole on every mutation; implementations must make the write durable
//! before returning so that acknowledged state survives a crash.

use async_trait::async_trait;

use crate::domain::{ExecutionLogEntry, PolicyConfig, SessionState};
use crate::error::Result;

/// Store for session aggregates, one document per session id.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Persist the full aggregate, replacing any previous document.
    async fn save(&self, state: &SessionState) -> Result<()>;

    /// Load a session by id.
    async fn load(&self, session_id: &str) -> Result<Option<SessionState>>;

    /// Delete a session document.
    async fn delete(&self, session_id: &str) -> Result<bool>;

    /// List all stored session ids.
    async fn list(&self) -> Result<Vec<String>>;
}

/// Store for the single versioned policy document.
#[async_trait]
pub trait PolicyStore: Send + Sync {
    async fn save(&self, config: &PolicyConfig) -> Result<()>;

    /// Load the policy document. `None` when none has been written yet.
    async fn load(&self) -> Result<Option<PolicyConfig>>;
}

/// Store for the append-only execution log.
#[async_trait]
pub trait ExecutionLogStore: Send + Sync {
    /// Append one entry. Entries are never rewritten or deleted.
    async fn append(&self, entry: &ExecutionLogEntry) -> Result<()>;

    /// Load the full log in append order.
    async fn load(&self) -> Result<Vec<ExecutionLogEntry>>;
}
