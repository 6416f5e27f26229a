//! File-backed JSON blob store.
//!
//! One pretty-printed JSON document per aggregate. Writes go through a
//! temp file, fsync, and atomic rename so an acknowledged save survives a
//! crash mid-write. Documents are small and writes are infrequent, so the
//! synchronous I/O stays on the calling task.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::warn;

use crate::domain::{ExecutionLogEntry, PolicyConfig, SessionState};
use crate::error::{Result, StoreError};
use crate::port::{ExecutionLogStore, PolicyStore, SessionStore};

const POLICY_FILE: &str = "policy.json";
const EXECUTION_LOG_FILE: &str = "execution_log.jsonl";
const SESSIONS_DIR: &str = "sessions";

/// Blob store rooted at a data directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Open (and create) the store at `root`.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(root.join(SESSIONS_DIR)).map_err(|source| StoreError::Write {
            key: root.display().to_string(),
            source,
        })?;
        Ok(Self { root })
    }

    /// Default data directory: `$HOME/.local/share/warden` (platform
    /// equivalent), falling back to the current directory.
    pub fn open_default() -> Result<Self> {
        let root = dirs::data_dir()
            .map(|d| d.join("warden"))
            .unwrap_or_else(|| PathBuf::from(".warden"));
        Self::open(root)
    }

    fn session_path(&self, session_id: &str) -> PathBuf {
        self.root.join(SESSIONS_DIR).join(format!("{session_id}.json"))
    }

    fn write_atomic(&self, path: &Path, bytes: &[u8], key: &str) -> Result<()> {
        let tmp = path.with_extension("json.tmp");
        {
            let mut file = fs::File::create(&tmp).map_err(|source| StoreError::Write {
                key: key.to_string(),
                source,
            })?;
            file.write_all(bytes).map_err(|source| StoreError::Write {
                key: key.to_string(),
                source,
            })?;
            file.sync_all().map_err(|source| StoreError::Write {
                key: key.to_string(),
                source,
            })?;
        }
        fs::rename(&tmp, path).map_err(|source| StoreError::Write {
            key: key.to_string(),
            source,
        })?;
        Ok(())
    }
}

#[async_trait]
impl SessionStore for FileStore {
    async fn save(&self, state: &SessionState) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(state).map_err(|source| StoreError::Encode {
            key: state.session_id.clone(),
            source,
        })?;
        self.write_atomic(&self.session_path(&state.session_id), &bytes, &state.session_id)
    }

    async fn load(&self, session_id: &str) -> Result<Option<SessionState>> {
        let path = self.session_path(session_id);
        if !path.exists() {
            return Ok(None);
        }
        let bytes = fs::read(&path).map_err(|source| StoreError::Read {
            key: session_id.to_string(),
            source,
        })?;
        let state = serde_json::from_slice(&bytes).map_err(|source| StoreError::Decode {
            key: session_id.to_string(),
            source,
        })?;
        Ok(Some(state))
    }

    async fn delete(&self, session_id: &str) -> Result<bool> {
        let path = self.session_path(session_id);
        if !path.exists() {
            return Ok(false);
        }
        fs::remove_file(&path).map_err(|source| StoreError::Write {
            key: session_id.to_string(),
            source,
        })?;
        Ok(true)
    }

    async fn list(&self) -> Result<Vec<String>> {
        let dir = self.root.join(SESSIONS_DIR);
        let entries = fs::read_dir(&dir).map_err(|source| StoreError::Read {
            key: dir.display().to_string(),
            source,
        })?;
        let mut ids = Vec::new();
        for entry in entries.flatten() {
            let name = entry.file_name();
            if let Some(id) = name.to_str().and_then(|n| n.strip_suffix(".json")) {
                ids.push(id.to_string());
            }
        }
        ids.sort();
        Ok(ids)
    }
}

#[async_trait]
impl PolicyStore for FileStore {
    async fn save(&self, config: &PolicyConfig) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(config).map_err(|source| StoreError::Encode {
            key: POLICY_FILE.to_string(),
            source,
        })?;
        self.write_atomic(&self.root.join(POLICY_FILE), &bytes, POLICY_FILE)
    }

    async fn load(&self) -> Result<Option<PolicyConfig>> {
        let path = self.root.join(POLICY_FILE);
        if !path.exists() {
            return Ok(None);
        }
        let bytes = fs::read(&path).map_err(|source| StoreError::Read {
            key: POLICY_FILE.to_string(),
            source,
        })?;
        match serde_json::from_slice(&bytes) {
            Ok(config) => Ok(Some(config)),
            Err(e) => {
                // Corrupt policy is recoverable: the engine falls back to
                // defaults rather than refusing to start.
                warn!(error = %e, "Policy document is corrupt");
                Err(StoreError::Decode {
                    key: POLICY_FILE.to_string(),
                    source: e,
                }
                .into())
            }
        }
    }
}

#[async_trait]
impl ExecutionLogStore for FileStore {
    async fn append(&self, entry: &ExecutionLogEntry) -> Result<()> {
        let mut line = serde_json::to_vec(entry).map_err(|source| StoreError::Encode {
            key: EXECUTION_LOG_FILE.to_string(),
            source,
        })?;
        line.push(b'\n');

        let path = self.root.join(EXECUTION_LOG_FILE);
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|source| StoreError::Write {
                key: EXECUTION_LOG_FILE.to_string(),
                source,
            })?;
        file.write_all(&line).map_err(|source| StoreError::Write {
            key: EXECUTION_LOG_FILE.to_string(),
            source,
        })?;
        file.sync_all().map_err(|source| StoreError::Write {
            key: EXECUTION_LOG_FILE.to_string(),
            source,
        })?;
        Ok(())
    }

    async fn load(&self) -> Result<Vec<ExecutionLogEntry>> {
        let path = self.root.join(EXECUTION_LOG_FILE);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let content = fs::read_to_string(&path).map_err(|source| StoreError::Read {
            key: EXECUTION_LOG_FILE.to_string(),
            source,
        })?;
        let mut entries = Vec::new();
        for line in content.lines().filter(|l| !l.trim().is_empty()) {
            match serde_json::from_str(line) {
                Ok(entry) => entries.push(entry),
                Err(e) => warn!(error = %e, "Skipping unreadable execution log line"),
            }
        }
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Direction;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn session_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();

        let state = SessionState::new();
        SessionStore::save(&store, &state).await.unwrap();

        let loaded = SessionStore::load(&store, &state.session_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(loaded.session_id, state.session_id);

        let ids = SessionStore::list(&store).await.unwrap();
        assert_eq!(ids, vec![state.session_id.clone()]);

        assert!(SessionStore::delete(&store, &state.session_id).await.unwrap());
        assert!(SessionStore::load(&store, &state.session_id)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn policy_round_trip_and_corrupt_fallback() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();

        assert!(PolicyStore::load(&store).await.unwrap().is_none());

        let config = PolicyConfig::default();
        PolicyStore::save(&store, &config).await.unwrap();
        let loaded = PolicyStore::load(&store).await.unwrap().unwrap();
        assert_eq!(loaded.version, config.version);

        fs::write(dir.path().join(POLICY_FILE), b"{not json").unwrap();
        assert!(PolicyStore::load(&store).await.is_err());
    }

    #[tokio::test]
    async fn execution_log_appends_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();

        for i in 0..3 {
            let entry = ExecutionLogEntry {
                plan_id: format!("p{i}"),
                timestamp: Utc::now(),
                token: "SOL".to_string(),
                direction: Direction::Long,
                risk_percent: dec!(5),
            };
            ExecutionLogStore::append(&store, &entry).await.unwrap();
        }

        let entries = ExecutionLogStore::load(&store).await.unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[2].plan_id, "p2");
    }
}
