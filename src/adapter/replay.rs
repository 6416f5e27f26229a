//! JSONL replay stream: feeds a recorded agent transcript through the
//! governed run loop, one event per line.

use std::path::PathBuf;

use async_trait::async_trait;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader, Lines};
use tracing::warn;

use crate::domain::AgentEvent;
use crate::error::{Result, StoreError};
use crate::port::AgentEventStream;

/// Reads [`AgentEvent`]s from a JSONL transcript file.
///
/// Unparseable lines are skipped with a warning so a partially mangled
/// transcript still replays the events it does contain.
pub struct JsonlReplayStream {
    path: PathBuf,
    lines: Lines<BufReader<File>>,
}

impl JsonlReplayStream {
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let file = File::open(&path).await.map_err(|source| StoreError::Read {
            key: path.display().to_string(),
            source,
        })?;
        let lines = BufReader::new(file).lines();
        Ok(Self { path, lines })
    }
}

#[async_trait]
impl AgentEventStream for JsonlReplayStream {
    async fn next_event(&mut self) -> Option<AgentEvent> {
        loop {
            let line = match self.lines.next_line().await {
                Ok(Some(line)) => line,
                Ok(None) => return None,
                Err(e) => {
                    warn!(path = %self.path.display(), error = %e, "Transcript read failed");
                    return None;
                }
            };
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str(&line) {
                Ok(event) => return Some(event),
                Err(e) => {
                    warn!(error = %e, "Skipping unparseable transcript line");
                }
            }
        }
    }
}
