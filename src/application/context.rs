//! Context window budget management for accumulated tool results.
//!
//! Token counts are a byte-length heuristic (length / 4), not a real
//! tokenizer. The invariant that matters is that total estimated usage
//! trends below the budget after [`ContextManager::compact`].

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

/// One accumulated tool result.
#[derive(Debug, Clone)]
pub struct ContextEntry {
    /// Tool name that produced the payload.
    pub source: String,
    pub tokens: usize,
    pub content: String,
    /// Whether `content` is a truncated summary rather than the raw payload.
    pub summarized: bool,
    pub inserted_at: DateTime<Utc>,
}

/// Outcome of adding a tool result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddOutcome {
    /// Payload was over the summary threshold and stored truncated.
    pub summarized: bool,
}

/// Usage snapshot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContextUsage {
    pub total_tokens: usize,
    pub max_tokens: usize,
    pub percent_used: f64,
}

/// Tracks an approximate token budget across tool results and evicts the
/// oldest entries once a compaction threshold is crossed.
#[derive(Debug)]
pub struct ContextManager {
    entries: Vec<ContextEntry>,
    pinned: HashSet<String>,
    max_tokens: usize,
    compaction_ratio: f64,
    summary_threshold_tokens: usize,
}

/// Bytes-per-token heuristic shared with the summary threshold.
const BYTES_PER_TOKEN: usize = 4;

/// How many tokens of head content a summary keeps.
const SUMMARY_HEAD_TOKENS: usize = 256;

impl ContextManager {
    #[must_use]
    pub fn new(max_tokens: usize, compaction_ratio: f64, summary_threshold_tokens: usize) -> Self {
        Self {
            entries: Vec::new(),
            pinned: HashSet::new(),
            max_tokens: max_tokens.max(1),
            compaction_ratio: compaction_ratio.clamp(0.1, 1.0),
            summary_threshold_tokens,
        }
    }

    /// Estimate tokens for a payload.
    #[must_use]
    pub fn estimate_tokens(payload: &str) -> usize {
        payload.len() / BYTES_PER_TOKEN
    }

    /// Record a tool result, summarizing oversized payloads immediately.
    pub fn add_tool_result(&mut self, source: impl Into<String>, payload: &str) -> AddOutcome {
        let source = source.into();
        let raw_tokens = Self::estimate_tokens(payload);
        let summarize = raw_tokens > self.summary_threshold_tokens;

        let content = if summarize {
            Self::summarize(payload)
        } else {
            payload.to_string()
        };
        let tokens = Self::estimate_tokens(&content);

        debug!(
            source = %source,
            tokens,
            summarized = summarize,
            "Tool result added to context"
        );
        self.entries.push(ContextEntry {
            source,
            tokens,
            content,
            summarized: summarize,
            inserted_at: Utc::now(),
        });

        AddOutcome {
            summarized: summarize,
        }
    }

    /// Mark every entry from `source` as surviving compaction.
    pub fn pin(&mut self, source: impl Into<String>) {
        self.pinned.insert(source.into());
    }

    /// True once usage exceeds the compaction threshold.
    #[must_use]
    pub fn needs_compaction(&self) -> bool {
        self.total_tokens() as f64 > self.max_tokens as f64 * self.compaction_ratio
    }

    /// Shrink, then evict, the oldest non-pinned entries until usage falls
    /// below the compaction threshold. Returns how many entries were
    /// removed. Idempotent: a call when already under threshold removes
    /// nothing.
    pub fn compact(&mut self) -> usize {
        if !self.needs_compaction() {
            return 0;
        }

        let budget = (self.max_tokens as f64 * self.compaction_ratio) as usize;

        // First pass: shrink raw entries to summaries, oldest first,
        // stopping once under budget so newer raw payloads survive intact.
        let mut index = 0;
        while self.total_tokens() > budget && index < self.entries.len() {
            let skip = self.pinned.contains(&self.entries[index].source)
                || self.entries[index].summarized;
            if !skip {
                let entry = &mut self.entries[index];
                entry.content = Self::summarize(&entry.content);
                entry.tokens = Self::estimate_tokens(&entry.content);
                entry.summarized = true;
            }
            index += 1;
        }

        // Second pass: evict oldest non-pinned entries until under budget.
        let mut removed = 0;
        while self.total_tokens() > budget {
            let Some(index) = self
                .entries
                .iter()
                .position(|e| !self.pinned.contains(&e.source))
            else {
                break; // everything left is pinned
            };
            self.entries.remove(index);
            removed += 1;
        }

        info!(
            removed,
            total_tokens = self.total_tokens(),
            max_tokens = self.max_tokens,
            "Context compacted"
        );
        removed
    }

    /// Current usage snapshot.
    #[must_use]
    pub fn usage(&self) -> ContextUsage {
        let total = self.total_tokens();
        ContextUsage {
            total_tokens: total,
            max_tokens: self.max_tokens,
            percent_used: total as f64 / self.max_tokens as f64 * 100.0,
        }
    }

    #[must_use]
    pub fn entries(&self) -> &[ContextEntry] {
        &self.entries
    }

    fn total_tokens(&self) -> usize {
        self.entries.iter().map(|e| e.tokens).sum()
    }

    fn summarize(payload: &str) -> String {
        let keep_bytes = SUMMARY_HEAD_TOKENS * BYTES_PER_TOKEN;
        if payload.len() <= keep_bytes {
            return payload.to_string();
        }
        // Truncate on a char boundary.
        let mut cut = keep_bytes;
        while !payload.is_char_boundary(cut) {
            cut -= 1;
        }
        let truncated = payload.len() - cut;
        format!("{}... [{truncated} bytes truncated]", &payload[..cut])
    }
}
