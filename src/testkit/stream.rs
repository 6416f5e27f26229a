//! Mock [`AgentEventStream`] implementations for testing.
//!
//! Two mock stream types for different testing needs:
//!
//! - [`ScriptedStream`] — Pre-loaded event queue. Best for: run-loop
//!   behavior on a fixed transcript (limits, degradation, hooks).
//!
//! - [`ChannelStream`] — Channel-backed stream with external control
//!   handle. Best for: integration tests needing precise, on-demand event
//!   delivery (abort mid-stream, approval rendezvous).

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;

use crate::domain::AgentEvent;
use crate::port::AgentEventStream;

// ---------------------------------------------------------------------------
// ScriptedStream
// ---------------------------------------------------------------------------

/// A mock stream that yields a fixed event queue, then `None`.
pub struct ScriptedStream {
    events: VecDeque<AgentEvent>,
    polled: Arc<AtomicU32>,
}

impl ScriptedStream {
    pub fn new(events: Vec<AgentEvent>) -> Self {
        Self {
            events: events.into(),
            polled: Arc::new(AtomicU32::new(0)),
        }
    }

    /// Shared counter of `next_event` calls, for asserting how far the
    /// consumer got before stopping.
    pub fn poll_counter(&self) -> Arc<AtomicU32> {
        self.polled.clone()
    }
}

#[async_trait]
impl AgentEventStream for ScriptedStream {
    async fn next_event(&mut self) -> Option<AgentEvent> {
        self.polled.fetch_add(1, Ordering::SeqCst);
        self.events.pop_front()
    }
}

// ---------------------------------------------------------------------------
// ChannelStream
// ---------------------------------------------------------------------------

/// A mock stream controlled externally via a [`ChannelStreamHandle`].
pub struct ChannelStream {
    event_rx: tokio::sync::mpsc::Receiver<Option<AgentEvent>>,
}

/// Control handle for a [`ChannelStream`].
pub struct ChannelStreamHandle {
    event_tx: tokio::sync::mpsc::Sender<Option<AgentEvent>>,
}

impl ChannelStreamHandle {
    /// Send an event to the stream.
    pub async fn send(&self, event: AgentEvent) {
        let _ = self.event_tx.send(Some(event)).await;
    }

    /// Get a cloned sender for sending events without holding a reference.
    pub fn sender(&self) -> tokio::sync::mpsc::Sender<Option<AgentEvent>> {
        self.event_tx.clone()
    }

    /// Signal end-of-stream (causes `next_event` to return `None`).
    pub async fn close(&self) {
        let _ = self.event_tx.send(None).await;
    }
}

/// Create a [`ChannelStream`] and its control [`ChannelStreamHandle`].
pub fn channel_stream(buffer: usize) -> (ChannelStream, ChannelStreamHandle) {
    let (tx, rx) = tokio::sync::mpsc::channel(buffer);
    (
        ChannelStream { event_rx: rx },
        ChannelStreamHandle { event_tx: tx },
    )
}

#[async_trait]
impl AgentEventStream for ChannelStream {
    async fn next_event(&mut self) -> Option<AgentEvent> {
        match self.event_rx.recv().await {
            Some(Some(event)) => Some(event),
            Some(None) | None => None,
        }
    }
}
