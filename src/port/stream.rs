//! Event stream port: the seam to the external agent engine.

use async_trait::async_trait;

use crate::domain::AgentEvent;

/// An asynchronous sequence of agent events.
///
/// Implementations wrap the agent SDK's streaming output (or a recording of
/// it). The run loop is the single consumer: it suspends on `next_event`
/// and processes events strictly sequentially.
///
/// Returning `None` signals natural end of stream.
#[async_trait]
pub trait AgentEventStream: Send {
    async fn next_event(&mut self) -> Option<AgentEvent>;
}
