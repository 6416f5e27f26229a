//! Shared test utilities available to both unit and integration tests.
//!
//! Enabled via `#[cfg(test)]` (unit tests) or the `testkit` feature
//! (integration tests).
//!
//! # Modules
//!
//! - [`stream`] — Mock [`AgentEventStream`](crate::port::AgentEventStream)
//!   implementations: `ScriptedStream`, `ChannelStream`.
//! - [`store`] — [`MemoryStore`], implementing every persistence port.
//! - [`notifier`] — [`RecordingNotifier`] for asserting approval traffic.

pub mod notifier;
pub mod store;
pub mod stream;

pub use notifier::RecordingNotifier;
pub use store::MemoryStore;
pub use stream::{channel_stream, ChannelStream, ChannelStreamHandle, ScriptedStream};
