//! Traits at the seams: event stream, operator notification, persistence.

pub mod notifier;
pub mod store;
pub mod stream;

pub use notifier::{ApprovalNotifier, NullNotifier};
pub use store::{ExecutionLogStore, PolicyStore, SessionStore};
pub use stream::AgentEventStream;
