//! Concrete implementations of the outbound ports.

pub mod file_store;
pub mod replay;

pub use file_store::FileStore;
pub use replay::JsonlReplayStream;
