//! Convenience re-export of the configuration types.
//!
//! `warden::config::Config` is the short path callers use; the
//! implementation lives in [`crate::infrastructure::config`].

pub use crate::infrastructure::config::{Config, LoggingConfig, RiskConfig, RunnerAppConfig};
