//! Wiring: configuration and process bootstrap.

pub mod config;
