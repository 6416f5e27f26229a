//! Warden - Execution governance for autonomous trading agents.
//!
//! This crate wraps an agent's event stream in a governed run loop: every
//! iteration is budgeted, every tool call passes risk and policy hooks,
//! and every state change is persisted before it is acknowledged.
//!
//! # Architecture
//!
//! Hexagonal: pure domain types at the center, services in `application`,
//! swappable edges behind `port` traits.
//!
//! - **`application::runner`** - The run loop: consumes agent events under
//!   an iteration governor, context window manager, and risk hooks.
//! - **`application::risk`** - Pre/post tool hooks, shared risk counters,
//!   and the consecutive-loss circuit breaker.
//! - **`application::policy`** - Pure rule evaluation over a versioned
//!   policy document and the execution log.
//! - **`application::approval`** - Human-in-the-loop approval rendezvous
//!   with TTL expiry.
//! - **`application::session`** - Workflow stage machine over a durable
//!   session aggregate.
//!
//! # Modules
//!
//! - [`domain`] - Events, plans, stages, approvals, session aggregates
//! - [`port`] - Traits for the event stream, stores, and notifier
//! - [`application`] - Governance services
//! - [`adapter`] - File-backed stores and the JSONL replay stream
//! - [`infrastructure`] - Configuration and logging setup
//! - [`error`] - Error types for the crate
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use tokio::sync::watch;
//! use warden::application::approval::ApprovalWorkflow;
//! use warden::application::risk::{RiskManager, RiskState};
//! use warden::application::runner::{AgentRunner, RunnerConfig};
//! use warden::domain::WorkflowStage;
//! use warden::port::NullNotifier;
//!
//! # async fn demo(stream: &mut dyn warden::port::AgentEventStream) {
//! let workflow = Arc::new(ApprovalWorkflow::new(Arc::new(NullNotifier)));
//! let state = Arc::new(RiskState::new(Default::default()));
//! let risk = Arc::new(RiskManager::new(state, Default::default(), workflow));
//! let runner = AgentRunner::new(RunnerConfig::default(), risk);
//! let (_abort_tx, abort_rx) = watch::channel(false);
//! let result = runner
//!     .run("find momentum setups", WorkflowStage::Discovery, stream, abort_rx)
//!     .await;
//! println!("{}", result.output);
//! # }
//! ```

pub mod adapter;
pub mod application;
pub mod config;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod port;

#[cfg(any(test, feature = "testkit"))]
pub mod testkit;
