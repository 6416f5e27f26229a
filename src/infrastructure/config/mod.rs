//! Configuration loading: TOML file with per-section defaults.

pub mod logging;
pub mod risk;
pub mod runner;
pub mod settings;

pub use logging::LoggingConfig;
pub use risk::RiskConfig;
pub use runner::RunnerAppConfig;
pub use settings::Config;
