use thiserror::Error;

/// Configuration-related errors with structured variants.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("failed to read config file: {0}")]
    ReadFile(#[source] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[source] toml::de::Error),
}

/// Risk gating errors.
///
/// These describe why a high-risk action was refused. They are carried
/// inside [`RiskCheckResult`](crate::application::risk::RiskCheckResult)
/// reason strings rather than propagated as `Err`; a refusal is a
/// decision, not a failure.
#[derive(Error, Debug, Clone)]
pub enum RiskError {
    #[error("circuit breaker tripped after {consecutive_losses} consecutive losses; {remaining_minutes} minutes of cooldown remaining")]
    CircuitOpen {
        consecutive_losses: u32,
        remaining_minutes: i64,
    },

    #[error("position size {requested} exceeds limit {limit}")]
    PositionSizeExceeded {
        requested: rust_decimal::Decimal,
        limit: rust_decimal::Decimal,
    },

    #[error("daily loss {current} has reached limit {limit}")]
    DailyLossExceeded {
        current: rust_decimal::Decimal,
        limit: rust_decimal::Decimal,
    },

    #[error("open positions at limit: {current} >= {limit}")]
    OpenPositionsExceeded { current: u32, limit: u32 },

    #[error("token '{token}' is blacklisted")]
    Blacklisted { token: String },

    #[error("'{tool}' requires human confirmation before execution")]
    ConfirmationRequired { tool: String },
}

/// Policy update errors.
#[derive(Error, Debug, Clone)]
pub enum PolicyError {
    #[error("invalid value for {field}: {value} (must be in ({min}, {max}])")]
    OutOfRange {
        field: &'static str,
        value: String,
        min: String,
        max: String,
    },
}

/// Approval workflow errors.
#[derive(Error, Debug, Clone)]
pub enum ApprovalError {
    #[error("no pending approval with id {id}")]
    NotFound { id: String },
}

/// Persistence errors for the blob store.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("failed to read {key}: {source}")]
    Read {
        key: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {key}: {source}")]
    Write {
        key: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to decode {key}: {source}")]
    Decode {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to encode {key}: {source}")]
    Encode {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Session state machine errors.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("session {session_id} not found")]
    NotFound { session_id: String },
}

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Policy(#[from] PolicyError),

    #[error(transparent)]
    Approval(#[from] ApprovalError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
