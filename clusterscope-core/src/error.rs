use chrono::{DateTime, Utc};
use thiserror::Error;

pub type ScopeResult<T> = Result<T, ScopeError>;

#[derive(Error, Debug)]
pub enum ScopeError {
    #[error("world model not bootstrapped")]
    NotBootstrapped,

    #[error("unknown update type: {0}")]
    UnknownUpdateType(String),

    #[error("resource not found: {0}")]
    NotFound(String),

    #[error("resource {key} not found in snapshot at {at}")]
    NotFoundInSnapshot { key: String, at: DateTime<Utc> },

    #[error("no snapshot available at {0} (outside retention window)")]
    NoSnapshot(DateTime<Utc>),

    #[error("no snapshots available")]
    NoSnapshots,

    #[error("invalid time {0:?}")]
    BadTime(String),

    #[error("fetch {kind} in namespace {namespace:?}: {message}")]
    Fetch {
        kind: String,
        namespace: String,
        message: String,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("configuration error: {0}")]
    Config(String),
}
