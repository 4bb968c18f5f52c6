//! Error types shared by storage, service and categorization code

use thiserror::Error;

pub type Result<T> = std::result::Result<T, KitchenError>;

#[derive(Debug, Error)]
pub enum KitchenError {
    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: i64 },

    #[error("{kind} {id} belongs to another user")]
    Unauthorized { kind: &'static str, id: i64 },

    #[error("invalid input: {0}")]
    Validation(String),

    #[error("ingredient {id} is still used by {count} recipe line(s)")]
    InUse { id: i64, count: usize },

    #[error("cannot move item {from} to {to} in a list of {len}")]
    InvalidMove { from: usize, to: usize, len: usize },

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("json error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Failures of the text-generation service used for categorization.
#[derive(Debug, Clone, Error)]
pub enum GenerationError {
    #[error("missing api key")]
    MissingApiKey,
    #[error("network error: {0}")]
    Transport(String),
    #[error("timeout")]
    Timeout,
    #[error("invalid api key")]
    InvalidApiKey,
    #[error("rate limited")]
    RateLimited,
    #[error("http {status}: {body}")]
    Http { status: u16, body: String },
    #[error("response had no text content")]
    EmptyResponse,
}
