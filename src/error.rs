//! Error types for the alert pipeline.
//!
//! Only [`ValidationError`] ever reaches callers of the fetch cycle. Fetch and
//! cache failures are recovered inside the controller and surface as a
//! [`FetchOutcome`](crate::model::FetchOutcome) instead.

use std::time::Duration;

use thiserror::Error;

/// The farm context is not complete enough to request alerts.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required context field is missing or blank.
    #[error("Farm context is missing required field: {0}")]
    MissingField(&'static str),
}

/// The alert source could not produce a batch.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The source answered with a non-success HTTP status.
    #[error("Alert source returned HTTP {0}")]
    Status(u16),

    /// The source answered, but the body is not a valid alert batch.
    #[error("Alert source returned an invalid batch: {0}")]
    InvalidResponse(String),

    /// The source did not answer within the configured bound.
    #[error("Alert fetch timed out after {0:?}")]
    Timeout(Duration),

    /// The source is unreachable for some other reason.
    #[error("Alert source unavailable: {0}")]
    Unavailable(String),

    /// Transport-level failure.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// The cache store failed to read or write.
#[derive(Debug, Error)]
pub enum CacheError {
    /// SQLite error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Stored value could not be encoded or decoded
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
