//! # Pipeline Error Types
//!
//! One error enum shared by both publishers. Every variant here is fatal to
//! the run except where a caller explicitly downgrades it; an empty source
//! result is not an error and is handled in the binaries.

use thiserror::Error;

/// Hard cap on the KITS connection retry bound. A configured bound above
/// this is rejected at construction time.
pub const MAX_CONNECT_TRIES: u32 = 5;

/// Custom error types for the KITS publishing pipelines.
#[derive(Debug, Error)]
pub enum KitsError {
    /// A required environment variable was not found.
    #[error("Environment variable {0} is not present")]
    MissingEnvVar(String),

    /// The configured connection retry bound exceeds [`MAX_CONNECT_TRIES`].
    #[error("Retry limit is {MAX_CONNECT_TRIES}, got {0}")]
    RetryBoundTooHigh(u32),

    /// Transient connection failures exhausted the bounded retry.
    #[error("Failed to connect to KITS database after {attempts} attempts: {source}")]
    ConnectionFailed {
        attempts: u32,
        #[source]
        source: tokio_postgres::Error,
    },

    /// A non-transient database failure (bad query, dropped connection, ...).
    #[error("KITS database error: {0}")]
    Db(#[from] tokio_postgres::Error),

    /// An operation-state code with no entry in the decode table. Never
    /// defaulted: an unknown code means a new device state or corrupt data.
    #[error("Unknown operation state code: {0}")]
    UnknownStatusCode(i64),

    /// Non-success HTTP response from Socrata or Knack.
    #[error("Upstream HTTP failure ({status}): {body}")]
    UpstreamHttpFailure { status: u16, body: String },

    /// Transport-level HTTP failure, including timeouts.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// A malformed portal URL (bad domain or resource id).
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// A source row is missing a required column or holds an unparsable value.
    #[error("Malformed source row: {0}")]
    MalformedRow(String),

    /// A timestamp that cannot be parsed or does not exist in the local zone.
    #[error("Bad timestamp: {0}")]
    BadTimestamp(String),
}
