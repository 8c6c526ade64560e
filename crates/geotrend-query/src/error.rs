//! Error types for the query layer
//!
//! - [`QueryError`]: one remote query failed
//! - [`LoadError`]: a whole entity/group/region load failed

use geotrend_series::EntityId;

/// A single feature-service query failed
#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    /// Network or HTTP-level failure
    #[error("transport error: {0}")]
    Transport(String),

    /// The service answered with an error payload
    #[error("service error {code}: {message}")]
    Service { code: i64, message: String },

    /// The response body could not be decoded
    #[error("malformed response: {0}")]
    Decode(String),

    /// No answer within the configured limit
    #[error("query timed out after {duration_ms}ms")]
    Timeout { duration_ms: u64 },

    /// The source location is unknown or unusable
    #[error("invalid source location: {0}")]
    InvalidSource(String),
}

impl QueryError {
    /// Whether a later attempt could plausibly succeed
    ///
    /// Classification only; the pipeline never retries on its own.
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Timeout { .. })
    }
}

/// A chart load failed
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// The entity query matched no records
    #[error("no records for entity {entity_id}")]
    NoData { entity_id: EntityId },

    /// One of the remote queries failed
    #[error("remote query failed: {0}")]
    RemoteQuery(#[from] QueryError),
}

impl LoadError {
    /// Whether a later attempt could plausibly succeed
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::NoData { .. } => false,
            Self::RemoteQuery(e) => e.is_retryable(),
        }
    }

    /// Expected outcome that is handled without logging a warning
    #[inline]
    #[must_use]
    pub fn is_silent(&self) -> bool {
        matches!(self, Self::NoData { .. })
    }
}
