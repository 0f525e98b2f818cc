use std::time::Duration;

use thiserror::Error;

/// Request problems detected locally, before any network call is made.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("latitude {0} is outside [-90, 90]")]
    LatitudeOutOfRange(f64),

    #[error("longitude {0} is outside [-180, 180]")]
    LongitudeOutOfRange(f64),

    #[error("search needs either a location or both latitude and longitude")]
    MissingSearchAnchor,

    #[error("API key must not be empty")]
    EmptyApiKey,

    #[error("business id must not be empty")]
    EmptyBusinessId,
}

/// Errors returned by the Fusion API client.
///
/// Well-formed error envelopes returned by the remote API are not errors at
/// this level; they are decoded into the response's `error` field.
#[derive(Debug, Error)]
pub enum FusionError {
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Network, TLS, or timeout failure from the underlying HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-2xx status whose body was not a recognizable error envelope.
    /// `retry_after` carries a delta-seconds `Retry-After` header, if sent.
    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus {
        status: u16,
        url: String,
        retry_after: Option<Duration>,
    },

    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("request cancelled")]
    Cancelled,

    #[error("invalid base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },
}

impl FusionError {
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(self, FusionError::Validation(_))
    }

    /// Whether repeating the same GET could succeed: timeouts, refused
    /// connections, and 5xx statuses without an error envelope.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            FusionError::Http(e) => e.is_timeout() || e.is_connect(),
            FusionError::UnexpectedStatus { status, .. } => *status >= 500,
            FusionError::Validation(_)
            | FusionError::Deserialize { .. }
            | FusionError::Cancelled
            | FusionError::InvalidBaseUrl { .. } => false,
        }
    }

    /// Wait the server asked for before the next attempt.
    #[must_use]
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            FusionError::UnexpectedStatus { retry_after, .. } => *retry_after,
            _ => None,
        }
    }
}
