//! Error types exposed by the GitHub API client.

use thiserror::Error;

/// A remote call failed for a reason other than a rate-limit wait.
///
/// Rate-limit waits are absorbed by the client and never surface here. Every
/// variant carries the endpoint that failed so the pipeline can log and
/// record it without extra context.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    /// GitHub rejected the token (401, or a 403 that is not a rate limit).
    #[error("{endpoint}: GitHub rejected the token ({status}): {message}")]
    Authentication {
        /// Endpoint path that was requested.
        endpoint: String,
        /// HTTP status returned by GitHub.
        status: u16,
        /// Message returned with the response.
        message: String,
    },

    /// GitHub returned a client error that is not retried.
    #[error("{endpoint}: GitHub returned {status}: {message}")]
    Status {
        /// Endpoint path that was requested.
        endpoint: String,
        /// HTTP status returned by GitHub.
        status: u16,
        /// Message returned with the response.
        message: String,
    },

    /// GitHub kept returning server errors until the retry budget ran out.
    #[error("{endpoint}: GitHub returned server error {status}: {message}")]
    Server {
        /// Endpoint path that was requested.
        endpoint: String,
        /// HTTP status of the final attempt.
        status: u16,
        /// Message returned with the final response.
        message: String,
    },

    /// Networking failed while calling GitHub.
    #[error("{endpoint}: network error talking to GitHub: {message}")]
    Network {
        /// Endpoint path that was requested.
        endpoint: String,
        /// Transport-level error detail.
        message: String,
    },

    /// The response body was not the JSON shape expected for a page.
    #[error("{endpoint}: response could not be decoded: {message}")]
    Decode {
        /// Endpoint path that was requested.
        endpoint: String,
        /// Decoder error detail.
        message: String,
    },

    /// The rate limit stayed exhausted across the allowed number of waits.
    #[error("{endpoint}: rate limit still exhausted after {waits} waits")]
    RateLimitExhausted {
        /// Endpoint path that was requested.
        endpoint: String,
        /// Number of waits performed before giving up.
        waits: u32,
    },

    /// The request URI (endpoint path or page token) could not be parsed.
    #[error("{endpoint}: invalid request URI: {message}")]
    InvalidUri {
        /// Endpoint path that was requested.
        endpoint: String,
        /// Parser error detail.
        message: String,
    },
}

impl FetchError {
    /// Endpoint path that produced this error.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        match self {
            Self::Authentication { endpoint, .. }
            | Self::Status { endpoint, .. }
            | Self::Server { endpoint, .. }
            | Self::Network { endpoint, .. }
            | Self::Decode { endpoint, .. }
            | Self::RateLimitExhausted { endpoint, .. }
            | Self::InvalidUri { endpoint, .. } => endpoint,
        }
    }

    /// HTTP status that produced this error, when there was a response.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Authentication { status, .. }
            | Self::Status { status, .. }
            | Self::Server { status, .. } => Some(*status),
            Self::Network { .. }
            | Self::Decode { .. }
            | Self::RateLimitExhausted { .. }
            | Self::InvalidUri { .. } => None,
        }
    }

    /// Returns true for failures that the client retries within its budget.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Server { .. } | Self::Network { .. })
    }
}
