use std::fmt;

/// Error type returned by [`BoatsClient`](crate::BoatsClient) operations.
#[derive(Debug, thiserror::Error)]
pub enum BoatsError {
    /// The upstream reported that the addressed boat does not exist.
    #[error("boat '{id}' not found")]
    NotFound { id: String },
    /// Every attempt failed with a retryable failure.
    #[error("upstream unavailable after {attempts} attempts: {last_failure}")]
    UpstreamUnavailable {
        /// Number of attempts made, always equal to the configured maximum.
        attempts: u32,
        /// Failure observed on the final attempt.
        last_failure: AttemptFailure,
    },
    /// Success status with a payload that is not the expected shape.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
    /// Non-success, non-retryable HTTP status other than 404.
    #[error("upstream rejected request with {status}: {body}")]
    Rejected { status: u16, body: String },
    /// Transport error that retrying cannot fix.
    #[error("transport error: {0}")]
    Transport(reqwest::Error),
    /// Empty or blank boat identifier.
    #[error("boat id must not be empty")]
    InvalidId,
    /// Malformed client configuration (base URL, environment).
    #[error("configuration error: {0}")]
    Config(String),
}

impl BoatsError {
    /// Maps the error to the HTTP status an outer API boundary should answer with.
    ///
    /// Absence (404) and unavailability (503) stay distinct.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::NotFound { .. } => 404,
            Self::UpstreamUnavailable { .. } => 503,
            Self::InvalidResponse(_) | Self::Rejected { .. } | Self::Transport(_) => 502,
            Self::InvalidId | Self::Config(_) => 400,
        }
    }

    /// Number of attempts that led to this error, when it came from the upstream.
    pub fn attempts(&self) -> Option<u32> {
        match self {
            Self::UpstreamUnavailable { attempts, .. } => Some(*attempts),
            _ => None,
        }
    }

    /// Returns `true` if the retry budget was spent on transient failures.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::UpstreamUnavailable { .. })
    }
}

/// Retryable failure of a single attempt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AttemptFailure {
    /// The attempt exceeded the per-attempt timeout.
    Timeout,
    /// Connection, request or body transfer failed.
    Network(String),
    /// Upstream answered with a retryable status (5xx by default).
    Status { status: u16, body: String },
}

impl fmt::Display for AttemptFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout => f.write_str("attempt timed out"),
            Self::Network(reason) => write!(f, "network failure: {reason}"),
            Self::Status { status, body } => write!(f, "http {status}: {body}"),
        }
    }
}
