//! Error types for the GitLab client.

use thiserror::Error;

/// Result type alias using `GitlabError`.
pub type GitlabResult<T> = Result<T, GitlabError>;

/// Errors that can occur when interacting with GitLab.
#[derive(Debug, Error)]
pub enum GitlabError {
    /// HTTP transport error (connection refused, timeout, TLS...).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// GitLab answered with a non-success status.
    #[error("GitLab API error ({status}): {detail}")]
    Api { status: u16, detail: String },

    /// Resource not found (HTTP 404).
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Rate limit exceeded (HTTP 429).
    #[error("Rate limited, retry after {retry_after_secs:?} seconds")]
    RateLimited { retry_after_secs: Option<u64> },

    /// Token rejected or lacking permissions (HTTP 401/403).
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Response body could not be decoded.
    #[error("Parse error: {0}")]
    Parse(String),

    /// Client configuration is invalid.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// All attempts of a retried call failed.
    #[error("{message}")]
    MaxRetriesExceeded { attempts: u32, message: String },
}

impl GitlabError {
    /// Whether the failure is transient and the call may succeed if repeated.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            Self::RateLimited { .. } => true,
            Self::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// HTTP 409, e.g. adding a user who is already a member.
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Api { status: 409, .. })
    }

    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// GitLab's 400 answer when a group name or path is in use.
    #[must_use]
    pub fn is_already_taken(&self) -> bool {
        matches!(self, Self::Api { status: 400, detail } if detail.contains("has already been taken"))
    }
}

impl From<serde_json::Error> for GitlabError {
    fn from(e: serde_json::Error) -> Self {
        Self::Parse(e.to_string())
    }
}
