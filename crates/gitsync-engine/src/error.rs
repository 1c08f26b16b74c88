//! Reconciliation error types.

use gitsync_directory::DirectoryError;
use gitsync_gitlab::GitlabError;
use thiserror::Error;

/// Fatal outcome of a reconciliation run.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The directory holds too few users to be trusted.
    #[error("Directory holds {found} distinct user(s), minimum is {minimum}")]
    Precondition { found: usize, minimum: usize },

    /// A GitLab call failed for good.
    #[error("GitLab error: {0}")]
    Remote(#[from] GitlabError),

    /// The directory could not be read.
    #[error("Directory error: {0}")]
    Directory(#[from] DirectoryError),

    /// The settings are unusable.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl SyncError {
    /// Process exit code for this error.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            SyncError::Precondition { .. } => 2,
            SyncError::Remote(_) => 3,
            SyncError::Directory(_) => 4,
            SyncError::Config(_) => 1,
        }
    }
}

/// Result type for reconciliation.
pub type SyncResult<T> = Result<T, SyncError>;
