//! Binary error type and exit codes.

use gitsync_engine::SyncError;
use thiserror::Error;

/// Exit codes:
/// - 0: success
/// - 1: configuration or other error
/// - 2: directory holds too few users
/// - 3: GitLab failure
/// - 4: directory failure
pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Logging setup failed: {0}")]
    Logging(String),

    #[error(transparent)]
    Sync(#[from] SyncError),
}

impl AppError {
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            AppError::Config(_) | AppError::Logging(_) => 1,
            AppError::Sync(e) => e.exit_code(),
        }
    }
}
