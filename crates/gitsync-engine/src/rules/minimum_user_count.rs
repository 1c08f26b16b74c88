use gitsync_directory::DirectoryTree;
use tracing::{error, info};

use crate::error::{SyncError, SyncResult};

/// Abort when the directory holds fewer than `minimum` distinct users, which
/// usually means the directory read went wrong.
pub fn check_minimum_user_count(directory: &DirectoryTree, minimum: usize) -> SyncResult<usize> {
    let found = directory.user_count();
    if found < minimum {
        error!(found, minimum, "Too few users in the directory, aborting");
        return Err(SyncError::Precondition { found, minimum });
    }
    info!(found, minimum, "Directory user count is sufficient");
    Ok(found)
}
