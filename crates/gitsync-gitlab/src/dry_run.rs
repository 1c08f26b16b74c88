//! Read-only decorator used for dry runs.

use async_trait::async_trait;
use tracing::info;

use crate::api::GitlabApi;
use crate::error::GitlabResult;
use crate::models::{AccessLevel, Group, Member, NewGroup, User};

/// Wraps a [`GitlabApi`] so that reads go through and writes are only logged.
///
/// Rules never branch on dry-run themselves; wrapping the API is the only
/// place where the mode is honoured.
#[derive(Debug)]
pub struct DryRunGitlab<A> {
    inner: A,
}

impl<A: GitlabApi> DryRunGitlab<A> {
    pub fn new(inner: A) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<A: GitlabApi> GitlabApi for DryRunGitlab<A> {
    async fn list_groups(&self) -> GitlabResult<Vec<Group>> {
        self.inner.list_groups().await
    }

    async fn get_group(&self, path: &str) -> GitlabResult<Option<Group>> {
        self.inner.get_group(path).await
    }

    async fn create_group(&self, group: &NewGroup) -> GitlabResult<()> {
        info!(group = %group.name, "Dry run: group not created");
        Ok(())
    }

    async fn list_members(&self, group_id: u64) -> GitlabResult<Vec<Member>> {
        self.inner.list_members(group_id).await
    }

    async fn add_member(
        &self,
        group_id: u64,
        user_id: u64,
        level: AccessLevel,
    ) -> GitlabResult<()> {
        info!(group_id, user_id, access_level = %level, "Dry run: member not added");
        Ok(())
    }

    async fn remove_member(&self, group_id: u64, user_id: u64) -> GitlabResult<()> {
        info!(group_id, user_id, "Dry run: member not removed");
        Ok(())
    }

    async fn list_users(&self) -> GitlabResult<Vec<User>> {
        self.inner.list_users().await
    }

    async fn current_user(&self) -> GitlabResult<User> {
        self.inner.current_user().await
    }

    async fn promote_to_admin(&self, user_id: u64) -> GitlabResult<()> {
        info!(user_id, "Dry run: user not promoted to admin");
        Ok(())
    }

    async fn block_user(&self, user_id: u64) -> GitlabResult<()> {
        info!(user_id, "Dry run: user not blocked");
        Ok(())
    }

    async fn unblock_user(&self, user_id: u64) -> GitlabResult<()> {
        info!(user_id, "Dry run: user not unblocked");
        Ok(())
    }
}
