//! The remote GitLab operations gitsync relies on.

use async_trait::async_trait;
use std::sync::Arc;

use crate::error::GitlabResult;
use crate::models::{AccessLevel, Group, Member, NewGroup, User};

/// Group, membership and user operations of a GitLab instance.
///
/// Implemented by [`crate::client::GitlabClient`] over HTTP and by
/// [`crate::dry_run::DryRunGitlab`] as a read-only decorator. Mutating
/// operations return `()`: callers re-read state instead of trusting echoes.
#[async_trait]
pub trait GitlabApi: Send + Sync {
    /// List all groups visible to the token.
    async fn list_groups(&self) -> GitlabResult<Vec<Group>>;

    /// Look a group up by its full path.
    ///
    /// A missing group is `Ok(None)`, never an error.
    async fn get_group(&self, path: &str) -> GitlabResult<Option<Group>>;

    async fn create_group(&self, group: &NewGroup) -> GitlabResult<()>;

    /// Direct members of a group.
    async fn list_members(&self, group_id: u64) -> GitlabResult<Vec<Member>>;

    async fn add_member(&self, group_id: u64, user_id: u64, level: AccessLevel)
        -> GitlabResult<()>;

    async fn remove_member(&self, group_id: u64, user_id: u64) -> GitlabResult<()>;

    /// List every account of the instance, blocked ones included.
    async fn list_users(&self) -> GitlabResult<Vec<User>>;

    /// The account owning the API token.
    async fn current_user(&self) -> GitlabResult<User>;

    async fn promote_to_admin(&self, user_id: u64) -> GitlabResult<()>;

    async fn block_user(&self, user_id: u64) -> GitlabResult<()>;

    async fn unblock_user(&self, user_id: u64) -> GitlabResult<()>;
}

#[async_trait]
impl<T: GitlabApi + ?Sized> GitlabApi for Arc<T> {
    async fn list_groups(&self) -> GitlabResult<Vec<Group>> {
        (**self).list_groups().await
    }

    async fn get_group(&self, path: &str) -> GitlabResult<Option<Group>> {
        (**self).get_group(path).await
    }

    async fn create_group(&self, group: &NewGroup) -> GitlabResult<()> {
        (**self).create_group(group).await
    }

    async fn list_members(&self, group_id: u64) -> GitlabResult<Vec<Member>> {
        (**self).list_members(group_id).await
    }

    async fn add_member(
        &self,
        group_id: u64,
        user_id: u64,
        level: AccessLevel,
    ) -> GitlabResult<()> {
        (**self).add_member(group_id, user_id, level).await
    }

    async fn remove_member(&self, group_id: u64, user_id: u64) -> GitlabResult<()> {
        (**self).remove_member(group_id, user_id).await
    }

    async fn list_users(&self) -> GitlabResult<Vec<User>> {
        (**self).list_users().await
    }

    async fn current_user(&self) -> GitlabResult<User> {
        (**self).current_user().await
    }

    async fn promote_to_admin(&self, user_id: u64) -> GitlabResult<()> {
        (**self).promote_to_admin(user_id).await
    }

    async fn block_user(&self, user_id: u64) -> GitlabResult<()> {
        (**self).block_user(user_id).await
    }

    async fn unblock_user(&self, user_id: u64) -> GitlabResult<()> {
        (**self).unblock_user(user_id).await
    }
}
