//! The retrying, dry-run aware facade the reconciliation rules talk to.

use tracing::info;

use crate::api::GitlabApi;
use crate::dry_run::DryRunGitlab;
use crate::error::{GitlabError, GitlabResult};
use crate::models::{AccessLevel, Group, Member, NewGroup, User};
use crate::retry::RetryPolicy;

/// Every remote call goes through the injected [`RetryPolicy`]; in dry-run
/// mode the API is wrapped in [`DryRunGitlab`] so writes are elided.
///
/// Errors returned from here have already exhausted their retries and are
/// meant to abort the run.
pub struct CapabilityClient {
    api: Box<dyn GitlabApi>,
    retry: RetryPolicy,
    dry_run: bool,
}

impl CapabilityClient {
    pub fn new<A: GitlabApi + 'static>(api: A, retry: RetryPolicy, dry_run: bool) -> Self {
        let api: Box<dyn GitlabApi> = if dry_run {
            info!("Dry run enabled: no change will be written to GitLab");
            Box::new(DryRunGitlab::new(api))
        } else {
            Box::new(api)
        };
        Self {
            api,
            retry,
            dry_run,
        }
    }

    #[must_use]
    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    // ── Reads ─────────────────────────────────────────────────────────

    pub async fn list_groups(&self) -> GitlabResult<Vec<Group>> {
        self.retry
            .execute("list_groups", || self.api.list_groups())
            .await
    }

    /// `Ok(None)` when the group does not exist.
    pub async fn get_group(&self, path: &str) -> GitlabResult<Option<Group>> {
        self.retry
            .execute("get_group", || self.api.get_group(path))
            .await
    }

    pub async fn list_members(&self, group: &Group) -> GitlabResult<Vec<Member>> {
        self.retry
            .execute("list_members", || self.api.list_members(group.id))
            .await
    }

    pub async fn list_users(&self) -> GitlabResult<Vec<User>> {
        self.retry
            .execute("list_users", || self.api.list_users())
            .await
    }

    /// The technical account driving the run.
    pub async fn current_user(&self) -> GitlabResult<User> {
        self.retry
            .execute("current_user", || self.api.current_user())
            .await
    }

    // ── Writes ────────────────────────────────────────────────────────
    //
    // A write repeated after a lost response may find its own effect; those
    // answers count as success.

    pub async fn create_group(&self, name: &str) -> GitlabResult<()> {
        let request = NewGroup::private(name);
        self.retry
            .execute_write("create_group", GitlabError::is_already_taken, || {
                self.api.create_group(&request)
            })
            .await
    }

    pub async fn add_member(
        &self,
        group: &Group,
        user_id: u64,
        level: AccessLevel,
    ) -> GitlabResult<()> {
        self.retry
            .execute_write("add_member", GitlabError::is_conflict, || {
                self.api.add_member(group.id, user_id, level)
            })
            .await
    }

    pub async fn remove_member(&self, group: &Group, user_id: u64) -> GitlabResult<()> {
        self.retry
            .execute_write("remove_member", GitlabError::is_not_found, || {
                self.api.remove_member(group.id, user_id)
            })
            .await
    }

    pub async fn promote_to_admin(&self, user: &User) -> GitlabResult<()> {
        self.retry
            .execute("promote_to_admin", || self.api.promote_to_admin(user.id))
            .await
    }

    pub async fn block_user(&self, user: &User) -> GitlabResult<()> {
        self.retry
            .execute("block_user", || self.api.block_user(user.id))
            .await
    }

    pub async fn unblock_user(&self, user: &User) -> GitlabResult<()> {
        self.retry
            .execute("unblock_user", || self.api.unblock_user(user.id))
            .await
    }
}

impl std::fmt::Debug for CapabilityClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CapabilityClient")
            .field("retry", &self.retry)
            .field("dry_run", &self.dry_run)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    /// Fails the first `failures` calls of every operation, counts writes.
    #[derive(Default)]
    struct FlakyGitlab {
        failures: u32,
        calls: AtomicU32,
        writes: AtomicU32,
    }

    impl FlakyGitlab {
        fn failing(failures: u32) -> Self {
            Self {
                failures,
                ..Self::default()
            }
        }

        fn call(&self) -> GitlabResult<()> {
            if self.calls.fetch_add(1, Ordering::SeqCst) < self.failures {
                Err(GitlabError::Api {
                    status: 500,
                    detail: "boom".into(),
                })
            } else {
                Ok(())
            }
        }

        fn write(&self) -> GitlabResult<()> {
            self.call()?;
            self.writes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn user(id: u64, name: &str) -> User {
        User {
            id,
            username: name.into(),
            is_admin: false,
            state: Default::default(),
            identities: Vec::new(),
        }
    }

    fn group() -> Group {
        Group {
            id: 1,
            name: "role-a".into(),
            path: "role-a".into(),
            full_path: "role-a".into(),
        }
    }

    #[async_trait]
    impl GitlabApi for FlakyGitlab {
        async fn list_groups(&self) -> GitlabResult<Vec<Group>> {
            self.call().map(|()| vec![group()])
        }
        async fn get_group(&self, _path: &str) -> GitlabResult<Option<Group>> {
            self.call().map(|()| None)
        }
        async fn create_group(&self, _group: &NewGroup) -> GitlabResult<()> {
            self.write()
        }
        async fn list_members(&self, _group_id: u64) -> GitlabResult<Vec<Member>> {
            self.call().map(|()| Vec::new())
        }
        async fn add_member(&self, _g: u64, _u: u64, _l: AccessLevel) -> GitlabResult<()> {
            self.write()
        }
        async fn remove_member(&self, _g: u64, _u: u64) -> GitlabResult<()> {
            self.write()
        }
        async fn list_users(&self) -> GitlabResult<Vec<User>> {
            self.call().map(|()| vec![user(1, "alice")])
        }
        async fn current_user(&self) -> GitlabResult<User> {
            self.call().map(|()| user(99, "gitsync-bot"))
        }
        async fn promote_to_admin(&self, _u: u64) -> GitlabResult<()> {
            self.write()
        }
        async fn block_user(&self, _u: u64) -> GitlabResult<()> {
            self.write()
        }
        async fn unblock_user(&self, _u: u64) -> GitlabResult<()> {
            self.write()
        }
    }

    #[tokio::test]
    async fn test_transient_failures_are_retried() {
        let api = Arc::new(FlakyGitlab::failing(2));
        let client = CapabilityClient::new(api.clone(), RetryPolicy::immediate(3), false);

        let groups = client.list_groups().await.unwrap();

        assert_eq!(groups.len(), 1);
        assert_eq!(api.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retries_are_counted_per_call() {
        let api = Arc::new(FlakyGitlab::failing(2));
        let client = CapabilityClient::new(api.clone(), RetryPolicy::immediate(3), false);

        client.list_users().await.unwrap();
        // The budget is fresh for the second call.
        client.current_user().await.unwrap();

        assert_eq!(api.calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_exhausted_retries_escalate() {
        let api = Arc::new(FlakyGitlab::failing(10));
        let client = CapabilityClient::new(api.clone(), RetryPolicy::immediate(3), false);

        let result = client.add_member(&group(), 1, AccessLevel::Maintainer).await;

        assert!(matches!(
            result,
            Err(GitlabError::MaxRetriesExceeded { attempts: 3, .. })
        ));
        assert_eq!(api.writes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_dry_run_skips_writes_but_reads() {
        let api = Arc::new(FlakyGitlab::default());
        let client = CapabilityClient::new(api.clone(), RetryPolicy::immediate(3), true);
        let alice = user(1, "alice");

        client.create_group("role-b").await.unwrap();
        client.add_member(&group(), 1, AccessLevel::Owner).await.unwrap();
        client.remove_member(&group(), 1).await.unwrap();
        client.promote_to_admin(&alice).await.unwrap();
        client.block_user(&alice).await.unwrap();
        client.unblock_user(&alice).await.unwrap();
        let users = client.list_users().await.unwrap();

        assert!(client.is_dry_run());
        assert_eq!(users.len(), 1);
        assert_eq!(api.writes.load(Ordering::SeqCst), 0);
        assert_eq!(api.calls.load(Ordering::SeqCst), 1);
    }
}
