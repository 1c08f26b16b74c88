//! The reconciliation rules and their fixed order.

mod add_authorized_users;
mod block_or_unblock_users;
mod clean_groups;
mod minimum_user_count;
mod promote_admin_users;
mod promote_developers;
mod propagate_owners;
mod wide_access_users;

use std::collections::BTreeMap;
use std::fmt;

use gitsync_directory::DirectoryTree;
use gitsync_gitlab::{CapabilityClient, User};
use tokio::sync::OnceCell;

use crate::config::SyncConfig;
use crate::error::SyncResult;
use crate::filters::ComplianceFilters;
use crate::membership::Grant;
use crate::view::PlatformView;

pub use minimum_user_count::check_minimum_user_count;

/// A reconciliation rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Rule {
    CheckMinimumUserCount,
    BlockOrUnblockUsers,
    CleanGroupsFromUnauthorizedUsers,
    AddAuthorizedUsersToGroups,
    PromoteUsersAsDeveloperToAllGroups,
    PromoteAdminUsers,
    PropagateOwnerUsersToAllGroups,
    AddWideAccessUsersToAllGroups,
}

/// Runs before anything touches GitLab.
pub const PRECONDITION: Rule = Rule::CheckMinimumUserCount;

/// Rules run after the platform view is built, in this order. Cleanup comes
/// before the additions so that evicted users are re-added at the right
/// level.
pub const PIPELINE: [Rule; 7] = [
    Rule::BlockOrUnblockUsers,
    Rule::CleanGroupsFromUnauthorizedUsers,
    Rule::AddAuthorizedUsersToGroups,
    Rule::PromoteUsersAsDeveloperToAllGroups,
    Rule::PromoteAdminUsers,
    Rule::PropagateOwnerUsersToAllGroups,
    Rule::AddWideAccessUsersToAllGroups,
];

impl Rule {
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Rule::CheckMinimumUserCount => "CheckMinimumUserCount",
            Rule::BlockOrUnblockUsers => "BlockOrUnblockUsers",
            Rule::CleanGroupsFromUnauthorizedUsers => "CleanGroupsFromUnauthorizedUsers",
            Rule::AddAuthorizedUsersToGroups => "AddAuthorizedUsersToGroups",
            Rule::PromoteUsersAsDeveloperToAllGroups => "PromoteUsersAsDeveloperToAllGroups",
            Rule::PromoteAdminUsers => "PromoteAdminUsers",
            Rule::PropagateOwnerUsersToAllGroups => "PropagateOwnerUsersToAllGroups",
            Rule::AddWideAccessUsersToAllGroups => "AddWideAccessUsersToAllGroups",
        }
    }

    /// Run the rule. Any error aborts the run.
    pub async fn apply(self, ctx: &RuleContext<'_>) -> SyncResult<RuleReport> {
        let mut report = RuleReport::new(self);
        match self {
            Rule::CheckMinimumUserCount => {
                check_minimum_user_count(ctx.directory, ctx.config.minimum_user_count)?;
            }
            Rule::BlockOrUnblockUsers => block_or_unblock_users::apply(ctx, &mut report).await?,
            Rule::CleanGroupsFromUnauthorizedUsers => clean_groups::apply(ctx, &mut report).await?,
            Rule::AddAuthorizedUsersToGroups => {
                add_authorized_users::apply(ctx, &mut report).await?;
            }
            Rule::PromoteUsersAsDeveloperToAllGroups => {
                promote_developers::apply(ctx, &mut report).await?;
            }
            Rule::PromoteAdminUsers => promote_admin_users::apply(ctx, &mut report).await?,
            Rule::PropagateOwnerUsersToAllGroups => propagate_owners::apply(ctx, &mut report).await?,
            Rule::AddWideAccessUsersToAllGroups => wide_access_users::apply(ctx, &mut report).await?,
        }
        Ok(report)
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Everything a rule reads from.
///
/// The platform view is built by the first rule that needs it and shared by
/// every later one, so the precondition runs before any GitLab call.
pub struct RuleContext<'a> {
    pub directory: &'a DirectoryTree,
    pub client: &'a CapabilityClient,
    pub filters: &'a ComplianceFilters,
    pub config: &'a SyncConfig,
    platform: OnceCell<PlatformView>,
}

impl<'a> RuleContext<'a> {
    #[must_use]
    pub fn new(
        directory: &'a DirectoryTree,
        client: &'a CapabilityClient,
        filters: &'a ComplianceFilters,
        config: &'a SyncConfig,
    ) -> Self {
        Self {
            directory,
            client,
            filters,
            config,
            platform: OnceCell::new(),
        }
    }

    /// In-scope GitLab groups, creating the missing ones on first call.
    pub async fn platform(&self) -> SyncResult<&PlatformView> {
        self.platform
            .get_or_try_init(|| PlatformView::build(self.directory, self.client, self.filters))
            .await
    }

    /// Fresh listing of GitLab users keyed by username.
    pub async fn users_by_name(&self) -> SyncResult<BTreeMap<String, User>> {
        Ok(self
            .client
            .list_users()
            .await?
            .into_iter()
            .map(|user| (user.username.clone(), user))
            .collect())
    }
}

/// Mutations a rule issued (or would have issued in dry-run).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleReport {
    pub rule: Rule,
    pub added: usize,
    pub removed: usize,
    pub regranted: usize,
    pub promoted: usize,
    pub blocked: usize,
    pub unblocked: usize,
    /// Decisions not to act: missing users, banned names, protected members.
    pub skipped: usize,
}

impl RuleReport {
    #[must_use]
    pub fn new(rule: Rule) -> Self {
        Self {
            rule,
            added: 0,
            removed: 0,
            regranted: 0,
            promoted: 0,
            blocked: 0,
            unblocked: 0,
            skipped: 0,
        }
    }

    pub(crate) fn record(&mut self, grant: Grant) {
        match grant {
            Grant::Added => self.added += 1,
            Grant::Regranted => self.regranted += 1,
            Grant::AlreadySatisfied => {}
        }
    }

    #[must_use]
    pub fn mutations(&self) -> usize {
        self.added + self.removed + self.regranted + self.promoted + self.blocked + self.unblocked
    }
}
