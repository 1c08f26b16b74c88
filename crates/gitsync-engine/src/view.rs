//! The GitLab groups a run works on.

use gitsync_directory::DirectoryTree;
use gitsync_gitlab::{CapabilityClient, Group, User};
use tracing::{debug, info};

use crate::error::SyncResult;
use crate::filters::{ComplianceFilters, ExemptionKind};

/// In-scope GitLab groups, i.e. top-level groups named after a directory
/// group, sorted by name, plus the account driving the run.
///
/// Memberships are not part of the view; rules read them when needed.
#[derive(Debug, Clone)]
pub struct PlatformView {
    groups: Vec<Group>,
    technical_account: User,
}

impl PlatformView {
    #[must_use]
    pub fn new(mut groups: Vec<Group>, technical_account: User) -> Self {
        groups.sort_by(|a, b| a.name.cmp(&b.name));
        Self {
            groups,
            technical_account,
        }
    }

    /// Create the GitLab groups missing for standard directory groups, then
    /// snapshot the in-scope groups.
    ///
    /// The admin group never gets a GitLab group of its own.
    pub async fn build(
        directory: &DirectoryTree,
        client: &CapabilityClient,
        filters: &ComplianceFilters,
    ) -> SyncResult<Self> {
        let technical_account = client.current_user().await?;
        info!(user = %technical_account.username, "Technical account");

        for group in directory.groups() {
            let name = group.name();
            if filters.is_exempt(ExemptionKind::AdminGroup, name) {
                debug!(group = %name, "Admin group is not mirrored in GitLab");
                continue;
            }
            if !filters.is_standard_group_name(name) {
                debug!(group = %name, "Non-standard group is not created");
                continue;
            }
            if client.get_group(name).await?.is_none() {
                info!(group = %name, "Creating GitLab group");
                client.create_group(name).await?;
            }
        }

        let groups: Vec<Group> = client
            .list_groups()
            .await?
            .into_iter()
            .filter(is_top_level)
            .filter(|g| directory.contains_group(&g.name))
            .collect();
        info!(groups = groups.len(), "GitLab groups in scope");

        Ok(Self::new(groups, technical_account))
    }

    /// In-scope groups in name order.
    #[must_use]
    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    #[must_use]
    pub fn is_technical_account(&self, user_id: u64) -> bool {
        self.technical_account.id == user_id
    }
}

fn is_top_level(group: &Group) -> bool {
    group.full_path.is_empty() || !group.full_path.contains('/')
}
