use gitsync_gitlab::AccessLevel;
use tracing::{debug, info};

use super::{RuleContext, RuleReport};
use crate::error::SyncResult;
use crate::membership::{ensure_access, find_member};

/// Give every directory member of a group Maintainer access to the GitLab
/// group of the same name.
pub(super) async fn apply(ctx: &RuleContext<'_>, report: &mut RuleReport) -> SyncResult<()> {
    let users = ctx.users_by_name().await?;
    info!(users = users.len(), "GitLab users");

    for group in ctx.platform().await?.groups() {
        let authorized = ctx.directory.members(&group.name);
        if authorized.is_empty() {
            debug!(group = %group.name, "No directory member");
            continue;
        }
        info!(group = %group.name, "Adding authorized users");
        let members = ctx.client.list_members(group).await?;

        for username in authorized.keys() {
            let Some(user) = users.get(username) else {
                info!(user = %username, group = %group.name, "User does not exist in GitLab");
                report.skipped += 1;
                continue;
            };
            if find_member(&members, user).is_none()
                && !ctx.filters.is_compliant_username(username)
            {
                info!(user = %username, group = %group.name, "Not adding banned user");
                report.skipped += 1;
                continue;
            }
            let grant = ensure_access(ctx.client, group, &members, user, AccessLevel::Maintainer).await?;
            report.record(grant);
        }
    }
    Ok(())
}
