use gitsync_gitlab::{AccessLevel, User};
use tracing::{debug, info};

use super::{RuleContext, RuleReport};
use crate::error::SyncResult;
use crate::filters::ExemptionKind;
use crate::membership::ensure_access;

/// Give every member of the directory owner group Owner access to every
/// standard group that is not black-listed.
pub(super) async fn apply(ctx: &RuleContext<'_>, report: &mut RuleReport) -> SyncResult<()> {
    let Some(owner_group) = ctx.filters.owner_group() else {
        info!("No owner group configured");
        return Ok(());
    };
    if !ctx.directory.contains_group(owner_group) {
        info!(group = %owner_group, "Owner group not found in the directory");
        return Ok(());
    }
    let users = ctx.users_by_name().await?;

    let mut owners: Vec<&User> = Vec::new();
    for username in ctx.directory.members(owner_group).keys() {
        match users.get(username) {
            None => {
                info!(user = %username, "Owner does not exist in GitLab");
                report.skipped += 1;
            }
            Some(user) if user.is_admin => {
                info!(user = %username, "Owner is a GitLab administrator, no grant needed");
                report.skipped += 1;
            }
            Some(user) => owners.push(user),
        }
    }

    for group in ctx.platform().await?.groups() {
        if !ctx.filters.is_standard_group_name(&group.name)
            || ctx.filters.is_exempt(ExemptionKind::BlackListedGroup, &group.name)
        {
            debug!(group = %group.name, "Group excluded from owner propagation");
            continue;
        }
        let members = ctx.client.list_members(group).await?;
        for user in &owners {
            let grant = ensure_access(ctx.client, group, &members, user, AccessLevel::Owner).await?;
            report.record(grant);
        }
    }
    Ok(())
}
