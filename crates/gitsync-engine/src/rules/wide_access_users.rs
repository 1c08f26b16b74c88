use gitsync_gitlab::{AccessLevel, User};
use tracing::{debug, info, warn};

use super::{RuleContext, RuleReport};
use crate::error::SyncResult;
use crate::filters::ExemptionKind;
use crate::membership::find_member;

/// Give wide-access users Reporter access to every group that is not
/// black-listed. Existing memberships are left as they are.
pub(super) async fn apply(ctx: &RuleContext<'_>, report: &mut RuleReport) -> SyncResult<()> {
    if ctx.filters.wide_access_users().next().is_none() {
        debug!("No wide-access user configured");
        return Ok(());
    }
    let users = ctx.users_by_name().await?;

    let mut readers: Vec<&User> = Vec::new();
    for username in ctx.filters.wide_access_users() {
        match users.get(username) {
            Some(user) => readers.push(user),
            None => {
                warn!(user = %username, "Wide-access user does not exist in GitLab");
                report.skipped += 1;
            }
        }
    }
    if readers.is_empty() {
        return Ok(());
    }

    for group in ctx.platform().await?.groups() {
        if ctx.filters.is_exempt(ExemptionKind::BlackListedGroup, &group.name) {
            debug!(group = %group.name, "Black-listed group skipped");
            continue;
        }
        let members = ctx.client.list_members(group).await?;
        for user in &readers {
            if find_member(&members, user).is_some() {
                debug!(user = %user.username, group = %group.name, "Wide-access user already a member");
                continue;
            }
            info!(user = %user.username, group = %group.name, "Adding wide-access user as reporter");
            ctx.client.add_member(group, user.id, AccessLevel::Reporter).await?;
            report.added += 1;
        }
    }
    Ok(())
}
