use gitsync_gitlab::{Group, Member, User};
use std::collections::BTreeMap;
use tracing::{debug, info};

use super::{RuleContext, RuleReport};
use crate::error::SyncResult;
use crate::view::PlatformView;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Decision {
    Keep(Keep),
    Remove { banned: bool },
}

/// Why a member stays in a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Keep {
    TechnicalAccount,
    GlobalAdmin,
    InDirectoryGroup,
    DirectoryAdminOrOwner,
    Exempt,
    BelowThreshold,
}

/// Remove banned usernames everywhere, and members absent from the matching
/// directory group.
pub(super) async fn apply(ctx: &RuleContext<'_>, report: &mut RuleReport) -> SyncResult<()> {
    let users = ctx.users_by_name().await?;
    let platform = ctx.platform().await?;

    for group in platform.groups() {
        info!(group = %group.name, "Cleaning group");
        let mut members = ctx.client.list_members(group).await?;
        members.sort_by(|a, b| a.username.cmp(&b.username));

        for member in &members {
            match decide(ctx, platform, &users, group, member) {
                Decision::Keep(reason) => {
                    debug!(user = %member.username, group = %group.name, reason = ?reason, "Member kept");
                    if reason != Keep::InDirectoryGroup {
                        report.skipped += 1;
                    }
                }
                Decision::Remove { banned } => {
                    if banned {
                        info!(user = %member.username, group = %group.name, "Removing banned user from group");
                    } else {
                        info!(
                            user = %member.username,
                            group = %group.name,
                            access_level = %member.access_level,
                            "Removing unauthorized user from group"
                        );
                    }
                    ctx.client.remove_member(group, member.id).await?;
                    report.removed += 1;
                }
            }
        }
    }
    Ok(())
}

fn decide(
    ctx: &RuleContext<'_>,
    platform: &PlatformView,
    users: &BTreeMap<String, User>,
    group: &Group,
    member: &Member,
) -> Decision {
    let username = member.username.as_str();

    if platform.is_technical_account(member.id) {
        return Decision::Keep(Keep::TechnicalAccount);
    }
    if users.get(username).is_some_and(|u| u.is_admin) {
        return Decision::Keep(Keep::GlobalAdmin);
    }
    if !ctx.filters.is_compliant_username(username) {
        return Decision::Remove { banned: true };
    }
    if ctx.directory.is_member(&group.name, username) {
        return Decision::Keep(Keep::InDirectoryGroup);
    }
    let privileged_group = [ctx.filters.admin_group(), ctx.filters.owner_group()]
        .into_iter()
        .flatten()
        .any(|g| ctx.directory.is_member(g, username));
    if privileged_group {
        return Decision::Keep(Keep::DirectoryAdminOrOwner);
    }
    if ctx.filters.is_cleanup_exempt_user(username) {
        return Decision::Keep(Keep::Exempt);
    }
    if !ctx.config.removal_threshold.covers(member.access_level) {
        return Decision::Keep(Keep::BelowThreshold);
    }
    Decision::Remove { banned: false }
}
