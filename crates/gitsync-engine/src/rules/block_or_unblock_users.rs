use gitsync_directory::{leading_rdn_value, DirectoryTree, DirectoryUser};
use gitsync_gitlab::{User, UserState};
use tracing::{debug, info};

use super::{RuleContext, RuleReport};
use crate::error::SyncResult;

/// Align the blocked state of directory-backed GitLab accounts with the
/// login-disabled flag of the directory.
pub(super) async fn apply(ctx: &RuleContext<'_>, report: &mut RuleReport) -> SyncResult<()> {
    let provider = ctx.config.ldap_provider.as_str();
    let disabled_attribute = ctx.config.login_disabled_attribute.as_str();
    let platform = ctx.platform().await?;

    // Keyed by username, so already sorted.
    for user in ctx.users_by_name().await?.into_values() {
        let Some(identity) = user.identity(provider) else {
            continue;
        };
        if ctx.filters.is_cleanup_exempt_user(&user.username)
            || platform.is_technical_account(user.id)
        {
            debug!(user = %user.username, "Exempt from block/unblock");
            report.skipped += 1;
            continue;
        }
        if user.state == UserState::LdapBlocked {
            debug!(user = %user.username, "Blocked by GitLab LDAP sync, left untouched");
            report.skipped += 1;
            continue;
        }

        let directory_user = find_directory_user(ctx.directory, &user, &identity.extern_uid);
        let directory_active = is_directory_active(directory_user, disabled_attribute);
        let platform_active = user.state != UserState::Blocked;

        match (directory_active, platform_active) {
            (true, false) => {
                info!(user = %user.username, "Unblocking user");
                ctx.client.unblock_user(&user).await?;
                report.unblocked += 1;
            }
            (false, true) => {
                info!(user = %user.username, found = directory_user.is_some(), "Blocking user");
                ctx.client.block_user(&user).await?;
                report.blocked += 1;
            }
            _ => debug!(user = %user.username, active = platform_active, "User state already aligned"),
        }
    }
    Ok(())
}

/// Look the user up by username, then by the `cn` of its external identity.
fn find_directory_user<'a>(
    directory: &'a DirectoryTree,
    user: &User,
    extern_uid: &str,
) -> Option<&'a DirectoryUser> {
    directory.find_user_ignore_case(&user.username).or_else(|| {
        leading_rdn_value(extern_uid, "cn").and_then(|cn| directory.find_user_ignore_case(cn))
    })
}

/// A user absent from the directory is inactive; a missing flag means active.
fn is_directory_active(user: Option<&DirectoryUser>, disabled_attribute: &str) -> bool {
    user.is_some_and(|u| {
        !u.attribute(disabled_attribute)
            .is_some_and(|v| v.trim().eq_ignore_ascii_case("true"))
    })
}
