//! Raise-only access grants shared by the rules.

use gitsync_gitlab::{AccessLevel, CapabilityClient, Group, Member, User};
use tracing::{debug, info};

use crate::error::SyncResult;

/// What [`ensure_access`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Grant {
    Added,
    /// Removed then re-added at a higher level.
    Regranted,
    AlreadySatisfied,
}

#[must_use]
pub fn find_member<'a>(members: &'a [Member], user: &User) -> Option<&'a Member> {
    members.iter().find(|m| m.id == user.id)
}

/// Make `user` a member of `group` with at least `level`.
///
/// `members` is the current membership of `group`. Access is never lowered:
/// a member already at or above `level` is left alone.
pub async fn ensure_access(
    client: &CapabilityClient,
    group: &Group,
    members: &[Member],
    user: &User,
    level: AccessLevel,
) -> SyncResult<Grant> {
    match find_member(members, user) {
        None => {
            info!(user = %user.username, group = %group.name, access_level = %level, "Adding user to group");
            client.add_member(group, user.id, level).await?;
            Ok(Grant::Added)
        }
        Some(member) if member.access_level < level => {
            info!(
                user = %user.username,
                group = %group.name,
                from = %member.access_level,
                to = %level,
                "Raising access level"
            );
            client.remove_member(group, user.id).await?;
            client.add_member(group, user.id, level).await?;
            Ok(Grant::Regranted)
        }
        Some(member) => {
            debug!(
                user = %user.username,
                group = %group.name,
                access_level = %member.access_level,
                "Access level already satisfied"
            );
            Ok(Grant::AlreadySatisfied)
        }
    }
}
