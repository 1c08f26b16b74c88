use tracing::{debug, info};

use super::{RuleContext, RuleReport};
use crate::error::SyncResult;

/// Make every member of the directory admin group a GitLab administrator.
pub(super) async fn apply(ctx: &RuleContext<'_>, report: &mut RuleReport) -> SyncResult<()> {
    let Some(admin_group) = ctx.filters.admin_group() else {
        info!("No admin group configured");
        return Ok(());
    };
    let users = ctx.users_by_name().await?;

    for username in ctx.directory.members(admin_group).keys() {
        match users.get(username) {
            None => {
                info!(user = %username, group = %admin_group, "Admin does not exist in GitLab");
                report.skipped += 1;
            }
            Some(user) if user.is_admin => {
                debug!(user = %username, "Already a GitLab administrator");
            }
            Some(user) => {
                info!(user = %username, "Promoting user to GitLab administrator");
                ctx.client.promote_to_admin(user).await?;
                report.promoted += 1;
            }
        }
    }
    Ok(())
}
