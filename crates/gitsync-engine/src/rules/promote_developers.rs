use gitsync_gitlab::AccessLevel;
use tracing::{debug, info};

use super::{RuleContext, RuleReport};
use crate::error::SyncResult;
use crate::filters::ExemptionKind;
use crate::membership::ensure_access;

/// Give every directory user at least Developer access to every standard
/// group that is not limited-access.
pub(super) async fn apply(ctx: &RuleContext<'_>, report: &mut RuleReport) -> SyncResult<()> {
    let users = ctx.users_by_name().await?;

    let developers: Vec<_> = ctx
        .directory
        .all_users()
        .into_keys()
        .filter(|id| ctx.filters.is_compliant_username(id))
        .filter_map(|id| users.get(id))
        .collect();
    info!(developers = developers.len(), "Directory users existing in GitLab");

    for group in ctx.platform().await?.groups() {
        if !ctx.filters.is_standard_group_name(&group.name)
            || ctx.filters.is_exempt(ExemptionKind::LimitedAccessGroup, &group.name)
        {
            debug!(group = %group.name, "Group excluded from developer promotion");
            continue;
        }
        let members = ctx.client.list_members(group).await?;
        for user in &developers {
            let grant = ensure_access(ctx.client, group, &members, user, AccessLevel::Developer).await?;
            report.record(grant);
        }
    }
    Ok(())
}
