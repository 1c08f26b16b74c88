//! The seam between the engine and a concrete directory.

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use tracing::{debug, info};

use crate::error::DirectoryResult;
use crate::model::{DirectoryGroup, DirectoryUser};
use crate::tree::DirectoryTree;

/// Read access to the role-groups of a directory.
#[async_trait]
pub trait DirectorySource: Send + Sync {
    /// Names of every role-group.
    async fn list_groups(&self) -> DirectoryResult<BTreeSet<String>>;

    /// Members of `group`, keyed by identifier. A blank or unknown group
    /// yields an empty mapping.
    async fn list_members(&self, group: &str) -> DirectoryResult<BTreeMap<String, DirectoryUser>>;
}

/// Build a [`DirectoryTree`] from the groups of `source` accepted by `keep`.
///
/// Any failure of the source aborts the build.
pub async fn build_tree<S, F>(source: &S, mut keep: F) -> DirectoryResult<DirectoryTree>
where
    S: DirectorySource + ?Sized,
    F: FnMut(&str) -> bool,
{
    let mut builder = DirectoryTree::builder();

    for name in source.list_groups().await? {
        if !keep(&name) {
            debug!(group = %name, "Directory group ignored");
            continue;
        }
        let group = match DirectoryGroup::new(name) {
            Ok(group) => group,
            Err(_) => continue,
        };

        info!(group = %group, "Retrieving members of directory group");
        let members = source.list_members(group.name()).await?;
        let slot = builder.group(group);
        for (id, user) in members {
            debug!(user = %id, "Directory member");
            slot.insert(id, user);
        }
    }

    let tree = builder.build();
    info!(
        groups = tree.group_count(),
        users = tree.user_count(),
        "Directory tree built"
    );
    Ok(tree)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DirectoryError;

    struct StaticSource {
        groups: Vec<(&'static str, Vec<&'static str>)>,
        failing_group: Option<&'static str>,
    }

    #[async_trait]
    impl DirectorySource for StaticSource {
        async fn list_groups(&self) -> DirectoryResult<BTreeSet<String>> {
            Ok(self.groups.iter().map(|(g, _)| g.to_string()).collect())
        }

        async fn list_members(
            &self,
            group: &str,
        ) -> DirectoryResult<BTreeMap<String, DirectoryUser>> {
            if self.failing_group == Some(group) {
                return Err(DirectoryError::Search("timeout".into()));
            }
            Ok(self
                .groups
                .iter()
                .filter(|(g, _)| *g == group)
                .flat_map(|(_, users)| users.iter())
                .map(|u| (u.to_string(), DirectoryUser::with_cn(*u)))
                .collect())
        }
    }

    fn source() -> StaticSource {
        StaticSource {
            groups: vec![
                ("role-a", vec!["alice", "bob"]),
                ("role b", vec!["carol"]),
                ("ADMIN", vec!["dave"]),
            ],
            failing_group: None,
        }
    }

    #[tokio::test]
    async fn test_build_tree_applies_filter() {
        let tree = build_tree(&source(), |name| !name.contains(' ')).await.unwrap();

        assert!(tree.contains_group("role-a"));
        assert!(tree.contains_group("ADMIN"));
        assert!(!tree.contains_group("role b"));
        assert_eq!(tree.user_count(), 3);
    }

    #[tokio::test]
    async fn test_member_lookup_failure_aborts() {
        let mut source = source();
        source.failing_group = Some("role-a");

        let result = build_tree(&source, |_| true).await;
        assert!(matches!(result, Err(DirectoryError::Search(_))));
    }
}
