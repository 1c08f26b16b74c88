//! Immutable snapshot of the directory.

use std::collections::BTreeMap;

use crate::model::{DirectoryGroup, DirectoryUser};

/// Members of a group, keyed by user identifier.
pub type Members = BTreeMap<String, DirectoryUser>;

static EMPTY_MEMBERS: Members = BTreeMap::new();

/// Role-groups and their members, read once per run.
///
/// Every group present has a (possibly empty) member mapping. Looking up an
/// unknown or blank group name yields an empty mapping.
#[derive(Debug, Clone, Default)]
pub struct DirectoryTree {
    groups: BTreeMap<DirectoryGroup, Members>,
}

impl DirectoryTree {
    #[must_use]
    pub fn builder() -> DirectoryTreeBuilder {
        DirectoryTreeBuilder::default()
    }

    /// Groups in name order.
    pub fn groups(&self) -> impl Iterator<Item = &DirectoryGroup> {
        self.groups.keys()
    }

    #[must_use]
    pub fn contains_group(&self, name: &str) -> bool {
        self.groups.contains_key(name)
    }

    #[must_use]
    pub fn members(&self, name: &str) -> &Members {
        self.groups.get(name).unwrap_or(&EMPTY_MEMBERS)
    }

    #[must_use]
    pub fn is_member(&self, group: &str, user_id: &str) -> bool {
        self.members(group).contains_key(user_id)
    }

    /// Union of the members of every group, keyed by identifier.
    #[must_use]
    pub fn all_users(&self) -> BTreeMap<&str, &DirectoryUser> {
        self.groups
            .values()
            .flat_map(|members| members.values())
            .map(|user| (user.id(), user))
            .collect()
    }

    /// Number of distinct users across all groups.
    #[must_use]
    pub fn user_count(&self) -> usize {
        self.all_users().len()
    }

    /// First user, in identifier order, whose identifier equals `id` ignoring
    /// ASCII case.
    #[must_use]
    pub fn find_user_ignore_case(&self, id: &str) -> Option<&DirectoryUser> {
        self.groups
            .values()
            .flat_map(|members| members.values())
            .filter(|user| user.id().eq_ignore_ascii_case(id))
            .min_by(|a, b| a.id().cmp(b.id()))
    }

    #[must_use]
    pub fn group_count(&self) -> usize {
        self.groups.len()
    }
}

/// Incremental construction of a [`DirectoryTree`].
#[derive(Debug, Default)]
pub struct DirectoryTreeBuilder {
    groups: BTreeMap<DirectoryGroup, Members>,
}

impl DirectoryTreeBuilder {
    /// Register a group with no member yet. Existing members are kept.
    pub fn group(&mut self, group: DirectoryGroup) -> &mut Members {
        self.groups.entry(group).or_default()
    }

    /// Register `user` as a member of `group`.
    pub fn member(&mut self, group: DirectoryGroup, user: DirectoryUser) {
        self.group(group).insert(user.id().to_string(), user);
    }

    /// Chaining variant of [`Self::member`] for hand-written trees.
    #[must_use]
    pub fn with_member(mut self, group: DirectoryGroup, user: DirectoryUser) -> Self {
        self.member(group, user);
        self
    }

    #[must_use]
    pub fn with_group(mut self, group: DirectoryGroup) -> Self {
        self.group(group);
        self
    }

    #[must_use]
    pub fn build(self) -> DirectoryTree {
        DirectoryTree {
            groups: self.groups,
        }
    }
}
