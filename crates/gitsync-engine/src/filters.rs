//! Name predicates derived from the settings.

use std::collections::BTreeSet;

use regex::Regex;

use crate::config::SyncConfig;
use crate::error::{SyncError, SyncResult};

/// Category of configured exemption.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExemptionKind {
    AdminGroup,
    OwnerGroup,
    BlackListedGroup,
    LimitedAccessGroup,
    WideAccessUser,
    NotToCleanUser,
}

/// Pure predicates over group names and usernames.
///
/// Patterns match at the start of the name, so the default `[A-Za-z0-9_-]`
/// only requires the first character to be one of those.
#[derive(Debug, Clone)]
pub struct ComplianceFilters {
    standard_groups: Regex,
    standard_users: Regex,
    admin_group: Option<String>,
    owner_group: Option<String>,
    black_listed_groups: BTreeSet<String>,
    limited_access_groups: BTreeSet<String>,
    wide_access_users: BTreeSet<String>,
    not_to_clean_users: BTreeSet<String>,
}

impl ComplianceFilters {
    pub fn new(config: &SyncConfig) -> SyncResult<Self> {
        Ok(Self {
            standard_groups: prefix_regex("standard_groups_pattern", &config.standard_groups_pattern)?,
            standard_users: prefix_regex(
                "standard_group_users_pattern",
                &config.standard_group_users_pattern,
            )?,
            admin_group: config.admin_group().map(str::to_string),
            owner_group: config.owner_group().map(str::to_string),
            black_listed_groups: config.black_listed_groups.iter().cloned().collect(),
            limited_access_groups: config.limited_access_groups.iter().cloned().collect(),
            wide_access_users: config.wide_access_users.iter().cloned().collect(),
            not_to_clean_users: config.not_to_clean_users.iter().cloned().collect(),
        })
    }

    #[must_use]
    pub fn is_standard_group_name(&self, name: &str) -> bool {
        self.standard_groups.is_match(name)
    }

    #[must_use]
    pub fn is_compliant_username(&self, name: &str) -> bool {
        self.standard_users.is_match(name)
    }

    #[must_use]
    pub fn is_exempt(&self, kind: ExemptionKind, name: &str) -> bool {
        match kind {
            ExemptionKind::AdminGroup => self.admin_group.as_deref() == Some(name),
            ExemptionKind::OwnerGroup => self.owner_group.as_deref() == Some(name),
            ExemptionKind::BlackListedGroup => self.black_listed_groups.contains(name),
            ExemptionKind::LimitedAccessGroup => self.limited_access_groups.contains(name),
            ExemptionKind::WideAccessUser => self.wide_access_users.contains(name),
            ExemptionKind::NotToCleanUser => self.not_to_clean_users.contains(name),
        }
    }

    /// Wide-access or not-to-clean.
    #[must_use]
    pub fn is_cleanup_exempt_user(&self, username: &str) -> bool {
        self.is_exempt(ExemptionKind::WideAccessUser, username)
            || self.is_exempt(ExemptionKind::NotToCleanUser, username)
    }

    #[must_use]
    pub fn admin_group(&self) -> Option<&str> {
        self.admin_group.as_deref()
    }

    #[must_use]
    pub fn owner_group(&self) -> Option<&str> {
        self.owner_group.as_deref()
    }

    /// Wide-access usernames in name order.
    pub fn wide_access_users(&self) -> impl Iterator<Item = &str> {
        self.wide_access_users.iter().map(String::as_str)
    }

    /// Whether a directory group belongs in the tree: standard, or one of
    /// the admin and owner groups.
    #[must_use]
    pub fn is_directory_group_in_scope(&self, name: &str) -> bool {
        self.is_standard_group_name(name)
            || self.is_exempt(ExemptionKind::AdminGroup, name)
            || self.is_exempt(ExemptionKind::OwnerGroup, name)
    }
}

fn prefix_regex(key: &str, pattern: &str) -> SyncResult<Regex> {
    Regex::new(&format!("^(?:{pattern})"))
        .map_err(|e| SyncError::Config(format!("{key} is not a valid regex: {e}")))
}
