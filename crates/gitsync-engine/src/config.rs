//! Reconciliation settings.

use std::time::Duration;

use gitsync_gitlab::{AccessLevel, RetryPolicy};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{SyncError, SyncResult};

/// Settings driving one reconciliation run.
///
/// Name lists accept either a YAML sequence or a comma-separated string.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Below this number of distinct directory users the run aborts.
    #[serde(default = "default_minimum_user_count")]
    pub minimum_user_count: usize,

    /// Directory group whose members become GitLab administrators.
    #[serde(default)]
    pub admin_group: Option<String>,

    /// Directory group whose members own every standard group.
    #[serde(default)]
    pub owner_group: Option<String>,

    #[serde(default, deserialize_with = "name_list")]
    pub black_listed_groups: Vec<String>,

    #[serde(default, deserialize_with = "name_list")]
    pub limited_access_groups: Vec<String>,

    #[serde(default, deserialize_with = "name_list")]
    pub wide_access_users: Vec<String>,

    #[serde(default, deserialize_with = "name_list")]
    pub not_to_clean_users: Vec<String>,

    #[serde(default = "default_pattern")]
    pub standard_groups_pattern: String,

    #[serde(default = "default_pattern")]
    pub standard_group_users_pattern: String,

    /// Total attempts per remote call, first one included.
    #[serde(default = "default_retry_max_attempts")]
    pub retry_max_attempts: u32,

    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    #[serde(default)]
    pub dry_run: bool,

    #[serde(default)]
    pub removal_threshold: RemovalThreshold,

    /// GitLab identity provider of directory-backed accounts.
    #[serde(default = "default_ldap_provider")]
    pub ldap_provider: String,

    /// Directory attribute holding `true` when the account is disabled.
    #[serde(default = "default_login_disabled_attribute")]
    pub login_disabled_attribute: String,
}

/// Lowest access level at which a member absent from the directory group is
/// removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RemovalThreshold {
    #[default]
    Maintainer,
    Any,
}

impl RemovalThreshold {
    #[must_use]
    pub fn covers(self, level: AccessLevel) -> bool {
        match self {
            Self::Maintainer => level >= AccessLevel::Maintainer,
            Self::Any => true,
        }
    }
}

fn default_minimum_user_count() -> usize {
    5
}

fn default_pattern() -> String {
    "[A-Za-z0-9_-]".to_string()
}

fn default_retry_max_attempts() -> u32 {
    3
}

fn default_retry_backoff_ms() -> u64 {
    5000
}

fn default_ldap_provider() -> String {
    "ldapmain".to_string()
}

fn default_login_disabled_attribute() -> String {
    "loginDisabled".to_string()
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NameList {
    List(Vec<String>),
    Csv(String),
}

fn name_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = match Option::<NameList>::deserialize(deserializer)? {
        None => return Ok(Vec::new()),
        Some(NameList::List(items)) => items,
        Some(NameList::Csv(csv)) => csv.split(',').map(str::to_string).collect(),
    };
    Ok(raw
        .into_iter()
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .collect())
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            minimum_user_count: default_minimum_user_count(),
            admin_group: None,
            owner_group: None,
            black_listed_groups: Vec::new(),
            limited_access_groups: Vec::new(),
            wide_access_users: Vec::new(),
            not_to_clean_users: Vec::new(),
            standard_groups_pattern: default_pattern(),
            standard_group_users_pattern: default_pattern(),
            retry_max_attempts: default_retry_max_attempts(),
            retry_backoff_ms: default_retry_backoff_ms(),
            dry_run: false,
            removal_threshold: RemovalThreshold::default(),
            ldap_provider: default_ldap_provider(),
            login_disabled_attribute: default_login_disabled_attribute(),
        }
    }
}

impl SyncConfig {
    /// Configured admin group, blank values meaning none.
    #[must_use]
    pub fn admin_group(&self) -> Option<&str> {
        non_blank(self.admin_group.as_deref())
    }

    /// Configured owner group, blank values meaning none.
    #[must_use]
    pub fn owner_group(&self) -> Option<&str> {
        non_blank(self.owner_group.as_deref())
    }

    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.retry_max_attempts,
            Duration::from_millis(self.retry_backoff_ms),
        )
    }

    pub fn validate(&self) -> SyncResult<()> {
        if self.retry_max_attempts == 0 {
            return Err(SyncError::Config(
                "retry_max_attempts must be at least 1".into(),
            ));
        }
        if self.ldap_provider.trim().is_empty() {
            return Err(SyncError::Config("ldap_provider is required".into()));
        }
        if self.login_disabled_attribute.trim().is_empty() {
            return Err(SyncError::Config(
                "login_disabled_attribute is required".into(),
            ));
        }
        Ok(())
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
