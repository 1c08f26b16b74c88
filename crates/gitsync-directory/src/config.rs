//! LDAP directory configuration.

use serde::{Deserialize, Serialize};

use crate::error::{DirectoryError, DirectoryResult};

/// Connection and schema settings of the LDAP directory.
///
/// Role-groups are entries under `base_dn` matching `group_filter`; their
/// `member_attribute` values are the DNs of the member entries.
#[derive(Clone, Serialize, Deserialize)]
pub struct LdapConfig {
    /// Server URL, `ldap://host:389` or `ldaps://host:636`.
    pub url: String,

    /// Upgrade a plain `ldap://` connection with STARTTLS.
    #[serde(default)]
    pub use_starttls: bool,

    /// Bind DN; an empty value performs an anonymous bind.
    #[serde(default)]
    pub bind_dn: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bind_password: Option<String>,

    /// Subtree holding the role-groups.
    pub base_dn: String,

    #[serde(default = "default_group_filter")]
    pub group_filter: String,

    #[serde(default = "default_group_name_attribute")]
    pub group_name_attribute: String,

    #[serde(default = "default_member_attribute")]
    pub member_attribute: String,

    /// Attribute identifying a user; becomes the directory user identifier.
    #[serde(default = "default_user_id_attribute")]
    pub user_id_attribute: String,

    /// Attributes read from each member entry.
    #[serde(default = "default_user_attributes")]
    pub user_attributes: Vec<String>,

    #[serde(default = "default_connection_timeout_secs")]
    pub connection_timeout_secs: u64,
}

impl std::fmt::Debug for LdapConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LdapConfig")
            .field("url", &self.url)
            .field("use_starttls", &self.use_starttls)
            .field("bind_dn", &self.bind_dn)
            .field(
                "bind_password",
                &self.bind_password.as_ref().map(|_| "***REDACTED***"),
            )
            .field("base_dn", &self.base_dn)
            .field("group_filter", &self.group_filter)
            .field("group_name_attribute", &self.group_name_attribute)
            .field("member_attribute", &self.member_attribute)
            .field("user_id_attribute", &self.user_id_attribute)
            .field("user_attributes", &self.user_attributes)
            .field("connection_timeout_secs", &self.connection_timeout_secs)
            .finish()
    }
}

fn default_group_filter() -> String {
    "(objectClass=groupOfNames)".to_string()
}

fn default_group_name_attribute() -> String {
    "cn".to_string()
}

fn default_member_attribute() -> String {
    "member".to_string()
}

fn default_user_id_attribute() -> String {
    "cn".to_string()
}

fn default_user_attributes() -> Vec<String> {
    vec!["cn".to_string(), "loginDisabled".to_string()]
}

fn default_connection_timeout_secs() -> u64 {
    10
}

impl LdapConfig {
    /// Create a config with default schema settings.
    pub fn new(url: impl Into<String>, base_dn: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            use_starttls: false,
            bind_dn: String::new(),
            bind_password: None,
            base_dn: base_dn.into(),
            group_filter: default_group_filter(),
            group_name_attribute: default_group_name_attribute(),
            member_attribute: default_member_attribute(),
            user_id_attribute: default_user_id_attribute(),
            user_attributes: default_user_attributes(),
            connection_timeout_secs: default_connection_timeout_secs(),
        }
    }

    #[must_use]
    pub fn with_bind(mut self, bind_dn: impl Into<String>, password: impl Into<String>) -> Self {
        self.bind_dn = bind_dn.into();
        self.bind_password = Some(password.into());
        self
    }

    /// Attributes to request for member entries; always includes the
    /// identifier attribute.
    #[must_use]
    pub fn requested_user_attributes(&self) -> Vec<String> {
        let mut attrs = self.user_attributes.clone();
        if !attrs.iter().any(|a| a.eq_ignore_ascii_case(&self.user_id_attribute)) {
            attrs.push(self.user_id_attribute.clone());
        }
        attrs
    }

    pub fn validate(&self) -> DirectoryResult<()> {
        if !(self.url.starts_with("ldap://") || self.url.starts_with("ldaps://")) {
            return Err(DirectoryError::InvalidConfig(format!(
                "url must start with ldap:// or ldaps://, got '{}'",
                self.url
            )));
        }
        if self.use_starttls && self.url.starts_with("ldaps://") {
            return Err(DirectoryError::InvalidConfig(
                "use_starttls cannot be combined with ldaps://".into(),
            ));
        }
        if self.base_dn.trim().is_empty() {
            return Err(DirectoryError::InvalidConfig("base_dn is required".into()));
        }
        for (name, value) in [
            ("group_filter", &self.group_filter),
            ("group_name_attribute", &self.group_name_attribute),
            ("member_attribute", &self.member_attribute),
            ("user_id_attribute", &self.user_id_attribute),
        ] {
            if value.trim().is_empty() {
                return Err(DirectoryError::InvalidConfig(format!("{name} is required")));
            }
        }
        if !self.group_filter.starts_with('(') || !self.group_filter.ends_with(')') {
            return Err(DirectoryError::InvalidConfig(format!(
                "group_filter must be parenthesized, got '{}'",
                self.group_filter
            )));
        }
        if self.connection_timeout_secs == 0 {
            return Err(DirectoryError::InvalidConfig(
                "connection_timeout_secs must be positive".into(),
            ));
        }
        Ok(())
    }
}
