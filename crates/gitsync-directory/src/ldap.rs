//! LDAP implementation of [`DirectorySource`].

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use ldap3::{Ldap, LdapConnAsync, LdapConnSettings, Scope, SearchEntry};
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};

use crate::config::LdapConfig;
use crate::error::{DirectoryError, DirectoryResult};
use crate::model::DirectoryUser;
use crate::source::DirectorySource;

/// LDAP result code for invalid credentials.
const RC_INVALID_CREDENTIALS: u32 = 49;

/// LDAP result code for a DN that does not exist.
const RC_NO_SUCH_OBJECT: u32 = 32;

/// Reads role-groups and their members from an LDAP server.
///
/// The connection is opened on first use and reused for the whole run.
pub struct LdapDirectory {
    config: LdapConfig,
    connection: Arc<RwLock<Option<Ldap>>>,
}

impl LdapDirectory {
    pub fn new(config: LdapConfig) -> DirectoryResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            connection: Arc::new(RwLock::new(None)),
        })
    }

    async fn get_connection(&self) -> DirectoryResult<Ldap> {
        {
            let guard = self.connection.read().await;
            if let Some(ref conn) = *guard {
                return Ok(conn.clone());
            }
        }

        let conn = self.create_connection().await?;
        *self.connection.write().await = Some(conn.clone());
        Ok(conn)
    }

    async fn create_connection(&self) -> DirectoryResult<Ldap> {
        let url = &self.config.url;
        debug!(url = %url, "Connecting to LDAP server");

        let settings = LdapConnSettings::new()
            .set_conn_timeout(Duration::from_secs(self.config.connection_timeout_secs))
            .set_starttls(self.config.use_starttls);

        let (conn, mut ldap) = LdapConnAsync::with_settings(settings, url)
            .await
            .map_err(|e| DirectoryError::Connection(format!("{url}: {e}")))?;

        tokio::spawn(async move {
            if let Err(e) = conn.drive().await {
                warn!(error = %e, "LDAP connection driver error");
            }
        });

        let bind_dn = &self.config.bind_dn;
        let bind_password = self.config.bind_password.as_deref().unwrap_or("");
        debug!(bind_dn = %bind_dn, "Performing LDAP bind");

        let result = ldap
            .simple_bind(bind_dn, bind_password)
            .await
            .map_err(|e| DirectoryError::Connection(format!("bind as {bind_dn}: {e}")))?;

        match result.rc {
            0 => {}
            RC_INVALID_CREDENTIALS => {
                return Err(DirectoryError::AuthenticationFailed {
                    bind_dn: bind_dn.clone(),
                })
            }
            rc => {
                return Err(DirectoryError::Connection(format!(
                    "bind failed with code {rc}: {}",
                    result.text
                )))
            }
        }

        info!(url = %url, "LDAP connection established");
        Ok(ldap)
    }

    /// Filter selecting the group entry named `name`.
    fn group_entry_filter(&self, name: &str) -> String {
        format!(
            "(&{}({}={}))",
            self.config.group_filter,
            self.config.group_name_attribute,
            escape_ldap_value(name)
        )
    }

    /// Read the member entry at `dn`; `Ok(None)` when it does not exist or
    /// lacks the identifier attribute.
    async fn read_member(&self, ldap: &mut Ldap, dn: &str) -> DirectoryResult<Option<DirectoryUser>> {
        let requested = self.config.requested_user_attributes();
        let result = ldap
            .search(dn, Scope::Base, "(objectClass=*)", requested.clone())
            .await?;

        if result.1.rc == RC_NO_SUCH_OBJECT {
            warn!(dn = %dn, "Member entry does not exist");
            return Ok(None);
        }
        let (entries, _) = result
            .success()
            .map_err(|e| DirectoryError::Search(format!("{dn}: {e}")))?;

        let Some(entry) = entries.into_iter().next().map(SearchEntry::construct) else {
            return Ok(None);
        };
        let attributes = entry_attributes(&entry, &requested);
        match DirectoryUser::from_attributes(&self.config.user_id_attribute, attributes) {
            Ok(user) => Ok(Some(user)),
            Err(e) => {
                warn!(dn = %dn, error = %e, "Member entry ignored");
                Ok(None)
            }
        }
    }
}

#[async_trait]
impl DirectorySource for LdapDirectory {
    #[instrument(skip(self), fields(base_dn = %self.config.base_dn))]
    async fn list_groups(&self) -> DirectoryResult<BTreeSet<String>> {
        let mut ldap = self.get_connection().await?;
        let name_attr = self.config.group_name_attribute.as_str();

        let (entries, _) = ldap
            .search(
                &self.config.base_dn,
                Scope::Subtree,
                &self.config.group_filter,
                vec![name_attr],
            )
            .await?
            .success()
            .map_err(|e| DirectoryError::Search(format!("group listing: {e}")))?;

        let groups: BTreeSet<String> = entries
            .into_iter()
            .map(SearchEntry::construct)
            .filter_map(|entry| first_value(&entry, name_attr).map(str::to_string))
            .collect();

        info!(count = groups.len(), "Directory groups retrieved");
        Ok(groups)
    }

    #[instrument(skip(self))]
    async fn list_members(&self, group: &str) -> DirectoryResult<BTreeMap<String, DirectoryUser>> {
        let mut members = BTreeMap::new();
        if group.trim().is_empty() {
            return Ok(members);
        }

        let mut ldap = self.get_connection().await?;
        let member_attr = self.config.member_attribute.as_str();
        let (entries, _) = ldap
            .search(
                &self.config.base_dn,
                Scope::Subtree,
                &self.group_entry_filter(group),
                vec![member_attr],
            )
            .await?
            .success()
            .map_err(|e| DirectoryError::Search(format!("group {group}: {e}")))?;

        let member_dns: Vec<String> = entries
            .into_iter()
            .map(SearchEntry::construct)
            .flat_map(|entry| all_values(&entry, member_attr))
            .collect();

        for dn in member_dns {
            if let Some(user) = self.read_member(&mut ldap, &dn).await? {
                debug!(group = %group, user = %user.id(), "Directory member");
                members.insert(user.id().to_string(), user);
            }
        }

        Ok(members)
    }
}

impl std::fmt::Debug for LdapDirectory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LdapDirectory")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Escape special characters in LDAP filter values (RFC 4515).
#[must_use]
pub fn escape_ldap_value(value: &str) -> String {
    value
        .replace('\\', "\\5c")
        .replace('*', "\\2a")
        .replace('(', "\\28")
        .replace(')', "\\29")
        .replace('\0', "\\00")
}

/// Value of the leading RDN of `dn` when its attribute is `attribute`,
/// e.g. `NAME` for `cn=NAME,ou=people` and `cn`.
#[must_use]
pub fn leading_rdn_value<'a>(dn: &'a str, attribute: &str) -> Option<&'a str> {
    let rdn = dn.split(',').next()?;
    let (attr, value) = rdn.split_once('=')?;
    let value = value.trim();
    (attr.trim().eq_ignore_ascii_case(attribute) && !value.is_empty()).then_some(value)
}

fn all_values(entry: &SearchEntry, attribute: &str) -> Vec<String> {
    entry
        .attrs
        .iter()
        .filter(|(name, _)| name.eq_ignore_ascii_case(attribute))
        .flat_map(|(_, values)| values.iter().cloned())
        .collect()
}

fn first_value<'a>(entry: &'a SearchEntry, attribute: &str) -> Option<&'a str> {
    entry
        .attrs
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(attribute))
        .and_then(|(_, values)| values.first())
        .map(String::as_str)
}

/// Single-valued view of the requested attributes, keyed by their configured
/// spelling.
fn entry_attributes(entry: &SearchEntry, requested: &[String]) -> BTreeMap<String, String> {
    requested
        .iter()
        .filter_map(|attr| first_value(entry, attr).map(|v| (attr.clone(), v.to_string())))
        .collect()
}
