//! GitLab REST v4 resource models (subset used by gitsync).

use serde::{Deserialize, Serialize};
use std::fmt;

/// Access level of a group member.
///
/// Levels are totally ordered: `Guest < Reporter < Developer < Maintainer <
/// Owner`. Values GitLab may add between known levels map down to the
/// closest known level below them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "u32", into = "u32")]
pub enum AccessLevel {
    NoAccess,
    MinimalAccess,
    Guest,
    Reporter,
    Developer,
    Maintainer,
    Owner,
    Admin,
}

impl AccessLevel {
    /// Numeric value used on the wire.
    #[must_use]
    pub fn value(self) -> u32 {
        match self {
            Self::NoAccess => 0,
            Self::MinimalAccess => 5,
            Self::Guest => 10,
            Self::Reporter => 20,
            Self::Developer => 30,
            Self::Maintainer => 40,
            Self::Owner => 50,
            Self::Admin => 60,
        }
    }
}

impl From<u32> for AccessLevel {
    fn from(value: u32) -> Self {
        match value {
            v if v >= 60 => Self::Admin,
            50..=59 => Self::Owner,
            40..=49 => Self::Maintainer,
            30..=39 => Self::Developer,
            20..=29 => Self::Reporter,
            10..=19 => Self::Guest,
            5..=9 => Self::MinimalAccess,
            _ => Self::NoAccess,
        }
    }
}

impl From<AccessLevel> for u32 {
    fn from(level: AccessLevel) -> Self {
        level.value()
    }
}

impl fmt::Display for AccessLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::NoAccess => "no access",
            Self::MinimalAccess => "minimal access",
            Self::Guest => "guest",
            Self::Reporter => "reporter",
            Self::Developer => "developer",
            Self::Maintainer => "maintainer",
            Self::Owner => "owner",
            Self::Admin => "admin",
        };
        f.write_str(name)
    }
}

/// A GitLab group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: u64,
    pub name: String,
    pub path: String,
    #[serde(default)]
    pub full_path: String,
}

/// Request body for `POST /groups`.
#[derive(Debug, Clone, Serialize)]
pub struct NewGroup {
    pub name: String,
    pub path: String,
    pub visibility: Visibility,
}

impl NewGroup {
    /// A private group whose path equals its name.
    #[must_use]
    pub fn private(name: &str) -> Self {
        Self {
            name: name.to_string(),
            path: name.to_string(),
            visibility: Visibility::Private,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Private,
    Internal,
    Public,
}

/// State of a GitLab account.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserState {
    #[default]
    Active,
    Blocked,
    /// Blocked by the LDAP sync of GitLab itself; cannot be changed through
    /// the API.
    LdapBlocked,
    #[serde(other)]
    Other,
}

/// External identity linked to a GitLab account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub provider: String,
    #[serde(default)]
    pub extern_uid: String,
}

/// A GitLab user, as returned by `GET /users`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: u64,
    pub username: String,
    #[serde(default)]
    pub is_admin: bool,
    #[serde(default)]
    pub state: UserState,
    #[serde(default)]
    pub identities: Vec<Identity>,
}

impl User {
    /// The identity of the given provider, if it carries a non-blank uid.
    #[must_use]
    pub fn identity(&self, provider: &str) -> Option<&Identity> {
        self.identities
            .iter()
            .find(|i| i.provider == provider && !i.extern_uid.trim().is_empty())
    }
}

/// A member of a GitLab group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub id: u64,
    pub username: String,
    pub access_level: AccessLevel,
    #[serde(default)]
    pub state: UserState,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_access_level_ordering() {
        assert!(AccessLevel::Guest < AccessLevel::Reporter);
        assert!(AccessLevel::Reporter < AccessLevel::Developer);
        assert!(AccessLevel::Developer < AccessLevel::Maintainer);
        assert!(AccessLevel::Maintainer < AccessLevel::Owner);
    }

    #[test]
    fn test_access_level_from_unknown_value() {
        // GitLab 17 "planner" role sits between guest and reporter.
        assert_eq!(AccessLevel::from(15), AccessLevel::Guest);
        assert_eq!(AccessLevel::from(40), AccessLevel::Maintainer);
    }

    #[test]
    fn test_member_deserialize() {
        let member: Member = serde_json::from_str(
            r#"{"id": 7, "username": "alice", "access_level": 30, "state": "active"}"#,
        )
        .unwrap();
        assert_eq!(member.access_level, AccessLevel::Developer);
        assert_eq!(member.state, UserState::Active);
    }

    #[test]
    fn test_user_deserialize_with_identity() {
        let user: User = serde_json::from_str(
            r#"{
                "id": 3,
                "username": "carol",
                "is_admin": false,
                "state": "ldap_blocked",
                "identities": [{"provider": "ldapmain", "extern_uid": "cn=CAROL,ou=users,o=example"}]
            }"#,
        )
        .unwrap();
        assert_eq!(user.state, UserState::LdapBlocked);
        assert!(user.identity("ldapmain").is_some());
        assert!(user.identity("saml").is_none());
    }

    #[test]
    fn test_unknown_user_state() {
        let user: User =
            serde_json::from_str(r#"{"id": 1, "username": "x", "state": "deactivated"}"#).unwrap();
        assert_eq!(user.state, UserState::Other);
    }

    #[test]
    fn test_new_group_is_private() {
        let body = serde_json::to_value(NewGroup::private("role-a")).unwrap();
        assert_eq!(body["visibility"], "private");
        assert_eq!(body["path"], "role-a");
    }
}
