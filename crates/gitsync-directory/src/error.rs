//! Directory error types.

use thiserror::Error;

/// Errors raised while reading the directory.
#[derive(Debug, Error)]
pub enum DirectoryError {
    /// Could not reach the directory server.
    #[error("Directory connection failed: {0}")]
    Connection(String),

    /// The bind credentials were rejected.
    #[error("Directory authentication failed for {bind_dn}")]
    AuthenticationFailed { bind_dn: String },

    /// A search request failed.
    #[error("Directory search failed: {0}")]
    Search(String),

    /// An entry lacks the attribute used as user identifier.
    #[error("Directory entry has no '{attribute}' attribute")]
    MissingIdentifier { attribute: String },

    /// A group name is blank.
    #[error("Invalid directory group name: '{0}'")]
    InvalidGroupName(String),

    /// The directory configuration is unusable.
    #[error("Invalid directory configuration: {0}")]
    InvalidConfig(String),
}

impl From<ldap3::LdapError> for DirectoryError {
    fn from(err: ldap3::LdapError) -> Self {
        DirectoryError::Search(err.to_string())
    }
}

/// Result type for directory operations.
pub type DirectoryResult<T> = Result<T, DirectoryError>;
