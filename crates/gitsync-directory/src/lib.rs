//! Directory side of gitsync: an immutable snapshot of role-groups and their
//! members, and the sources that produce it.
//!
//! The reconciliation engine only consumes [`DirectoryTree`] and the
//! [`DirectorySource`] trait; [`LdapDirectory`] is the production source.

pub mod config;
pub mod error;
pub mod ldap;
pub mod model;
pub mod source;
pub mod tree;

pub use config::LdapConfig;
pub use error::{DirectoryError, DirectoryResult};
pub use ldap::{leading_rdn_value, LdapDirectory};
pub use model::{DirectoryGroup, DirectoryUser};
pub use source::{build_tree, DirectorySource};
pub use tree::{DirectoryTree, DirectoryTreeBuilder};
