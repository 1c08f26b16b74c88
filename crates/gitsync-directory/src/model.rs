//! Directory value objects.

use std::borrow::Borrow;
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};

use crate::error::{DirectoryError, DirectoryResult};

/// A role-group of the directory, identified by its non-blank name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DirectoryGroup(String);

impl DirectoryGroup {
    pub fn new(name: impl Into<String>) -> DirectoryResult<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(DirectoryError::InvalidGroupName(name));
        }
        Ok(Self(name))
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for DirectoryGroup {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DirectoryGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A principal of the directory.
///
/// Two users are equal when their identifiers are equal, whatever their
/// other attributes.
#[derive(Debug, Clone)]
pub struct DirectoryUser {
    id: String,
    attributes: BTreeMap<String, String>,
}

impl DirectoryUser {
    /// Build a user from raw attributes; `id_attribute` must be present and
    /// non-blank.
    pub fn from_attributes(
        id_attribute: &str,
        attributes: BTreeMap<String, String>,
    ) -> DirectoryResult<Self> {
        let id = attributes
            .get(id_attribute)
            .filter(|v| !v.trim().is_empty())
            .cloned()
            .ok_or_else(|| DirectoryError::MissingIdentifier {
                attribute: id_attribute.to_string(),
            })?;
        Ok(Self { id, attributes })
    }

    /// Shorthand for a user known only by its `cn`.
    #[must_use]
    pub fn with_cn(cn: impl Into<String>) -> Self {
        let id = cn.into();
        let attributes = BTreeMap::from([("cn".to_string(), id.clone())]);
        Self { id, attributes }
    }

    #[must_use]
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    #[must_use]
    pub fn attributes(&self) -> &BTreeMap<String, String> {
        &self.attributes
    }
}

impl PartialEq for DirectoryUser {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for DirectoryUser {}

impl Hash for DirectoryUser {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for DirectoryUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id)
    }
}
