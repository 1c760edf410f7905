//! Identity of a crawl node and the queue entries that refer to it

use std::fmt;

/// A package as written by its dependent: name plus the literal version spec
///
/// Two different specs for the same name are two keys, even when the
/// registry would resolve them to the same version.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PackageKey {
    pub name: String,
    pub version_spec: String,
}

impl PackageKey {
    pub fn new(name: impl Into<String>, version_spec: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version_spec: version_spec.into(),
        }
    }
}

impl fmt::Display for PackageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.name, self.version_spec)
    }
}

/// A resolution request waiting in the work queue
///
/// `parent` is the key of the package that declared this dependency. It is
/// kept for diagnostics only; cycle detection looks at the key alone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingEntry {
    pub key: PackageKey,
    pub parent: Option<PackageKey>,
}

impl PendingEntry {
    pub fn new(key: PackageKey, parent: Option<PackageKey>) -> Self {
        Self { key, parent }
    }

    /// Entry for a seed with no dependent
    pub fn root(name: &str, version_spec: &str) -> Self {
        Self::new(PackageKey::new(name, version_spec), None)
    }

    /// Entry for a dependency declared by `parent`
    pub fn child(name: &str, version_spec: &str, parent: &PackageKey) -> Self {
        Self::new(PackageKey::new(name, version_spec), Some(parent.clone()))
    }
}
