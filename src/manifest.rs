//! Package manifest model
//!
//! The same shape is produced by the registry client (one version document
//! of a packument) and by reading a local `package.json`.

use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use tracing::debug;

/// A dependency table of a manifest
///
/// Registry documents are loosely typed: the table may be missing entirely,
/// may be something other than an object, or may hold non-string values.
/// Anything that is not an object is `Absent`; non-string entries are dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Dependencies {
    #[default]
    Absent,
    /// Dependency name -> version specifier, in declaration order
    Declared(IndexMap<String, String>),
}

impl Dependencies {
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Dependencies::Declared(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    fn from_value(value: Option<Value>) -> Self {
        match value {
            None | Some(Value::Null) => Dependencies::Absent,
            Some(Value::Object(map)) => Dependencies::Declared(
                map.into_iter()
                    .filter_map(|(name, spec)| match spec {
                        Value::String(spec) => Some((name, spec)),
                        other => {
                            debug!("Ignoring dependency {} with non-string spec {}", name, other);
                            None
                        }
                    })
                    .collect(),
            ),
            Some(other) => {
                debug!("Treating malformed dependency table as absent: {}", other);
                Dependencies::Absent
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Dependencies::Absent => true,
            Dependencies::Declared(deps) => deps.is_empty(),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Dependencies::Absent => 0,
            Dependencies::Declared(deps) => deps.len(),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        match self {
            Dependencies::Absent => false,
            Dependencies::Declared(deps) => deps.contains_key(name),
        }
    }

    /// Iterate over (name, version specifier) pairs
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        let deps = match self {
            Dependencies::Absent => None,
            Dependencies::Declared(deps) => Some(deps),
        };
        deps.into_iter()
            .flat_map(|deps| deps.iter().map(|(k, v)| (k.as_str(), v.as_str())))
    }
}

impl Serialize for Dependencies {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Dependencies::Absent => serializer.serialize_none(),
            Dependencies::Declared(deps) => deps.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for Dependencies {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Option::<Value>::deserialize(deserializer)?;
        Ok(Dependencies::from_value(value))
    }
}

/// Identity and dependency tables of one package version
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub dependencies: Dependencies,
    #[serde(default)]
    pub optional_dependencies: Dependencies,
    #[serde(default)]
    pub dev_dependencies: Dependencies,
}

/// Error type for reading a manifest from disk
#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("Failed to read manifest {path:?}: {source}")]
    Read {
        path: std::path::PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid manifest {path:?}: {source}")]
    Parse {
        path: std::path::PathBuf,
        source: serde_json::Error,
    },
}

impl Manifest {
    pub fn new(name: &str, version: &str, dependencies: Dependencies) -> Self {
        Self {
            name: name.to_string(),
            version: version.to_string(),
            dependencies,
            ..Default::default()
        }
    }

    /// Parse a manifest from JSON text
    pub fn parse(content: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(content)
    }

    /// Read and parse a `package.json` style file
    pub fn from_path(path: &Path) -> Result<Self, ManifestError> {
        let content = std::fs::read_to_string(path).map_err(|source| ManifestError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        Self::parse(&content).map_err(|source| ManifestError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Dependencies to follow from this package
    ///
    /// The registry lists optional dependencies inside `dependencies` as well,
    /// so they are removed unless `include_optional` is set, in which case
    /// optional entries missing from `dependencies` are appended.
    pub fn children(&self, include_optional: bool) -> Vec<(&str, &str)> {
        let mut children: Vec<(&str, &str)> = self
            .dependencies
            .iter()
            .filter(|(name, _)| include_optional || !self.optional_dependencies.contains(name))
            .collect();

        if include_optional {
            for (name, spec) in self.optional_dependencies.iter() {
                if !self.dependencies.contains(name) {
                    children.push((name, spec));
                }
            }
        }

        children
    }
}
