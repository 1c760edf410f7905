//! Registry trait for fetching package manifests

#[cfg(test)]
use mockall::automock;

use crate::manifest::Manifest;
use crate::registry::error::RegistryError;

/// Trait for fetching a package manifest from a registry
#[cfg_attr(test, automock)]
#[async_trait::async_trait]
pub trait Registry: Send + Sync {
    /// Fetches the manifest of the version selected by `version_spec`
    ///
    /// # Arguments
    /// * `package_name` - The name of the package (e.g., "lodash", "@types/node")
    /// * `version_spec` - Exact version, range or dist-tag as written by the dependent
    ///
    /// # Returns
    /// * `Ok(Manifest)` - The resolved version and its declared dependencies
    /// * `Err(RegistryError)` - If the fetch fails; no retry is attempted here
    async fn fetch_manifest(
        &self,
        package_name: &str,
        version_spec: &str,
    ) -> Result<Manifest, RegistryError>;
}
