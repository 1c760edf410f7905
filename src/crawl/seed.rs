//! Initial queue contents for a crawl

use tracing::debug;

use crate::crawl::error::CrawlError;
use crate::crawl::key::{PackageKey, PendingEntry};
use crate::manifest::Manifest;

/// Where a crawl starts
#[derive(Debug, Clone, PartialEq)]
pub enum Seed {
    /// Fetch the root itself and everything below it
    Root(PackageKey),
    /// The root manifest is already known; start from its dependencies
    Manifest(Manifest),
}

/// Which dependency tables of a root manifest become seeds
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedOptions {
    pub include_optional: bool,
    pub include_dev: bool,
}

impl Seed {
    pub fn root(name: &str, version_spec: &str) -> Self {
        Seed::Root(PackageKey::new(name, version_spec))
    }

    /// Seed from a local manifest that must describe `name`@`version`
    ///
    /// Fails without touching the registry when the manifest declares a
    /// different package or version.
    pub fn from_manifest(manifest: Manifest, name: &str, version: &str) -> Result<Self, CrawlError> {
        if manifest.name != name || manifest.version != version {
            return Err(CrawlError::ManifestMismatch {
                expected_name: name.to_string(),
                expected_version: version.to_string(),
                found_name: manifest.name,
                found_version: manifest.version,
            });
        }
        Ok(Seed::Manifest(manifest))
    }

    /// Key of the package the crawl is about
    pub fn root_key(&self) -> PackageKey {
        match self {
            Seed::Root(key) => key.clone(),
            Seed::Manifest(manifest) => PackageKey::new(&manifest.name, &manifest.version),
        }
    }

    /// Entries to enqueue before the crawl starts
    ///
    /// A manifest without dependencies seeds its own root so that at least
    /// one node is always crawled.
    pub fn entries(&self, options: SeedOptions) -> Vec<PendingEntry> {
        match self {
            Seed::Root(key) => vec![PendingEntry::new(key.clone(), None)],
            Seed::Manifest(manifest) => {
                let root = self.root_key();
                let mut entries: Vec<PendingEntry> = manifest
                    .children(options.include_optional)
                    .into_iter()
                    .map(|(name, spec)| PendingEntry::child(name, spec, &root))
                    .collect();

                if options.include_dev {
                    entries.extend(
                        manifest
                            .dev_dependencies
                            .iter()
                            .map(|(name, spec)| PendingEntry::child(name, spec, &root)),
                    );
                }

                if entries.is_empty() {
                    debug!("{} declares no dependencies, crawling the root itself", root);
                    entries.push(PendingEntry::new(root, None));
                }

                entries
            }
        }
    }
}
