//! Transitive dependency crawl
//!
//! ```text
//! Seed ──► WorkQueue ──► VisitedSet::claim ──► Registry::fetch_manifest
//!             ▲                                        │
//!             └──────────── children ◄─────────────────┘
//! ```
//!
//! A crawl ends when the queue drains (nothing pending, nothing in flight)
//! or when its cancellation token fires. The result is the visited set,
//! flattened to `name@spec` strings in discovery order.

pub mod error;
pub mod key;
pub mod queue;
pub mod resolver;
pub mod seed;
pub mod visited;

use std::path::Path;

use tracing::info;

pub use error::CrawlError;
pub use key::{PackageKey, PendingEntry};
pub use resolver::{CrawlOptions, CrawlReport, Resolver};
pub use seed::{Seed, SeedOptions};
pub use visited::{VisitState, VisitedSet};

use crate::manifest::Manifest;

/// List every package reachable from `name`@`version`
///
/// Without a manifest path (or with an empty one) the root itself is fetched
/// from the registry. With a path, the local manifest must describe the same
/// package and version; it is validated before any registry call and its
/// dependencies seed the crawl.
pub async fn list_dependencies(
    resolver: &Resolver,
    name: &str,
    version: &str,
    manifest_path: Option<&Path>,
) -> Result<CrawlReport, CrawlError> {
    let seed = match manifest_path.filter(|path| !path.as_os_str().is_empty()) {
        Some(path) => {
            info!("Loading root manifest from {}", path.display());
            let manifest = Manifest::from_path(path)?;
            Seed::from_manifest(manifest, name, version)?
        }
        None => Seed::root(name, version),
    };

    resolver.crawl(&seed).await
}
