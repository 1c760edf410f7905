use thiserror::Error;

use crate::manifest::ManifestError;

/// Errors that stop a crawl before any fetch is made
///
/// Per-package registry failures are not errors of the crawl; they are
/// recorded in the report instead.
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error(
        "Manifest declares {found_name}@{found_version} but {expected_name}@{expected_version} was requested"
    )]
    ManifestMismatch {
        expected_name: String,
        expected_version: String,
        found_name: String,
        found_version: String,
    },

    #[error(transparent)]
    Manifest(#[from] ManifestError),

    #[error("Nothing to crawl: the seed produced no entries")]
    EmptySeed,
}
