use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Failed to encode cached manifest: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Cache lock poisoned")]
    LockPoisoned,
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Rate limited: retry after {retry_after_secs:?} seconds")]
    RateLimited { retry_after_secs: Option<u64> },

    #[error("Package not found: {0}")]
    NotFound(String),

    #[error("No version of {name} satisfies {spec:?}")]
    NoMatchingVersion { name: String, spec: String },

    #[error("Unsupported version spec for {name}: {spec:?}")]
    UnsupportedSpec { name: String, spec: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Fetch timed out after {0:?}")]
    Timeout(Duration),
}
