//! Registry layer: everything that answers "what does name@spec depend on"
//!
//! ```text
//! ┌──────────────┐     ┌──────────────┐     ┌──────────────┐
//! │   Resolver   │────▶│CachedRegistry│────▶│ NpmRegistry  │
//! │   (crawl)    │     │   (SQLite)   │     │   (HTTP)     │
//! └──────────────┘     └──────────────┘     └──────────────┘
//!                                                  │
//!                                                  ▼
//!                                           ┌──────────────┐
//!                                           │    range     │
//!                                           │(spec → ver)  │
//!                                           └──────────────┘
//! ```
//!
//! - [`client`]: `Registry` trait implemented by every manifest source
//! - [`npm`]: npm registry client
//! - [`cache`]: SQLite manifest cache and the `CachedRegistry` decorator
//! - [`range`]: npm version range matching used to pick a concrete version
//! - [`error`]: Error types for registry and cache operations

pub mod cache;
pub mod client;
pub mod error;
pub mod npm;
pub mod range;

pub use cache::{CachedRegistry, ManifestCache};
pub use client::Registry;
pub use error::{CacheError, RegistryError};
pub use npm::NpmRegistry;
