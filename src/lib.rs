//! Transitive dependency listing for npm packages
//!
//! Walks the "dependencies" relation of a package registry starting from a
//! single root (or from the dependencies of a local `package.json`) and
//! returns the flat, deduplicated set of everything reachable.
//!
//! # Modules
//!
//! - [`config`]: Configuration file, defaults and data directory paths
//! - [`crawl`]: Work queue, visited set and the resolver driving a crawl
//! - [`logging`]: tracing subscriber setup for the binary
//! - [`manifest`]: Package manifest model shared by the registry and the crawl
//! - [`registry`]: Registry trait, npm client and the SQLite manifest cache

pub mod config;
pub mod crawl;
pub mod logging;
pub mod manifest;
pub mod registry;
