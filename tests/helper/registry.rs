//! Registry test utilities

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tempfile::TempDir;

use remote_ls::manifest::{Dependencies, Manifest};
use remote_ls::registry::{Registry, RegistryError};

/// In-memory dependency graph keyed by `(name, spec)`
///
/// Records every call so tests can assert on fetch counts and on how many
/// fetches were in flight at once.
#[derive(Default)]
pub struct GraphRegistry {
    manifests: HashMap<(String, String), Manifest>,
    failing: HashSet<(String, String)>,
    delay: Option<Duration>,
    calls: Mutex<HashMap<(String, String), usize>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl GraphRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `name@spec`, resolving to `version` with the given dependencies
    pub fn with_package(
        mut self,
        name: &str,
        spec: &str,
        version: &str,
        deps: &[(&str, &str)],
    ) -> Self {
        let manifest = Manifest::new(name, version, Dependencies::from_pairs(deps.iter().copied()));
        self.manifests
            .insert((name.to_string(), spec.to_string()), manifest);
        self
    }

    /// Make every fetch of `name@spec` fail
    pub fn with_failure(mut self, name: &str, spec: &str) -> Self {
        self.failing.insert((name.to_string(), spec.to_string()));
        self
    }

    /// Sleep this long inside every fetch
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self, name: &str, spec: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .get(&(name.to_string(), spec.to_string()))
            .copied()
            .unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().values().sum()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Registry for GraphRegistry {
    async fn fetch_manifest(
        &self,
        package_name: &str,
        version_spec: &str,
    ) -> Result<Manifest, RegistryError> {
        let key = (package_name.to_string(), version_spec.to_string());
        *self.calls.lock().unwrap().entry(key.clone()).or_insert(0) += 1;

        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.failing.contains(&key) {
            return Err(RegistryError::InvalidResponse(format!(
                "simulated failure for {}@{}",
                package_name, version_spec
            )));
        }

        self.manifests
            .get(&key)
            .cloned()
            .ok_or_else(|| RegistryError::NotFound(package_name.to_string()))
    }
}

/// Write `content` to a package.json inside a fresh temp dir
pub fn write_manifest(content: &str) -> (TempDir, std::path::PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("package.json");
    std::fs::write(&path, content).unwrap();
    (temp_dir, path)
}
