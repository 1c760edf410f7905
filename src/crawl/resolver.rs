//! Crawl driver
//!
//! Pulls entries off the [`WorkQueue`], claims them in the [`VisitedSet`],
//! fetches their manifests and enqueues the dependencies it finds. All state
//! lives in locals of [`Resolver::crawl`], so every crawl starts fresh.
//!
//! Fetches run concurrently on the calling task (no spawning); the only
//! suspension points are registry calls, so the queue and visited set need
//! no locking.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use futures::stream::{FuturesUnordered, StreamExt};
use indexmap::IndexMap;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::config::{Config, DEFAULT_MAX_CONCURRENT_FETCHES, FETCH_TIMEOUT_MS};
use crate::crawl::error::CrawlError;
use crate::crawl::key::PendingEntry;
use crate::crawl::queue::WorkQueue;
use crate::crawl::seed::{Seed, SeedOptions};
use crate::crawl::visited::VisitedSet;
use crate::manifest::Manifest;
use crate::registry::{Registry, RegistryError};

/// Tuning for a single crawl
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlOptions {
    /// Registry calls allowed in flight at once (0 is treated as 1)
    pub max_concurrent_fetches: usize,
    /// Upper bound for each registry call
    pub fetch_timeout: Duration,
    pub include_optional: bool,
    pub include_dev: bool,
}

impl Default for CrawlOptions {
    fn default() -> Self {
        Self {
            max_concurrent_fetches: DEFAULT_MAX_CONCURRENT_FETCHES,
            fetch_timeout: Duration::from_millis(FETCH_TIMEOUT_MS),
            include_optional: false,
            include_dev: false,
        }
    }
}

impl From<&Config> for CrawlOptions {
    fn from(config: &Config) -> Self {
        Self {
            max_concurrent_fetches: config.crawl.max_concurrent_fetches,
            fetch_timeout: config.registry.timeout(),
            include_optional: config.crawl.include_optional,
            include_dev: config.crawl.include_dev,
        }
    }
}

impl CrawlOptions {
    fn seed_options(&self) -> SeedOptions {
        SeedOptions {
            include_optional: self.include_optional,
            include_dev: self.include_dev,
        }
    }
}

/// Result of one crawl
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CrawlReport {
    /// `name@spec` of the package the crawl was about
    pub root: String,
    /// Every key that was claimed, as `name@spec`, in discovery order
    pub packages: Vec<String>,
    /// Concrete version the registry picked, per fetched `name@spec`
    pub resolved: IndexMap<String, String>,
    /// Subset of `packages` whose fetch failed
    pub failed: Vec<String>,
    /// Registry calls issued
    pub fetch_count: usize,
    /// The crawl stopped on its cancellation token before draining
    pub cancelled: bool,
}

type FetchOutcome = (PendingEntry, Result<Manifest, RegistryError>);

pub struct Resolver {
    registry: Arc<dyn Registry>,
    options: CrawlOptions,
    cancel: CancellationToken,
}

impl Resolver {
    pub fn new(registry: Arc<dyn Registry>, options: CrawlOptions) -> Self {
        Self {
            registry,
            options,
            cancel: CancellationToken::new(),
        }
    }

    /// Stop crawls when `cancel` fires
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Discover every package reachable from `seed`
    ///
    /// Registry failures do not fail the crawl: the failed key stays in the
    /// result and contributes no children. On cancellation, pending entries
    /// are discarded, in-flight fetches are abandoned and whatever was
    /// claimed so far is returned.
    pub async fn crawl(&self, seed: &Seed) -> Result<CrawlReport, CrawlError> {
        let entries = seed.entries(self.options.seed_options());
        if entries.is_empty() {
            return Err(CrawlError::EmptySeed);
        }

        let root = seed.root_key();
        info!("Crawling {} from {} seed entries", root, entries.len());

        let (mut queue, mut drained) = WorkQueue::new(self.options.max_concurrent_fetches);
        let mut visited = VisitedSet::new();
        // Bumped when a fetch is first polled, not when it is queued
        let fetch_count = AtomicUsize::new(0);
        let mut in_flight = FuturesUnordered::new();

        for entry in entries {
            queue.enqueue(entry);
        }

        let cancelled = loop {
            while let Some(entry) = queue.next_ready() {
                // Claim before fetching so queued duplicates never fetch twice
                if !visited.claim(&entry.key, entry.parent.as_ref()) {
                    trace!("Skipping {}: already visited", entry.key);
                    queue.finish();
                    continue;
                }
                in_flight.push(self.fetch(entry, &fetch_count));
            }

            tokio::select! {
                biased;

                _ = self.cancel.cancelled() => {
                    info!(
                        "Crawl of {} cancelled with {} fetches in flight and {} pending",
                        root,
                        in_flight.len(),
                        queue.pending_len()
                    );
                    queue.close();
                    break true;
                }
                summary = &mut drained => {
                    debug!("Drain signal for {}: {:?}", root, summary);
                    break false;
                }
                Some((entry, result)) = in_flight.next() => {
                    self.record(entry, result, &mut queue, &mut visited);
                    queue.finish();
                }
            }
        };

        let report = CrawlReport {
            root: root.to_string(),
            packages: visited.flatten(),
            resolved: visited.resolved(),
            failed: visited.failed(),
            fetch_count: fetch_count.load(Ordering::Relaxed),
            cancelled,
        };

        info!(
            "Crawl of {} finished: {} packages, {} failed, {} fetches",
            report.root,
            report.packages.len(),
            report.failed.len(),
            report.fetch_count
        );

        Ok(report)
    }

    async fn fetch(&self, entry: PendingEntry, fetch_count: &AtomicUsize) -> FetchOutcome {
        debug!("Fetching {}", entry.key);
        fetch_count.fetch_add(1, Ordering::Relaxed);

        let timeout = self.options.fetch_timeout;
        let result = match tokio::time::timeout(
            timeout,
            self.registry
                .fetch_manifest(&entry.key.name, &entry.key.version_spec),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(RegistryError::Timeout(timeout)),
        };

        (entry, result)
    }

    /// Apply a fetch outcome: enqueue children on success, mark failure otherwise
    ///
    /// Children are enqueued before the caller finishes the entry, which is
    /// what keeps the queue from draining early.
    fn record(
        &self,
        entry: PendingEntry,
        result: Result<Manifest, RegistryError>,
        queue: &mut WorkQueue,
        visited: &mut VisitedSet,
    ) {
        match result {
            Ok(manifest) => {
                let children = manifest.children(self.options.include_optional);
                debug!(
                    "{} resolved to {} with {} dependencies",
                    entry.key,
                    manifest.version,
                    children.len()
                );

                for (name, spec) in children {
                    queue.enqueue(PendingEntry::child(name, spec, &entry.key));
                }
                visited.mark_resolved(&entry.key, &manifest.version);
            }
            Err(e) => {
                let chain = visited
                    .path(&entry.key)
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(" > ");
                warn!("Failed to fetch {} ({}): {}", entry.key, chain, e);
                visited.mark_failed(&entry.key);
            }
        }
    }
}
