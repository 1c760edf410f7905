use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use remote_ls::config::{self, Config};
use remote_ls::crawl::{self, CrawlOptions, Resolver};
use remote_ls::logging::{self, LogOptions};
use remote_ls::registry::{CachedRegistry, ManifestCache, NpmRegistry, Registry};

#[derive(Parser)]
#[command(name = "remote-ls")]
#[command(version, about = "List the transitive dependencies of a published package")]
struct Cli {
    /// Package name, e.g. `express` or `@babel/core`
    name: String,

    /// Exact version of the root package
    version: String,

    /// Local manifest (package.json) describing NAME@VERSION
    manifest: Option<PathBuf>,

    /// JSON configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Registry base URL
    #[arg(long)]
    registry: Option<String>,

    /// Maximum registry calls in flight
    #[arg(long)]
    concurrency: Option<usize>,

    /// Follow optionalDependencies
    #[arg(long)]
    include_optional: bool,

    /// Seed devDependencies of the local manifest
    #[arg(long)]
    include_dev: bool,

    /// Skip the on-disk manifest cache
    #[arg(long)]
    no_cache: bool,

    /// Increase log verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Log as JSON lines
    #[arg(long)]
    log_json: bool,

    /// Write logs to this file instead of stderr
    #[arg(long)]
    log_file: Option<PathBuf>,
}

impl Cli {
    fn load_config(&self) -> anyhow::Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::load(path)?,
            None => Config::default(),
        };

        if let Some(url) = &self.registry {
            config.registry.url = url.clone();
        }
        if let Some(concurrency) = self.concurrency {
            config.crawl.max_concurrent_fetches = concurrency;
        }
        config.crawl.include_optional |= self.include_optional;
        config.crawl.include_dev |= self.include_dev;
        if self.no_cache {
            config.cache.enabled = false;
        }

        Ok(config)
    }
}

fn open_cache(config: &Config) -> Option<ManifestCache> {
    if !config.cache.enabled {
        return None;
    }

    let data_dir = config::data_dir();
    if let Err(e) = std::fs::create_dir_all(&data_dir) {
        warn!("Failed to create data directory {:?}: {}", data_dir, e);
    }

    match ManifestCache::new(&config::db_path(), config.cache.ttl) {
        Ok(cache) => Some(cache),
        Err(e) => {
            warn!("Failed to open manifest cache, using in-memory cache: {}", e);
            ManifestCache::in_memory(config.cache.ttl)
                .inspect_err(|e| warn!("Failed to create in-memory cache: {}", e))
                .ok()
        }
    }
}

fn build_registry(config: &Config) -> Arc<dyn Registry> {
    let npm = NpmRegistry::new(&config.registry.url);

    match open_cache(config) {
        Some(cache) => {
            if let Err(e) = cache.purge_expired() {
                warn!("Failed to purge expired cache entries: {}", e);
            }
            Arc::new(CachedRegistry::new(npm, cache))
        }
        None => Arc::new(npm),
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = cli.load_config()?;
    let registry = build_registry(&config);

    let cancel = CancellationToken::new();
    let resolver =
        Resolver::new(registry, CrawlOptions::from(&config)).with_cancellation(cancel.clone());

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupted, stopping crawl");
            cancel.cancel();
        }
    });

    let report = crawl::list_dependencies(&resolver, &cli.name, &cli.version, cli.manifest.as_deref())
        .await
        .with_context(|| format!("Failed to list dependencies of {}@{}", cli.name, cli.version))?;

    println!("{}", serde_json::to_string(&report.packages)?);

    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let _guard = logging::init(LogOptions {
        verbosity: cli.verbose,
        json: cli.log_json,
        file: cli.log_file.as_deref(),
    });

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(run(cli))
}
