use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

// =============================================================================
// Defaults
// =============================================================================

/// Default base URL for the npm registry
pub const DEFAULT_REGISTRY_URL: &str = "https://registry.npmjs.org";

/// Timeout for a single manifest fetch in milliseconds (30 seconds)
pub const FETCH_TIMEOUT_MS: u64 = 30_000;

/// Upper bound on registry calls in flight at the same time
pub const DEFAULT_MAX_CONCURRENT_FETCHES: usize = 16;

/// Default lifetime of a cached manifest in milliseconds (24 hours)
pub const DEFAULT_CACHE_TTL_MS: i64 = 24 * 60 * 60 * 1000;

/// Top-level configuration structure
#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    pub registry: RegistryConfig,
    pub crawl: CrawlConfig,
    pub cache: CacheConfig,
}

/// Registry client configuration
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct RegistryConfig {
    /// Base URL of the registry
    pub url: String,
    /// Timeout for each manifest fetch in milliseconds
    pub timeout_ms: u64,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_REGISTRY_URL.to_string(),
            timeout_ms: FETCH_TIMEOUT_MS,
        }
    }
}

/// Crawl behaviour
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct CrawlConfig {
    pub max_concurrent_fetches: usize,
    /// Follow optionalDependencies of every fetched package
    pub include_optional: bool,
    /// Seed devDependencies of a supplied root manifest
    pub include_dev: bool,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            max_concurrent_fetches: DEFAULT_MAX_CONCURRENT_FETCHES,
            include_optional: false,
            include_dev: false,
        }
    }
}

/// Manifest cache configuration
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct CacheConfig {
    pub enabled: bool,
    /// Cache entry lifetime in milliseconds
    pub ttl: i64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl: DEFAULT_CACHE_TTL_MS,
        }
    }
}

impl RegistryConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Error type for loading a configuration file
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid config file {path:?}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

impl Config {
    /// Loads a JSON configuration file. Missing fields fall back to defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Returns the path to the data directory for remote-ls.
/// Uses $XDG_DATA_HOME/remote-ls if XDG_DATA_HOME is set,
/// otherwise falls back to ~/.local/share/remote-ls,
/// or ./remote-ls if neither is available.
pub fn data_dir() -> PathBuf {
    data_dir_with_env(std::env::var("XDG_DATA_HOME").ok(), dirs::home_dir())
}

/// Returns the path to the manifest cache database.
pub fn db_path() -> PathBuf {
    data_dir().join("manifests.db")
}

fn data_dir_with_env(xdg_data_home: Option<String>, home_dir: Option<PathBuf>) -> PathBuf {
    let data_dir = xdg_data_home
        .map(PathBuf::from)
        .or_else(|| home_dir.map(|home| home.join(".local/share")))
        .unwrap_or_else(|| PathBuf::from("."));

    data_dir.join("remote-ls")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn config_from_partial_object_uses_defaults_for_missing_fields() {
        let result = serde_json::from_value::<Config>(json!({
            "crawl": {
                "maxConcurrentFetches": 4
            }
        }))
        .unwrap();

        assert_eq!(result.crawl.max_concurrent_fetches, 4);
        assert!(!result.crawl.include_optional);
        assert_eq!(result.registry, RegistryConfig::default());
        assert_eq!(result.cache, CacheConfig::default());
    }

    #[test]
    fn config_from_full_object_parses_all_fields() {
        let result = serde_json::from_value::<Config>(json!({
            "registry": {
                "url": "http://localhost:4873",
                "timeoutMs": 500
            },
            "crawl": {
                "maxConcurrentFetches": 2,
                "includeOptional": true,
                "includeDev": true
            },
            "cache": {
                "enabled": false,
                "ttl": 1000
            }
        }))
        .unwrap();

        assert_eq!(
            result,
            Config {
                registry: RegistryConfig {
                    url: "http://localhost:4873".to_string(),
                    timeout_ms: 500,
                },
                crawl: CrawlConfig {
                    max_concurrent_fetches: 2,
                    include_optional: true,
                    include_dev: true,
                },
                cache: CacheConfig {
                    enabled: false,
                    ttl: 1000,
                },
            }
        );
    }

    #[test]
    fn load_reads_config_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{"registry": {{"url": "http://mirror.local"}}}}"#).unwrap();

        let config = Config::load(file.path()).unwrap();

        assert_eq!(config.registry.url, "http://mirror.local");
        assert_eq!(config.registry.timeout_ms, FETCH_TIMEOUT_MS);
    }

    #[test]
    fn load_rejects_invalid_json() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();

        let result = Config::load(file.path());

        assert!(matches!(result, Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn load_reports_missing_file() {
        let result = Config::load(Path::new("/nonexistent/remote-ls.json"));

        assert!(matches!(result, Err(ConfigError::Read { .. })));
    }

    #[test]
    fn data_dir_with_env_uses_xdg_data_home_when_set() {
        let path = data_dir_with_env(
            Some("/tmp/test-data".to_string()),
            Some(PathBuf::from("/home/user")),
        );

        assert_eq!(path, PathBuf::from("/tmp/test-data/remote-ls"));
    }

    #[test]
    fn data_dir_with_env_falls_back_to_home_local_share() {
        let path = data_dir_with_env(None, Some(PathBuf::from("/home/user")));

        assert_eq!(path, PathBuf::from("/home/user/.local/share/remote-ls"));
    }

    #[test]
    fn data_dir_with_env_falls_back_to_current_dir_when_no_dirs_available() {
        let path = data_dir_with_env(None, None);
        assert_eq!(path, PathBuf::from("./remote-ls"));
    }
}
