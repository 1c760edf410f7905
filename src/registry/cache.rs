//! SQLite-backed manifest cache
//!
//! Remembers the answer to `fetch_manifest(name, spec)` across runs so that
//! repeated crawls of overlapping trees stay off the network. Entries expire
//! after the configured TTL. Not-found answers are remembered too.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::{Connection, OptionalExtension};
use tracing::{debug, info, warn};

use crate::manifest::Manifest;
use crate::registry::client::Registry;
use crate::registry::error::{CacheError, RegistryError};

/// Schema migrations
/// Each version contains a list of SQL statements to execute
const MIGRATIONS: &[&[&str]] = &[
    // v1: not_found column
    &["ALTER TABLE manifests ADD COLUMN not_found INTEGER NOT NULL DEFAULT 0"],
];

/// A cached answer for one (name, spec) pair
#[derive(Debug, Clone, PartialEq)]
pub enum CachedManifest {
    Found(Manifest),
    NotFound,
}

pub struct ManifestCache {
    conn: Mutex<Connection>,
    ttl: i64,
}

impl ManifestCache {
    pub fn new(db_path: &Path, ttl: i64) -> Result<Self, CacheError> {
        info!("Initializing manifest cache at {:?}", db_path);

        let conn = Connection::open(db_path)?;

        // Enable WAL mode so concurrent runs do not block each other
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;

        Self::with_connection(conn, ttl)
    }

    /// In-memory cache, used when no data directory is writable
    pub fn in_memory(ttl: i64) -> Result<Self, CacheError> {
        Self::with_connection(Connection::open_in_memory()?, ttl)
    }

    fn with_connection(conn: Connection, ttl: i64) -> Result<Self, CacheError> {
        let cache = Self {
            conn: Mutex::new(conn),
            ttl,
        };

        cache.create_schema()?;
        debug!("Manifest cache ready");

        Ok(cache)
    }

    /// Acquire database connection lock with proper error handling
    fn lock_conn(&self) -> Result<MutexGuard<'_, Connection>, CacheError> {
        self.conn.lock().map_err(|_| CacheError::LockPoisoned)
    }

    fn current_timestamp_ms() -> i64 {
        chrono::Utc::now().timestamp_millis()
    }

    fn create_schema(&self) -> Result<(), CacheError> {
        let conn = self.lock_conn()?;

        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS manifests (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                package_name TEXT NOT NULL,
                version_spec TEXT NOT NULL,
                manifest TEXT,
                fetched_at INTEGER NOT NULL,
                UNIQUE(package_name, version_spec)
            )
            "#,
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_fetched_at ON manifests(fetched_at)",
            [],
        )?;

        Self::apply_migrations(&conn)?;

        Ok(())
    }

    /// Apply pending migrations based on user_version pragma
    fn apply_migrations(conn: &Connection) -> Result<(), CacheError> {
        let current_version: i32 =
            conn.pragma_query_value(None, "user_version", |row| row.get(0))?;

        for (i, statements) in MIGRATIONS.iter().enumerate() {
            let version = (i + 1) as i32;
            if version > current_version {
                for sql in *statements {
                    match conn.execute(sql, []) {
                        Ok(_) => {}
                        Err(rusqlite::Error::SqliteFailure(_, Some(ref msg)))
                            if msg.contains("duplicate column name") =>
                        {
                            debug!("Column already exists, skipping: {}", sql);
                        }
                        Err(e) => return Err(e.into()),
                    }
                }
                debug!("Applied migration v{}", version);
            }
        }

        let target_version = MIGRATIONS.len() as i32;
        if target_version > current_version {
            conn.pragma_update(None, "user_version", target_version)?;
        }

        Ok(())
    }

    /// Look up a fresh entry; expired entries are treated as missing
    pub fn get(
        &self,
        package_name: &str,
        version_spec: &str,
    ) -> Result<Option<CachedManifest>, CacheError> {
        let oldest = Self::current_timestamp_ms() - self.ttl;
        let conn = self.lock_conn()?;

        let row: Option<(Option<String>, bool)> = conn
            .query_row(
                r#"
                SELECT manifest, not_found FROM manifests
                WHERE package_name = ?1 AND version_spec = ?2 AND fetched_at > ?3
                "#,
                (package_name, version_spec, oldest),
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        match row {
            None => Ok(None),
            Some((_, true)) => Ok(Some(CachedManifest::NotFound)),
            Some((Some(json), false)) => Ok(Some(CachedManifest::Found(serde_json::from_str(
                &json,
            )?))),
            Some((None, false)) => Ok(None),
        }
    }

    /// Store a fetched manifest, replacing any previous entry
    pub fn put(
        &self,
        package_name: &str,
        version_spec: &str,
        manifest: &Manifest,
    ) -> Result<(), CacheError> {
        let json = serde_json::to_string(manifest)?;
        let conn = self.lock_conn()?;

        conn.execute(
            r#"
            INSERT INTO manifests (package_name, version_spec, manifest, fetched_at, not_found)
            VALUES (?1, ?2, ?3, ?4, 0)
            ON CONFLICT(package_name, version_spec) DO UPDATE SET
                manifest = excluded.manifest,
                fetched_at = excluded.fetched_at,
                not_found = 0
            "#,
            (
                package_name,
                version_spec,
                json,
                Self::current_timestamp_ms(),
            ),
        )?;

        Ok(())
    }

    /// Remember that the registry does not know this package
    pub fn mark_not_found(&self, package_name: &str, version_spec: &str) -> Result<(), CacheError> {
        let conn = self.lock_conn()?;

        conn.execute(
            r#"
            INSERT INTO manifests (package_name, version_spec, manifest, fetched_at, not_found)
            VALUES (?1, ?2, NULL, ?3, 1)
            ON CONFLICT(package_name, version_spec) DO UPDATE SET
                manifest = NULL,
                fetched_at = excluded.fetched_at,
                not_found = 1
            "#,
            (package_name, version_spec, Self::current_timestamp_ms()),
        )?;

        Ok(())
    }

    /// Drop entries older than the TTL, returns how many were removed
    pub fn purge_expired(&self) -> Result<usize, CacheError> {
        let oldest = Self::current_timestamp_ms() - self.ttl;
        let conn = self.lock_conn()?;
        let removed = conn.execute("DELETE FROM manifests WHERE fetched_at <= ?1", [oldest])?;
        Ok(removed)
    }
}

/// Registry decorator answering from a [`ManifestCache`] when possible
///
/// Cache failures never fail a fetch; they are logged and the inner
/// registry is asked instead.
pub struct CachedRegistry<R> {
    inner: R,
    cache: ManifestCache,
}

impl<R: Registry> CachedRegistry<R> {
    pub fn new(inner: R, cache: ManifestCache) -> Self {
        Self { inner, cache }
    }
}

#[async_trait::async_trait]
impl<R: Registry> Registry for CachedRegistry<R> {
    async fn fetch_manifest(
        &self,
        package_name: &str,
        version_spec: &str,
    ) -> Result<Manifest, RegistryError> {
        match self.cache.get(package_name, version_spec) {
            Ok(Some(CachedManifest::Found(manifest))) => {
                debug!("Cache hit for {}@{}", package_name, version_spec);
                return Ok(manifest);
            }
            Ok(Some(CachedManifest::NotFound)) => {
                debug!("Cached not-found for {}@{}", package_name, version_spec);
                return Err(RegistryError::NotFound(package_name.to_string()));
            }
            Ok(None) => {}
            Err(e) => warn!(
                "Manifest cache lookup failed for {}@{}: {}",
                package_name, version_spec, e
            ),
        }

        let result = self.inner.fetch_manifest(package_name, version_spec).await;

        let stored = match &result {
            Ok(manifest) => self.cache.put(package_name, version_spec, manifest),
            Err(RegistryError::NotFound(_)) => {
                self.cache.mark_not_found(package_name, version_spec)
            }
            Err(_) => Ok(()),
        };
        if let Err(e) = stored {
            warn!(
                "Failed to cache manifest for {}@{}: {}",
                package_name, version_spec, e
            );
        }

        result
    }
}
