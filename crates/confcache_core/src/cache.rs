//! High-level cache orchestrator.
//!
//! [`ConfigurationCache`] ties together path resolution, dependency tracking,
//! and snapshot persistence. A snapshot is current only when its file exists
//! and its modification time is strictly newer than every dependency's. On
//! save the snapshot's modification time is set from the dependencies rather
//! than the wall clock, so validity depends only on the dependency files.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::artifact::{self, Retrieved};
use crate::deps::{modified_time, DependencySet, DependencyTracker};
use crate::error::CacheError;
use crate::key::CacheKey;
use crate::resolver::PathResolver;

/// Default snapshot file extension.
pub const DEFAULT_EXTENSION: &str = "cfgcache";

/// Default gap between the newest dependency and the snapshot's stamp.
pub const DEFAULT_STAMP_OFFSET: Duration = Duration::from_millis(1);

/// Largest accepted stamp offset. A dependency edited within the offset of
/// its previous modification would go unnoticed, so the gap is kept short.
pub const MAX_STAMP_OFFSET: Duration = Duration::from_secs(1);

/// Settings for a [`ConfigurationCache`].
#[derive(Debug, Clone)]
pub struct CacheSettings {
    /// Directory holding snapshot files.
    pub directory: PathBuf,

    /// Snapshot file extension, without the dot.
    pub extension: String,

    /// Added to the newest dependency time when stamping a saved snapshot.
    /// Clamped to [`MAX_STAMP_OFFSET`].
    pub stamp_offset: Duration,

    /// Resolver used to locate dependency files.
    pub resolver: PathResolver,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            directory: std::env::temp_dir(),
            extension: DEFAULT_EXTENSION.to_string(),
            stamp_offset: DEFAULT_STAMP_OFFSET,
            resolver: PathResolver::for_current_exe(),
        }
    }
}

/// Whether a snapshot may be served.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    /// No snapshot file exists.
    Missing,
    /// A dependency is as new as or newer than the snapshot.
    Stale,
    /// The snapshot is strictly newer than every dependency.
    Current,
}

/// Snapshot state as reported to tooling.
#[derive(Debug, Clone)]
pub struct CacheStatus {
    /// Location of the snapshot file.
    pub path: PathBuf,
    /// Freshness verdict.
    pub freshness: Freshness,
    /// Modification time of the snapshot, if it exists.
    pub cache_timestamp: Option<SystemTime>,
    /// Newest dependency modification time.
    pub dependency_timestamp: SystemTime,
}

/// Detailed result of a cache lookup.
#[derive(Debug)]
pub enum Lookup<T> {
    /// A current snapshot decoded successfully.
    Hit(T),
    /// The snapshot is missing or older than a dependency.
    Stale,
    /// The snapshot is current but could not be decoded.
    Corrupt(String),
}

impl<T> Lookup<T> {
    /// Collapses the lookup to "value or rebuild".
    pub fn into_option(self) -> Option<T> {
        match self {
            Lookup::Hit(value) => Some(value),
            Lookup::Stale | Lookup::Corrupt(_) => None,
        }
    }
}

/// Persists a serialized configuration object and reuses it while its
/// dependency files are unchanged.
///
/// Each call is self-contained: dependencies are passed in, not accumulated
/// on the cache.
#[derive(Debug, Clone)]
pub struct ConfigurationCache {
    settings: CacheSettings,
}

impl ConfigurationCache {
    /// Creates a cache with the given settings.
    pub fn new(settings: CacheSettings) -> Self {
        Self { settings }
    }

    /// Returns the cache settings.
    pub fn settings(&self) -> &CacheSettings {
        &self.settings
    }

    /// Returns the resolver used for dependency names.
    pub fn resolver(&self) -> &PathResolver {
        &self.settings.resolver
    }

    /// Returns the offset `save` actually applies.
    pub fn stamp_offset(&self) -> Duration {
        let offset = self.settings.stamp_offset;
        if offset > MAX_STAMP_OFFSET {
            warn!(
                requested_ms = offset.as_millis() as u64,
                max_ms = MAX_STAMP_OFFSET.as_millis() as u64,
                "stamp offset clamped"
            );
            return MAX_STAMP_OFFSET;
        }
        offset
    }

    /// Returns the snapshot location for `key`.
    pub fn cache_path(&self, key: &CacheKey) -> PathBuf {
        key.path_in(&self.settings.directory, &self.settings.extension)
    }

    /// Resolves `mapping_paths` and then `config_path` into a dependency set.
    ///
    /// The first unresolvable name aborts with [`CacheError::NotFound`].
    pub fn dependencies<S: AsRef<str>>(
        &self,
        config_path: &str,
        mapping_paths: &[S],
    ) -> Result<DependencySet, CacheError> {
        let mut tracker = DependencyTracker::new(&self.settings.resolver);
        tracker.register_all(mapping_paths)?;
        tracker.register(config_path)?;
        Ok(tracker.finish())
    }

    /// Loads the cached configuration for `key` if it is current.
    ///
    /// Returns `Ok(None)` when the caller must rebuild: the snapshot is
    /// missing, older than a dependency, or unreadable. Unresolvable
    /// dependencies are an error.
    pub fn load<T, S>(
        &self,
        key: &CacheKey,
        config_path: &str,
        mapping_paths: &[S],
    ) -> Result<Option<T>, CacheError>
    where
        T: DeserializeOwned,
        S: AsRef<str>,
    {
        let deps = self.dependencies(config_path, mapping_paths)?;
        self.load_with(key, &deps)
    }

    /// Like [`load`](Self::load) with an already-built dependency set.
    pub fn load_with<T: DeserializeOwned>(
        &self,
        key: &CacheKey,
        deps: &DependencySet,
    ) -> Result<Option<T>, CacheError> {
        Ok(self.lookup(key, deps)?.into_option())
    }

    /// Looks up `key`, keeping stale and corrupt outcomes apart.
    pub fn lookup<T: DeserializeOwned>(
        &self,
        key: &CacheKey,
        deps: &DependencySet,
    ) -> Result<Lookup<T>, CacheError> {
        let status = self.status(key, deps)?;
        if status.freshness != Freshness::Current {
            debug!(key = %key, freshness = ?status.freshness, "cache miss");
            return Ok(Lookup::Stale);
        }

        match artifact::retrieve(&status.path)? {
            Retrieved::Hit(value) => {
                debug!(key = %key, path = %status.path.display(), "cache hit");
                Ok(Lookup::Hit(value))
            }
            // Removed between the stat and the read.
            Retrieved::Missing => Ok(Lookup::Stale),
            Retrieved::Corrupt(reason) => Ok(Lookup::Corrupt(reason)),
        }
    }

    /// Reports the snapshot's freshness against `deps` without reading it.
    pub fn status(&self, key: &CacheKey, deps: &DependencySet) -> Result<CacheStatus, CacheError> {
        let path = self.cache_path(key);
        let dependency_timestamp = deps.max_timestamp()?;
        let cache_timestamp = snapshot_time(&path);

        let freshness = match cache_timestamp {
            None => Freshness::Missing,
            Some(t) if t > dependency_timestamp => Freshness::Current,
            Some(_) => Freshness::Stale,
        };

        Ok(CacheStatus {
            path,
            freshness,
            cache_timestamp,
            dependency_timestamp,
        })
    }

    /// Writes `payload` as the snapshot for `key` and stamps it from `deps`.
    ///
    /// The snapshot's modification time is set just past the newest dependency
    /// time, not to the time of writing. A dependency modified after this
    /// point makes the snapshot stale on the next load.
    pub fn save<T: Serialize>(
        &self,
        key: &CacheKey,
        payload: &T,
        deps: &DependencySet,
    ) -> Result<(), CacheError> {
        let path = self.cache_path(key);
        let newest = deps.max_timestamp()?;
        let stamp = newest + self.stamp_offset();

        artifact::store(payload, &path)?;
        set_modified(&path, stamp)?;

        let written = modified_time(&path)?;
        if written <= newest {
            warn!(
                path = %path.display(),
                "filesystem timestamp resolution is coarser than the stamp offset; \
                 this snapshot will always be treated as stale"
            );
        }

        info!(key = %key, path = %path.display(), dependencies = deps.len(), "saved configuration snapshot");
        Ok(())
    }

    /// Loads the configuration for `key`, building and saving it on a miss.
    ///
    /// `build` receives the resolved dependency set. Its error type must be
    /// able to carry a [`CacheError`], which covers resolution and save failures.
    pub fn load_or_build<T, S, E, F>(
        &self,
        key: &CacheKey,
        config_path: &str,
        mapping_paths: &[S],
        build: F,
    ) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        S: AsRef<str>,
        E: From<CacheError>,
        F: FnOnce(&DependencySet) -> Result<T, E>,
    {
        let deps = self.dependencies(config_path, mapping_paths)?;
        match self.lookup(key, &deps)? {
            Lookup::Hit(value) => return Ok(value),
            Lookup::Stale => {}
            Lookup::Corrupt(reason) => {
                info!(key = %key, %reason, "rebuilding over corrupt snapshot");
            }
        }

        let value = build(&deps)?;
        self.save(key, &value, &deps)?;
        Ok(value)
    }

    /// Deletes the snapshot for `key`. Returns `false` if there was none.
    pub fn invalidate(&self, key: &CacheKey) -> Result<bool, CacheError> {
        let path = self.cache_path(key);
        match std::fs::remove_file(&path) {
            Ok(()) => {
                debug!(path = %path.display(), "removed snapshot");
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(CacheError::Io { path, source: e }),
        }
    }
}

impl Default for ConfigurationCache {
    fn default() -> Self {
        Self::new(CacheSettings::default())
    }
}

fn snapshot_time(path: &Path) -> Option<SystemTime> {
    let meta = std::fs::metadata(path).ok()?;
    if !meta.is_file() {
        return None;
    }
    meta.modified().ok()
}

fn set_modified(path: &Path, time: SystemTime) -> Result<(), CacheError> {
    File::options()
        .write(true)
        .open(path)
        .and_then(|f| f.set_modified(time))
        .map_err(|e| CacheError::Io {
            path: path.to_path_buf(),
            source: e,
        })
}
