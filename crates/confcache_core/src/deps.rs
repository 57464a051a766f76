//! Dependency tracking and change detection by modification time.
//!
//! A cached configuration is only valid while none of the files it was built
//! from have changed. The [`DependencySet`] records those files as resolved
//! absolute paths, and its newest modification time is what the cache file's
//! own timestamp is compared against.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use tracing::debug;

use crate::error::CacheError;
use crate::resolver::PathResolver;

/// Timestamp reported for an empty dependency set.
///
/// Older than any real file, so the freshness comparison is always defined.
pub const NO_DEPENDENCIES: SystemTime = SystemTime::UNIX_EPOCH;

/// Insertion-ordered set of resolved dependency file paths.
///
/// Built once per load/save cycle and passed by value or reference into the
/// cache; nothing is ever removed from it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencySet {
    paths: Vec<PathBuf>,
}

impl DependencySet {
    /// Creates an empty dependency set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a set from paths that are already absolute and known to exist.
    ///
    /// No resolution is performed. Duplicates are dropped.
    pub fn from_resolved<I, P>(paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        let mut set = Self::new();
        for p in paths {
            set.insert(p.into());
        }
        set
    }

    /// Returns the registered paths in registration order.
    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    /// Returns the number of registered paths.
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    /// Returns `true` if nothing has been registered.
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Returns the newest modification time among the registered files.
    ///
    /// Returns [`NO_DEPENDENCIES`] for an empty set. A file that disappeared
    /// after registration is an error, since freshness can no longer be judged.
    pub fn max_timestamp(&self) -> Result<SystemTime, CacheError> {
        let mut newest = NO_DEPENDENCIES;
        for path in &self.paths {
            let modified = modified_time(path)?;
            if modified > newest {
                newest = modified;
            }
        }
        Ok(newest)
    }

    fn insert(&mut self, path: PathBuf) {
        if !self.paths.contains(&path) {
            self.paths.push(path);
        }
    }
}

/// Accumulates dependencies into a [`DependencySet`], resolving each raw name.
///
/// ```ignore
/// let mut tracker = DependencyTracker::new(&resolver);
/// tracker.register_all(["Orders.Mappings", "Billing.Mappings"])?;
/// tracker.register("orm.cfg.xml")?;
/// let deps = tracker.finish();
/// ```
#[derive(Debug)]
pub struct DependencyTracker<'r> {
    resolver: &'r PathResolver,
    set: DependencySet,
}

impl<'r> DependencyTracker<'r> {
    /// Creates a tracker that resolves names with `resolver`.
    pub fn new(resolver: &'r PathResolver) -> Self {
        Self {
            resolver,
            set: DependencySet::new(),
        }
    }

    /// Resolves `raw` and adds it to the set.
    ///
    /// Returns the resolved path. Propagates the resolver's not-found error.
    pub fn register(&mut self, raw: &str) -> Result<PathBuf, CacheError> {
        let resolved = self.resolver.resolve(raw)?;
        debug!(path = %resolved.display(), "registered dependency");
        self.set.insert(resolved.clone());
        Ok(resolved)
    }

    /// Registers each name in order.
    ///
    /// Stops at the first failure. Names registered before the failing one
    /// stay in the set; nothing is rolled back.
    pub fn register_all<I, S>(&mut self, raws: I) -> Result<(), CacheError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for raw in raws {
            self.register(raw.as_ref())?;
        }
        Ok(())
    }

    /// Returns the set accumulated so far.
    pub fn dependencies(&self) -> &DependencySet {
        &self.set
    }

    /// Consumes the tracker and returns the accumulated set.
    pub fn finish(self) -> DependencySet {
        self.set
    }
}

pub(crate) fn modified_time(path: &Path) -> Result<SystemTime, CacheError> {
    std::fs::metadata(path)
        .and_then(|m| m.modified())
        .map_err(|e| CacheError::Io {
            path: path.to_path_buf(),
            source: e,
        })
}
