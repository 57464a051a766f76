//! Settings types deserialized from `confcache.toml`.

use std::path::PathBuf;
use std::time::Duration;

use confcache_core::{CacheSettings, Namespace, PathResolver};
use serde::Deserialize;

/// The top-level settings parsed from `confcache.toml`.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CacheConfig {
    /// Where and how snapshots are written.
    #[serde(default)]
    pub cache: StorageSection,
    /// How dependency names are located.
    #[serde(default)]
    pub resolver: ResolverSection,
    /// Which application owns the snapshots.
    #[serde(default)]
    pub namespace: NamespaceSection,
}

/// The `[cache]` section.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StorageSection {
    /// Snapshot directory. Defaults to the platform temp directory.
    #[serde(default)]
    pub directory: Option<PathBuf>,
    /// Snapshot file extension, without the dot.
    #[serde(default = "default_extension")]
    pub extension: String,
    /// Milliseconds added to the newest dependency time when stamping a snapshot
    /// (1 to 1000).
    #[serde(default = "default_stamp_offset_ms")]
    pub stamp_offset_ms: u64,
}

impl Default for StorageSection {
    fn default() -> Self {
        Self {
            directory: None,
            extension: default_extension(),
            stamp_offset_ms: default_stamp_offset_ms(),
        }
    }
}

/// The `[resolver]` section.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResolverSection {
    /// Extension appended to bare library names.
    #[serde(default = "default_library_extension")]
    pub library_extension: String,
    /// Directory probed in place of the executable's directory.
    #[serde(default)]
    pub base_dir: Option<PathBuf>,
}

impl Default for ResolverSection {
    fn default() -> Self {
        Self {
            library_extension: default_library_extension(),
            base_dir: None,
        }
    }
}

/// The `[namespace]` section.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NamespaceSection {
    /// Namespace label. Defaults to the running executable's path.
    #[serde(default)]
    pub label: Option<String>,
}

fn default_extension() -> String {
    confcache_core::cache::DEFAULT_EXTENSION.to_string()
}

fn default_stamp_offset_ms() -> u64 {
    confcache_core::cache::DEFAULT_STAMP_OFFSET.as_millis() as u64
}

fn default_library_extension() -> String {
    confcache_core::resolver::DEFAULT_LIBRARY_EXTENSION.to_string()
}

impl CacheConfig {
    /// Builds the cache settings these values describe.
    pub fn to_settings(&self) -> CacheSettings {
        let resolver = match &self.resolver.base_dir {
            Some(dir) => PathResolver::with_base_dir(dir),
            None => PathResolver::for_current_exe(),
        }
        .with_library_extension(&self.resolver.library_extension);

        CacheSettings {
            directory: self
                .cache
                .directory
                .clone()
                .unwrap_or_else(std::env::temp_dir),
            extension: self.cache.extension.clone(),
            stamp_offset: Duration::from_millis(self.cache.stamp_offset_ms),
            resolver,
        }
    }

    /// Returns the configured namespace, or one derived from the executable.
    pub fn namespace(&self) -> Namespace {
        match &self.namespace.label {
            Some(label) => Namespace::new(label.clone()),
            None => Namespace::from_current_exe(),
        }
    }
}
