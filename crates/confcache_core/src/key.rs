//! Cache keys and application namespaces.
//!
//! Snapshots live in a shared directory (the platform temp dir by default), so
//! the file name combines the caller's logical key with a discriminator derived
//! from an application namespace. Two applications that both cache `"orm"`
//! therefore never read each other's snapshot.

use std::fmt;
use std::path::{Path, PathBuf};

use confcache_common::ContentHash;
use tracing::warn;

use crate::error::CacheError;

/// Number of hex characters of the namespace hash used in file names.
const DISCRIMINATOR_LEN: usize = 16;

/// Identifies the application that owns a set of cache files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Namespace {
    label: String,
}

impl Namespace {
    /// Creates a namespace from any caller-chosen label.
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
        }
    }

    /// Derives the namespace from the running executable's path.
    ///
    /// Falls back to `argv[0]` when the executable path is unavailable, and to
    /// a per-process label when neither is known.
    pub fn from_current_exe() -> Self {
        let detected = std::env::current_exe()
            .ok()
            .map(|p| p.display().to_string())
            .or_else(|| std::env::args().next());
        Self {
            label: label_or_process(detected),
        }
    }

    /// Returns the label the namespace was created from.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Returns the filename-safe token derived from the label.
    pub fn discriminator(&self) -> String {
        ContentHash::from_bytes(self.label.as_bytes()).hex_prefix(DISCRIMINATOR_LEN)
    }
}

/// Uses `detected` when it is non-empty, otherwise a label unique to this process.
fn label_or_process(detected: Option<String>) -> String {
    match detected.filter(|l| !l.trim().is_empty()) {
        Some(label) => label,
        None => {
            let pid = std::process::id();
            warn!(
                pid,
                "executable path unknown; namespacing snapshots by process id, \
                 so they will not be reused by later runs"
            );
            format!("pid-{pid}")
        }
    }
}

/// A validated logical key scoped to a [`Namespace`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheKey {
    name: String,
    namespace: Namespace,
}

impl CacheKey {
    /// Creates a key. The name must be non-empty and must not contain path
    /// separators or `..`, since it becomes part of a file name.
    pub fn new(name: impl Into<String>, namespace: Namespace) -> Result<Self, CacheError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(CacheError::invalid("cache key must not be empty"));
        }
        if name.contains(['/', '\\']) || name.contains("..") {
            return Err(CacheError::invalid(format!(
                "cache key '{name}' must not contain path separators or '..'"
            )));
        }
        Ok(Self { name, namespace })
    }

    /// Returns the logical key name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the owning namespace.
    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    /// Returns the snapshot file name, `<key>-<discriminator>.<ext>`.
    pub fn file_name(&self, ext: &str) -> String {
        format!("{}-{}.{ext}", self.name, self.namespace.discriminator())
    }

    /// Returns the snapshot location inside `dir`.
    pub fn path_in(&self, dir: &Path, ext: &str) -> PathBuf {
        dir.join(self.file_name(ext))
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.name, self.namespace.label)
    }
}
