//! Locating dependency files from bare names or partial paths.
//!
//! Mapping sources are usually named the way the application refers to them
//! (`Orders.Mappings`, `config/orm.xml`), not by absolute path. The resolver
//! probes a fixed sequence of locations and returns the first regular file:
//!
//! 1. the raw path as given (relative to the working directory),
//! 2. the raw path under the executable's directory,
//! 3. the raw path with the library extension appended,
//! 4. that extended name under the executable's directory.
//!
//! Steps 3 and 4 are skipped when the file name already carries the extension.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::CacheError;

/// Default extension appended to bare library names.
pub const DEFAULT_LIBRARY_EXTENSION: &str = "dll";

/// Probes candidate locations to turn a raw name into an existing file path.
#[derive(Debug, Clone)]
pub struct PathResolver {
    /// Directory of the running executable, if known.
    base_dir: Option<PathBuf>,

    /// Extension (without the dot) appended to bare library names.
    library_extension: String,
}

impl PathResolver {
    /// Creates a resolver whose base directory is the running executable's directory.
    ///
    /// If the executable path cannot be determined, only the raw-path candidates
    /// are probed.
    pub fn for_current_exe() -> Self {
        let base_dir = std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(Path::to_path_buf));
        if base_dir.is_none() {
            debug!("executable directory unavailable; probing raw paths only");
        }
        Self {
            base_dir,
            library_extension: DEFAULT_LIBRARY_EXTENSION.to_string(),
        }
    }

    /// Creates a resolver that probes `base_dir` in place of the executable's directory.
    pub fn with_base_dir(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: Some(base_dir.into()),
            library_extension: DEFAULT_LIBRARY_EXTENSION.to_string(),
        }
    }

    /// Overrides the extension appended to bare library names.
    ///
    /// A leading dot is ignored, so `".so"` and `"so"` are equivalent.
    pub fn with_library_extension(mut self, ext: &str) -> Self {
        self.library_extension = ext.trim_start_matches('.').to_string();
        self
    }

    /// Returns the directory probed in place of the executable's directory.
    pub fn base_dir(&self) -> Option<&Path> {
        self.base_dir.as_deref()
    }

    /// Returns the library extension (without the dot).
    pub fn library_extension(&self) -> &str {
        &self.library_extension
    }

    /// Returns every location `resolve` would probe for `raw`, in probe order.
    pub fn candidates(&self, raw: &str) -> Vec<PathBuf> {
        let raw_path = PathBuf::from(raw);
        let mut out = vec![raw_path.clone()];
        if let Some(base) = &self.base_dir {
            out.push(base.join(&raw_path));
        }

        if !self.has_library_extension(raw) {
            let extended = PathBuf::from(format!("{raw}.{}", self.library_extension));
            out.push(extended.clone());
            if let Some(base) = &self.base_dir {
                out.push(base.join(extended));
            }
        }
        out
    }

    /// Resolves `raw` to an absolute path of an existing regular file.
    ///
    /// The first existing candidate wins. Fails with [`CacheError::NotFound`]
    /// carrying the raw name when nothing matches.
    pub fn resolve(&self, raw: &str) -> Result<PathBuf, CacheError> {
        if raw.is_empty() {
            return Err(CacheError::invalid("dependency path must not be empty"));
        }

        let candidates = self.candidates(raw);
        for candidate in &candidates {
            if candidate.is_file() {
                let resolved = std::fs::canonicalize(candidate).map_err(|e| CacheError::Io {
                    path: candidate.clone(),
                    source: e,
                })?;
                debug!(raw, resolved = %resolved.display(), "resolved dependency");
                return Ok(resolved);
            }
        }

        Err(CacheError::NotFound {
            raw: raw.to_string(),
            candidates,
        })
    }

    fn has_library_extension(&self, raw: &str) -> bool {
        let marker = format!(".{}", self.library_extension);
        Path::new(raw)
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.contains(&marker))
    }
}

impl Default for PathResolver {
    fn default() -> Self {
        Self::for_current_exe()
    }
}
