//! Error types for cache operations.

use std::path::PathBuf;

/// Errors that abort a cache operation.
///
/// Only conditions that make the freshness check impossible or that indicate
/// a caller bug surface here. A corrupt or missing cache artifact is never an
/// error: it is reported as a cache miss.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// An I/O error occurred while writing the cache file or reading a
    /// dependency's metadata.
    #[error("cache I/O error at {path}: {source}")]
    Io {
        /// The path that caused the error.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// A dependency could not be located at any probed location.
    #[error("file not found: {raw} (probed {})", format_candidates(.candidates))]
    NotFound {
        /// The name or path as supplied by the caller.
        raw: String,
        /// Every location that was probed, in probe order.
        candidates: Vec<PathBuf>,
    },

    /// A caller supplied an empty or malformed key or path.
    #[error("invalid argument: {reason}")]
    InvalidArgument {
        /// What was wrong with the argument.
        reason: String,
    },

    /// The payload could not be encoded for storage.
    #[error("serialization error: {reason}")]
    Serialization {
        /// Description of the serialization failure.
        reason: String,
    },
}

impl CacheError {
    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            reason: reason.into(),
        }
    }
}

fn format_candidates(candidates: &[PathBuf]) -> String {
    candidates
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
