//! Persistent cache for expensive-to-build configuration objects.
//!
//! A configuration object (for example an ORM's assembled mapping model) is
//! serialized to a file in a temp directory together with the list of files it
//! was built from. On the next start the snapshot is reused unless one of those
//! dependency files has been modified since. The cache is fail-open: a corrupt
//! or unreadable snapshot looks exactly like a miss, so the worst case is a
//! rebuild, never a failed startup.

#![warn(missing_docs)]

pub mod artifact;
pub mod cache;
pub mod deps;
pub mod error;
pub mod key;
pub mod resolver;

pub use artifact::Retrieved;
pub use cache::{CacheSettings, CacheStatus, ConfigurationCache, Freshness, Lookup};
pub use deps::{DependencySet, DependencyTracker, NO_DEPENDENCIES};
pub use error::CacheError;
pub use key::{CacheKey, Namespace};
pub use resolver::PathResolver;
