//! Parsing and validation of `confcache.toml` settings files.
//!
//! Every section is optional; an empty file yields the same cache as
//! [`CacheSettings::default`](confcache_core::CacheSettings).

#![warn(missing_docs)]

pub mod error;
pub mod loader;
pub mod types;

pub use error::ConfigError;
pub use loader::{load_config, load_config_from_str, CONFIG_FILE_NAME};
pub use types::*;
