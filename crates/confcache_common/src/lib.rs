//! Shared foundational types used across the confcache workspace.
//!
//! Currently this is the content hash used both for artifact integrity checks
//! and for deriving the per-application cache file discriminator.

#![warn(missing_docs)]

pub mod hash;

pub use hash::ContentHash;
