//! XXH3-128 digests for snapshot checksums and namespace discriminators.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Width of a full digest rendered as lowercase hex.
const HEX_WIDTH: usize = 32;

/// A 128-bit XXH3 digest.
///
/// Snapshot headers carry one over the encoded payload, so a truncated or
/// rewritten payload is caught before decoding. A digest of a namespace label
/// also yields the short token that keeps two applications' snapshot files
/// apart in a shared temp directory.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentHash([u8; 16]);

impl ContentHash {
    /// Digests `data` with XXH3-128.
    pub fn from_bytes(data: &[u8]) -> Self {
        Self(xxhash_rust::xxh3::xxh3_128(data).to_le_bytes())
    }

    /// Returns the leading `len` hex characters, for use in file names.
    ///
    /// Lengths past the full rendering return the whole digest.
    pub fn hex_prefix(&self, len: usize) -> String {
        let mut hex = self.to_string();
        hex.truncate(len.min(HEX_WIDTH));
        hex
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.iter().try_for_each(|b| write!(f, "{b:02x}"))
    }
}

impl fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentHash({})", self.hex_prefix(8))
    }
}
