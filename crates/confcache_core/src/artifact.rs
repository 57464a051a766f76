//! On-disk snapshot format for a cached configuration object.
//!
//! The payload is encoded with bincode and wrapped in a small header carrying
//! magic bytes, an envelope version, and a checksum of the payload bytes:
//!
//! ```text
//! [u32 LE header length][bincode ArtifactHeader][bincode payload]
//! ```
//!
//! The envelope version describes this layout only. The payload type itself is
//! not versioned: if it no longer decodes, the snapshot is treated as corrupt
//! and the caller rebuilds.

use std::io::Write;
use std::path::Path;

use confcache_common::ContentHash;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::CacheError;

/// Magic bytes identifying a confcache snapshot.
const ARTIFACT_MAGIC: [u8; 4] = *b"CFGC";

/// Current envelope version. Increment on breaking changes to the header layout.
const ARTIFACT_FORMAT_VERSION: u32 = 1;

/// Header prepended to every snapshot for validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactHeader {
    /// Magic bytes: must be `b"CFGC"`.
    pub magic: [u8; 4],

    /// Envelope format version.
    pub format_version: u32,

    /// Content hash of the encoded payload.
    pub checksum: ContentHash,
}

/// Outcome of reading a snapshot.
///
/// `Missing` and `Corrupt` are both cache misses to the caller; they are kept
/// apart so the reason can be logged and reported by tooling.
#[derive(Debug)]
pub enum Retrieved<T> {
    /// The snapshot decoded successfully.
    Hit(T),
    /// No readable file at the path.
    Missing,
    /// The file exists but failed validation or decoding.
    Corrupt(String),
}

impl<T> Retrieved<T> {
    /// Returns the payload on a hit, `None` otherwise.
    pub fn into_option(self) -> Option<T> {
        match self {
            Retrieved::Hit(value) => Some(value),
            Retrieved::Missing | Retrieved::Corrupt(_) => None,
        }
    }
}

/// Writes `payload` as a snapshot at `path`, creating or truncating the file.
///
/// Parent directories are created as needed. Encoding and I/O failures are
/// returned to the caller.
pub fn store<T: Serialize>(payload: &T, path: &Path) -> Result<(), CacheError> {
    if path.as_os_str().is_empty() {
        return Err(CacheError::invalid("snapshot path must not be empty"));
    }

    let body = bincode::serde::encode_to_vec(payload, bincode::config::standard()).map_err(
        |e| CacheError::Serialization {
            reason: e.to_string(),
        },
    )?;

    let header = ArtifactHeader {
        magic: ARTIFACT_MAGIC,
        format_version: ARTIFACT_FORMAT_VERSION,
        checksum: ContentHash::from_bytes(&body),
    };
    let header_bytes = bincode::serde::encode_to_vec(&header, bincode::config::standard())
        .map_err(|e| CacheError::Serialization {
            reason: e.to_string(),
        })?;

    let header_len = header_bytes.len() as u32;
    let mut output = Vec::with_capacity(4 + header_bytes.len() + body.len());
    output.extend_from_slice(&header_len.to_le_bytes());
    output.extend_from_slice(&header_bytes);
    output.extend_from_slice(&body);

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| CacheError::Io {
            path: parent.to_path_buf(),
            source: e,
        })?;
    }

    let io_err = |e: std::io::Error| CacheError::Io {
        path: path.to_path_buf(),
        source: e,
    };
    let mut file = std::fs::File::create(path).map_err(io_err)?;
    file.write_all(&output).map_err(io_err)?;
    file.sync_all().map_err(io_err)?;

    debug!(path = %path.display(), bytes = output.len(), "stored snapshot");
    Ok(())
}

/// Reads and decodes the snapshot at `path`.
///
/// Only an empty path is an error. Every failure to open, validate, or decode
/// the file is reported as [`Retrieved::Missing`] or [`Retrieved::Corrupt`].
pub fn retrieve<T: DeserializeOwned>(path: &Path) -> Result<Retrieved<T>, CacheError> {
    if path.as_os_str().is_empty() {
        return Err(CacheError::invalid("snapshot path must not be empty"));
    }

    let raw = match std::fs::read(path) {
        Ok(raw) => raw,
        Err(e) => {
            debug!(path = %path.display(), error = %e, "snapshot unreadable");
            return Ok(Retrieved::Missing);
        }
    };

    match decode(&raw) {
        Ok(value) => Ok(Retrieved::Hit(value)),
        Err(reason) => {
            warn!(path = %path.display(), %reason, "discarding corrupt snapshot");
            Ok(Retrieved::Corrupt(reason))
        }
    }
}

fn decode<T: DeserializeOwned>(raw: &[u8]) -> Result<T, String> {
    let Some(len_bytes) = raw.get(..4) else {
        return Err(format!("file too short ({} bytes)", raw.len()));
    };
    let header_len = u32::from_le_bytes([len_bytes[0], len_bytes[1], len_bytes[2], len_bytes[3]])
        as usize;
    let header_end = 4usize
        .checked_add(header_len)
        .filter(|end| *end <= raw.len())
        .ok_or_else(|| "truncated header".to_string())?;

    let (header, _): (ArtifactHeader, usize) =
        bincode::serde::decode_from_slice(&raw[4..header_end], bincode::config::standard())
            .map_err(|e| format!("invalid header: {e}"))?;

    if header.magic != ARTIFACT_MAGIC {
        return Err("missing magic bytes".to_string());
    }
    if header.format_version != ARTIFACT_FORMAT_VERSION {
        return Err(format!(
            "envelope version {} (expected {ARTIFACT_FORMAT_VERSION})",
            header.format_version
        ));
    }

    let body = &raw[header_end..];
    let actual = ContentHash::from_bytes(body);
    if actual != header.checksum {
        return Err(format!(
            "checksum mismatch: expected {}, got {actual}",
            header.checksum
        ));
    }

    let (value, consumed): (T, usize) =
        bincode::serde::decode_from_slice(body, bincode::config::standard())
            .map_err(|e| format!("payload decode failed: {e}"))?;
    if consumed != body.len() {
        return Err(format!(
            "{} trailing bytes after payload",
            body.len() - consumed
        ));
    }
    Ok(value)
}
