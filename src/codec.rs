//! Snapshot serialization, blob text encoding, and cache chunking.

use std::time::{SystemTime, UNIX_EPOCH};

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};

use crate::cookie::CookieRecord;

/// Cookies per chunk in the local mirrored cache.
pub const CHUNK_SIZE: usize = 50;

/// Errors encoding or decoding snapshots and blobs.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// Snapshot text is not valid snapshot JSON.
    #[error("invalid snapshot JSON: {0}")]
    Json(#[from] serde_json::Error),
    /// Blob text is not valid base64.
    #[error("invalid base64 blob: {0}")]
    Base64(#[from] base64::DecodeError),
    /// Chunk size must be at least one.
    #[error("chunk size must be at least 1")]
    InvalidChunkSize,
}

/// A point-in-time export of selected cookies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    /// Selected cookies in selection order.
    #[serde(default)]
    pub cookies: Vec<CookieRecord>,
    /// Creation time in epoch milliseconds.
    #[serde(default)]
    pub timestamp: i64,
    /// Number of cookies at creation time.
    #[serde(default)]
    pub count: usize,
    /// Fingerprint of the exporting environment.
    #[serde(default)]
    pub browser_id: String,
}

impl Snapshot {
    /// Builds a snapshot stamped with the current time.
    #[must_use]
    pub fn new(cookies: Vec<CookieRecord>, browser_id: impl Into<String>) -> Self {
        Self {
            count: cookies.len(),
            cookies,
            timestamp: now_millis(),
            browser_id: browser_id.into(),
        }
    }

    /// `count` when set, otherwise the number of cookies present.
    #[must_use]
    pub fn effective_count(&self) -> usize {
        if self.count == 0 {
            self.cookies.len()
        } else {
            self.count
        }
    }
}

/// Metadata record written beside cache chunks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    /// Sync time in epoch milliseconds.
    pub timestamp: i64,
    /// Total cookies across all chunks.
    pub count: usize,
    /// Number of chunk files.
    pub chunks: usize,
}

/// Current time in epoch milliseconds.
#[must_use]
pub fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX))
}

/// Serializes a snapshot to compact JSON.
///
/// # Errors
///
/// Returns [`CodecError::Json`] if serialization fails.
pub fn serialize(snapshot: &Snapshot) -> Result<String, CodecError> {
    Ok(serde_json::to_string(snapshot)?)
}

/// Parses a snapshot. A missing `cookies` key yields an empty list.
///
/// # Errors
///
/// Returns [`CodecError::Json`] on malformed JSON.
pub fn deserialize(text: &str) -> Result<Snapshot, CodecError> {
    Ok(serde_json::from_str(text)?)
}

/// Parses a snapshot from decrypted bytes.
///
/// # Errors
///
/// Returns [`CodecError::Json`] on malformed JSON or invalid UTF-8.
pub fn deserialize_bytes(bytes: &[u8]) -> Result<Snapshot, CodecError> {
    Ok(serde_json::from_slice(bytes)?)
}

/// Standard base64 of the raw blob bytes.
#[must_use]
pub fn encode_blob(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// Decodes base64 blob text, tolerating surrounding whitespace.
///
/// # Errors
///
/// Returns [`CodecError::Base64`] on invalid base64.
pub fn decode_blob(text: &str) -> Result<Vec<u8>, CodecError> {
    Ok(STANDARD.decode(text.trim())?)
}

/// Splits `items` into consecutive groups of at most `size`.
///
/// # Errors
///
/// Returns [`CodecError::InvalidChunkSize`] when `size` is zero.
pub fn chunk<T: Clone>(items: &[T], size: usize) -> Result<Vec<Vec<T>>, CodecError> {
    if size == 0 {
        return Err(CodecError::InvalidChunkSize);
    }
    Ok(items.chunks(size).map(<[T]>::to_vec).collect())
}

/// Concatenates chunks back into one ordered list.
#[must_use]
pub fn unchunk<T>(chunks: Vec<Vec<T>>) -> Vec<T> {
    chunks.into_iter().flatten().collect()
}
