//! Local mirrored cache of the last exported cookie selection.
//!
//! Cookies are split into [`CHUNK_SIZE`] groups, one JSON file per group
//! (`cookies_chunk_<i>.json`), plus a `cookies_metadata.json` record.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, instrument};

use crate::codec::{CHUNK_SIZE, ChunkMetadata, CodecError, chunk, now_millis, unchunk};
use crate::cookie::CookieRecord;

const METADATA_FILE: &str = "cookies_metadata.json";
const CHUNK_PREFIX: &str = "cookies_chunk_";
const CHUNK_SUFFIX: &str = ".json";

/// Errors reading or writing the cache.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// Filesystem I/O failed.
    #[error("cache I/O failed: {0}")]
    Io(#[from] std::io::Error),
    /// A cache file is not valid JSON.
    #[error("cache file is corrupted: {0}")]
    Json(#[from] serde_json::Error),
    /// Chunking failed.
    #[error(transparent)]
    Codec(#[from] CodecError),
    /// Metadata lists a chunk that is not on disk.
    #[error("cache chunk {index} is missing")]
    MissingChunk {
        /// Zero-based chunk index.
        index: usize,
    },
}

/// Chunked on-disk cache rooted at a directory.
#[derive(Debug, Clone)]
pub struct SnapshotCache {
    dir: PathBuf,
}

impl SnapshotCache {
    /// Cache stored in `dir`.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Cache directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn chunk_path(&self, index: usize) -> PathBuf {
        self.dir.join(format!("{CHUNK_PREFIX}{index}{CHUNK_SUFFIX}"))
    }

    fn metadata_path(&self) -> PathBuf {
        self.dir.join(METADATA_FILE)
    }

    /// Replaces the cached selection with `cookies`.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] when files cannot be written.
    #[instrument(level = "debug", skip_all, fields(dir = %self.dir.display(), count = cookies.len()))]
    pub fn sync(&self, cookies: &[CookieRecord]) -> Result<ChunkMetadata, CacheError> {
        fs::create_dir_all(&self.dir)?;
        let chunks = chunk(cookies, CHUNK_SIZE)?;
        for (index, group) in chunks.iter().enumerate() {
            fs::write(self.chunk_path(index), serde_json::to_vec(group)?)?;
        }
        let removed = self.remove_chunks_from(chunks.len())?;

        let metadata = ChunkMetadata {
            timestamp: now_millis(),
            count: cookies.len(),
            chunks: chunks.len(),
        };
        fs::write(self.metadata_path(), serde_json::to_vec(&metadata)?)?;
        debug!(chunks = metadata.chunks, stale_removed = removed, "cache synced");
        Ok(metadata)
    }

    /// Cache metadata, or `None` when nothing is cached.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] when the metadata file exists but is unreadable.
    pub fn status(&self) -> Result<Option<ChunkMetadata>, CacheError> {
        let path = self.metadata_path();
        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(serde_json::from_slice(&fs::read(path)?)?))
    }

    /// Reassembles the cached selection in its original order.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::MissingChunk`] when a listed chunk is absent, or
    /// another [`CacheError`] when a file is unreadable.
    pub fn load(&self) -> Result<Option<Vec<CookieRecord>>, CacheError> {
        let Some(metadata) = self.status()? else {
            return Ok(None);
        };
        let mut chunks = Vec::with_capacity(metadata.chunks);
        for index in 0..metadata.chunks {
            let path = self.chunk_path(index);
            if !path.exists() {
                return Err(CacheError::MissingChunk { index });
            }
            chunks.push(serde_json::from_slice::<Vec<CookieRecord>>(&fs::read(path)?)?);
        }
        Ok(Some(unchunk(chunks)))
    }

    /// Removes all cache files. Returns how many files were deleted.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Io`] when a file cannot be removed.
    pub fn clear(&self) -> Result<usize, CacheError> {
        let mut removed = self.remove_chunks_from(0)?;
        let metadata = self.metadata_path();
        if metadata.exists() {
            fs::remove_file(metadata)?;
            removed += 1;
        }
        Ok(removed)
    }

    fn remove_chunks_from(&self, first_stale: usize) -> Result<usize, CacheError> {
        if !self.dir.exists() {
            return Ok(0);
        }
        let mut removed = 0;
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            let name = entry.file_name();
            let Some(index) = name
                .to_str()
                .and_then(|n| n.strip_prefix(CHUNK_PREFIX))
                .and_then(|n| n.strip_suffix(CHUNK_SUFFIX))
                .and_then(|n| n.parse::<usize>().ok())
            else {
                continue;
            };
            if index >= first_stale {
                fs::remove_file(entry.path())?;
                removed += 1;
            }
        }
        Ok(removed)
    }
}
