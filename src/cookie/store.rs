//! Cookie store interface and its in-memory and file-backed implementations.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use tracing::{debug, instrument, warn};
use url::Url;

use super::import::{
    CookieFileFormat, CookieParseError, is_expired, parse_cookie_file, render_netscape, unix_now,
};
use super::record::{CookieId, CookieRecord};

/// Errors from listing or writing cookies.
#[derive(Debug, thiserror::Error)]
pub enum CookieStoreError {
    /// The record cannot be written as given.
    #[error("cookie {identity} rejected: {reason}")]
    Rejected {
        /// `domain|name|path` of the rejected record.
        identity: String,
        /// Why the store refused it.
        reason: String,
    },
    /// Backing file I/O failed.
    #[error("cookie store I/O failed: {0}")]
    Io(#[from] std::io::Error),
    /// Backing file could not be parsed.
    #[error(transparent)]
    Parse(#[from] CookieParseError),
    /// Backing file could not be serialized.
    #[error("failed to serialize cookies: {0}")]
    Json(#[from] serde_json::Error),
}

/// A browser-like cookie jar the sync engine reads from and writes to.
#[async_trait]
pub trait CookieStore: Send + Sync {
    /// Returns every cookie currently stored.
    async fn list(&self) -> Result<Vec<CookieRecord>, CookieStoreError>;

    /// Writes a cookie against `url`, replacing any cookie with the same identity.
    async fn set(&self, url: &Url, record: &CookieRecord) -> Result<(), CookieStoreError>;
}

/// Validates a record the way a browser cookie API would before accepting it.
fn check_writable(url: &Url, record: &CookieRecord) -> Result<(), CookieStoreError> {
    let reject = |reason: &str| CookieStoreError::Rejected {
        identity: record.id().to_string(),
        reason: reason.to_string(),
    };
    if record.name.trim().is_empty() {
        return Err(reject("cookie name is empty"));
    }
    if record.domain.trim().is_empty() || record.host().is_empty() {
        return Err(reject("cookie domain is empty"));
    }
    if !url
        .host_str()
        .is_some_and(|host| host.eq_ignore_ascii_case(record.host()))
    {
        return Err(reject("target URL host does not match cookie domain"));
    }
    if record.secure && url.scheme() != "https" {
        return Err(reject("secure cookie requires an https URL"));
    }
    Ok(())
}

/// Ordered upsert keyed by identity: replaced cookies keep their position.
#[derive(Debug, Default)]
struct CookieJar {
    order: Vec<CookieRecord>,
    index: HashMap<CookieId, usize>,
}

impl CookieJar {
    fn from_records(records: Vec<CookieRecord>) -> Self {
        let mut jar = Self::default();
        for record in records {
            jar.upsert(record);
        }
        jar
    }

    fn upsert(&mut self, record: CookieRecord) {
        let id = record.id();
        if let Some(&position) = self.index.get(&id) {
            self.order[position] = record;
        } else {
            self.index.insert(id, self.order.len());
            self.order.push(record);
        }
    }

    fn remove(&mut self, id: &CookieId) -> bool {
        let Some(position) = self.index.remove(id) else {
            return false;
        };
        self.order.remove(position);
        for slot in self.index.values_mut() {
            if *slot > position {
                *slot -= 1;
            }
        }
        true
    }

    /// Applies a write the way a browser does: an already-expired cookie
    /// deletes any stored cookie with the same identity instead of being kept.
    fn write(&mut self, record: &CookieRecord) {
        if is_expired(record, unix_now()) {
            if self.remove(&record.id()) {
                debug!(cookie = %record.id(), "expired write removed stored cookie");
            }
        } else {
            self.upsert(record.clone());
        }
    }
}

/// In-process cookie store.
#[derive(Debug, Default)]
pub struct MemoryCookieStore {
    jar: Mutex<CookieJar>,
}

impl MemoryCookieStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-populated with `records` (identity duplicates collapse, last wins).
    #[must_use]
    pub fn with_records(records: Vec<CookieRecord>) -> Self {
        Self {
            jar: Mutex::new(CookieJar::from_records(records)),
        }
    }

    /// Snapshot of the stored cookies.
    #[must_use]
    pub fn records(&self) -> Vec<CookieRecord> {
        self.jar
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .order
            .clone()
    }
}

#[async_trait]
impl CookieStore for MemoryCookieStore {
    async fn list(&self) -> Result<Vec<CookieRecord>, CookieStoreError> {
        Ok(self.records())
    }

    async fn set(&self, url: &Url, record: &CookieRecord) -> Result<(), CookieStoreError> {
        check_writable(url, record)?;
        self.jar
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .write(record);
        Ok(())
    }
}

/// Cookie store persisted to a file.
///
/// Reads JSON (including browser-extension exports) and Netscape `cookies.txt`.
/// Writes keep the format the file was read in; new files are JSON.
#[derive(Debug)]
pub struct FileCookieStore {
    path: PathBuf,
    write_lock: tokio::sync::Mutex<()>,
}

impl FileCookieStore {
    /// Opens a store at `path`. The file does not need to exist yet.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Backing file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<(Vec<CookieRecord>, CookieFileFormat), CookieStoreError> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                return Ok((Vec::new(), CookieFileFormat::Json));
            }
            Err(error) => return Err(error.into()),
        };
        if raw.trim().is_empty() {
            return Ok((Vec::new(), CookieFileFormat::Json));
        }
        let parsed = match parse_cookie_file(&raw) {
            Ok(parsed) => parsed,
            Err(CookieParseError::NoCookiesFound { malformed_count }) => {
                warn!(
                    path = %self.path.display(),
                    malformed_count,
                    "cookie file holds no usable cookies, treating it as empty"
                );
                return Ok((Vec::new(), detect_format(&raw)));
            }
            Err(error) => return Err(error.into()),
        };
        for warning in &parsed.warnings {
            debug!(path = %self.path.display(), %warning, "skipped cookie entry");
        }
        Ok((parsed.cookies, parsed.format))
    }

    async fn store(
        &self,
        cookies: &[CookieRecord],
        format: CookieFileFormat,
    ) -> Result<(), CookieStoreError> {
        let payload = match format {
            CookieFileFormat::Json => serde_json::to_string_pretty(cookies)?,
            CookieFileFormat::Netscape => render_netscape(cookies),
        };
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        tokio::fs::write(&self.path, payload).await?;
        Ok(())
    }
}

fn detect_format(raw: &str) -> CookieFileFormat {
    let trimmed = raw.trim_start();
    if trimmed.starts_with('[') || trimmed.starts_with('{') {
        CookieFileFormat::Json
    } else {
        CookieFileFormat::Netscape
    }
}

#[async_trait]
impl CookieStore for FileCookieStore {
    #[instrument(level = "debug", skip(self), fields(path = %self.path.display()))]
    async fn list(&self) -> Result<Vec<CookieRecord>, CookieStoreError> {
        let (cookies, _) = self.load().await?;
        Ok(CookieJar::from_records(cookies).order)
    }

    #[instrument(level = "debug", skip(self, record), fields(path = %self.path.display(), cookie = %record.id()))]
    async fn set(&self, url: &Url, record: &CookieRecord) -> Result<(), CookieStoreError> {
        check_writable(url, record)?;
        let _guard = self.write_lock.lock().await;
        let (cookies, format) = self.load().await?;
        let mut jar = CookieJar::from_records(cookies);
        jar.write(record);
        self.store(&jar.order, format).await
    }
}
