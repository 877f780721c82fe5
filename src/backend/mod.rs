//! Storage backends for encrypted snapshot blobs.
//!
//! A backend exposes the capability set `{save, fetch, locate}`:
//! - [`LocalBackend`] writes the blob to a downloads directory and supports
//!   neither fetch nor locate (import from a local file goes through the
//!   import flow with the file contents).
//! - [`RemoteDocumentBackend`] stores the blob in a Gist-like document and
//!   reconciles create/update against the provider on every save.

mod config;
mod error;
pub mod http;
mod local;
mod remote;

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;

use crate::activity::LogSink;

pub use config::{
    BackendConfig, DEFAULT_API_URL, DEFAULT_COLLECTION, DEFAULT_DESCRIPTION, LocalConfig,
    RemoteDocumentConfig,
};
pub use error::BackendError;
pub use local::{LocalBackend, default_downloads_dir};
pub use remote::{MAX_LIST_PAGES, RemoteDocumentBackend, SaveState};

/// Canonical blob filename.
pub const DEFAULT_FILENAME: &str = "cookies-encrypted.enc.base64";

/// A storage target for encoded blobs.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Current configuration, including any document id learned while saving.
    fn config(&self) -> BackendConfig;

    /// Stores `content` under `filename`. Returns whether the save succeeded;
    /// failures are logged, never propagated.
    async fn save(&mut self, filename: &str, content: &str) -> bool;

    /// Reads `filename` from the document `document_id`.
    async fn fetch(&self, document_id: &str, filename: &str) -> Result<String, BackendError>;

    /// Finds the id of a document containing `filename`.
    async fn locate(&self, filename: &str) -> Result<Option<String>, BackendError>;

    /// Checks the backend is reachable and usable. Returns a human-readable
    /// description of the target on success.
    async fn test_connection(&self) -> Result<String, BackendError>;
}

/// Creates the backend described by `config`.
///
/// # Errors
///
/// Returns [`BackendError::NotConfigured`] when remote settings are incomplete
/// or the HTTP client cannot be built.
pub fn build_backend(
    config: &BackendConfig,
    sink: Arc<dyn LogSink>,
) -> Result<Box<dyn Backend>, BackendError> {
    match config {
        BackendConfig::Local(local) => {
            let dir = local
                .downloads_dir
                .clone()
                .unwrap_or_else(default_downloads_dir);
            Ok(Box::new(LocalBackend::new(dir, sink)))
        }
        BackendConfig::RemoteDocument(remote) => {
            let missing = remote.missing_fields();
            if !missing.is_empty() {
                return Err(BackendError::NotConfigured(format!(
                    "remote document settings incomplete, missing: {}",
                    missing.join(", ")
                )));
            }
            let client = http::build_http_client()?;
            Ok(Box::new(RemoteDocumentBackend::new(
                remote.clone(),
                client,
                sink,
            )))
        }
    }
}

/// Resolves where a local backend without an explicit directory writes.
pub(crate) fn fallback_dir() -> PathBuf {
    std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}
