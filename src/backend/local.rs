//! Local download backend.

use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, instrument, warn};

use crate::activity::LogSink;

use super::{Backend, BackendConfig, BackendError, LocalConfig, fallback_dir};

/// Writes blobs as files in a downloads directory, overwriting any existing file.
pub struct LocalBackend {
    dir: PathBuf,
    sink: Arc<dyn LogSink>,
}

impl std::fmt::Debug for LocalBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalBackend").field("dir", &self.dir).finish()
    }
}

impl LocalBackend {
    /// Creates a backend writing into `dir`.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>, sink: Arc<dyn LogSink>) -> Self {
        Self {
            dir: dir.into(),
            sink,
        }
    }

    /// Target directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    async fn write(&self, filename: &str, content: &str) -> Result<PathBuf, BackendError> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.dir.join(filename);
        tokio::fs::write(&path, content.as_bytes()).await?;
        Ok(path)
    }

    fn unsupported(operation: &'static str) -> BackendError {
        BackendError::Unsupported {
            backend: "local",
            operation,
            suggestion: "Import the downloaded file directly with --file",
        }
    }
}

/// The user's downloads directory: `$XDG_DOWNLOAD_DIR`, then `$HOME/Downloads`,
/// then `%USERPROFILE%\Downloads`, then the current directory.
#[must_use]
pub fn default_downloads_dir() -> PathBuf {
    let non_blank = |name: &str| {
        env::var_os(name)
            .filter(|value| !value.to_string_lossy().trim().is_empty())
            .map(PathBuf::from)
    };
    non_blank("XDG_DOWNLOAD_DIR")
        .or_else(|| non_blank("HOME").map(|home| home.join("Downloads")))
        .or_else(|| non_blank("USERPROFILE").map(|home| home.join("Downloads")))
        .unwrap_or_else(fallback_dir)
}

#[async_trait]
impl Backend for LocalBackend {
    fn name(&self) -> &'static str {
        "local"
    }

    fn config(&self) -> BackendConfig {
        BackendConfig::Local(LocalConfig {
            downloads_dir: Some(self.dir.clone()),
        })
    }

    #[instrument(level = "debug", skip(self, content), fields(dir = %self.dir.display(), content_len = content.len()))]
    async fn save(&mut self, filename: &str, content: &str) -> bool {
        match self.write(filename, content).await {
            Ok(path) => {
                info!(path = %path.display(), "blob written");
                self.sink.log(&format!("Saved {}", path.display()));
                true
            }
            Err(error) => {
                warn!(dir = %self.dir.display(), %error, "local save failed");
                self.sink.log(&format!("Local save failed: {error}"));
                false
            }
        }
    }

    async fn fetch(&self, _document_id: &str, _filename: &str) -> Result<String, BackendError> {
        Err(Self::unsupported("fetch"))
    }

    async fn locate(&self, _filename: &str) -> Result<Option<String>, BackendError> {
        Err(Self::unsupported("locate"))
    }

    async fn test_connection(&self) -> Result<String, BackendError> {
        Ok(format!("saving to {}", self.dir.display()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::activity::ActivityLog;

    #[tokio::test]
    async fn test_save_overwrites_existing_file() {
        let dir = TempDir::new().unwrap();
        let log = Arc::new(ActivityLog::new());
        let mut backend = LocalBackend::new(dir.path(), log.clone());

        assert!(backend.save("blob.base64", "first").await);
        assert!(backend.save("blob.base64", "second").await);

        let content = std::fs::read_to_string(dir.path().join("blob.base64")).unwrap();
        assert_eq!(content, "second");
        assert!(log.entries()[0].message.starts_with("Saved "));
    }

    #[tokio::test]
    async fn test_save_failure_returns_false() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, "file").unwrap();
        let log = Arc::new(ActivityLog::new());
        let mut backend = LocalBackend::new(&blocker, log.clone());

        assert!(!backend.save("blob.base64", "data").await);
        assert!(log.entries()[0].message.starts_with("Local save failed"));
    }

    #[tokio::test]
    async fn test_fetch_and_locate_are_unsupported() {
        let backend = LocalBackend::new("/tmp", Arc::new(ActivityLog::new()));
        assert!(matches!(
            backend.fetch("id", "f").await,
            Err(BackendError::Unsupported { operation: "fetch", .. })
        ));
        assert!(matches!(
            backend.locate("f").await,
            Err(BackendError::Unsupported { operation: "locate", .. })
        ));
    }
}
