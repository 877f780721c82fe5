//! Export and import orchestration.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, UNIX_EPOCH};

use tracing::{info, instrument, warn};

use crate::activity::LogSink;
use crate::backend::{BackendConfig, BackendError, DEFAULT_FILENAME, build_backend};
use crate::cache::SnapshotCache;
use crate::codec::{self, Snapshot};
use crate::cookie::{CookieRecord, CookieStore};
use crate::crypto::{self, EncryptedBlob};
use crate::fingerprint::{EnvironmentDescriptor, is_self_import};
use crate::settings::SettingsStore;

use super::apply::{ApplyReport, apply_selected};
use super::error::SyncError;
use super::selection::Selection;
use super::stage::{ExportStage, ImportStage, StageTrace};

const BROWSER_ID_PREVIEW_LEN: usize = 16;

/// Where an import reads its blob from.
#[derive(Debug, Clone)]
pub enum ImportSource {
    /// The configured backend.
    Backend,
    /// Blob text supplied directly, e.g. a downloaded file.
    Blob {
        /// Label shown in the import summary.
        source_name: String,
        /// Base64 blob text.
        content: String,
    },
}

/// Result of a successful export.
#[derive(Debug)]
pub struct ExportReport {
    /// Stages visited.
    pub trace: StageTrace<ExportStage>,
    /// Number of cookies exported.
    pub count: usize,
    /// Backend that stored the blob.
    pub backend: &'static str,
    /// Backend configuration after the save (includes any learned document id).
    pub config: BackendConfig,
    /// Length of the base64 blob text.
    pub encoded_len: usize,
}

/// What the user sees before choosing cookies to apply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportSummary {
    /// Where the blob came from.
    pub source: String,
    /// Cookie count (`count`, or the list length when unset).
    pub total: usize,
    /// Export time as an HTTP date, when the snapshot carries one.
    pub exported_at: Option<String>,
    /// First characters of the exporting environment's id.
    pub browser_id_preview: String,
    /// Whether the snapshot was exported from this environment.
    pub self_import: bool,
}

impl fmt::Display for ImportSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Source:      {}", self.source)?;
        writeln!(f, "Cookies:     {}", self.total)?;
        writeln!(
            f,
            "Exported:    {}",
            self.exported_at.as_deref().unwrap_or("unknown")
        )?;
        if self.browser_id_preview.is_empty() {
            write!(f, "Browser ID:  unknown")?;
        } else {
            write!(f, "Browser ID:  {}...", self.browser_id_preview)?;
        }
        if self.self_import {
            write!(
                f,
                "\nWarning: this snapshot was exported from this environment; importing it may overwrite newer cookies"
            )?;
        }
        Ok(())
    }
}

/// A decrypted snapshot waiting for the user's selection.
#[derive(Debug)]
pub struct PendingImport {
    /// The decrypted snapshot.
    pub snapshot: Snapshot,
    /// Summary for display.
    pub summary: ImportSummary,
    /// Stages visited so far (ends at `AwaitingSelection`).
    pub trace: StageTrace<ImportStage>,
}

/// Result of applying an import selection.
#[derive(Debug)]
pub struct ImportReport {
    /// Stages visited (ends at `Done` or `PartiallyFailed`).
    pub trace: StageTrace<ImportStage>,
    /// Per-cookie outcome.
    pub apply: ApplyReport,
}

/// Orchestrates export and import against injected collaborators.
pub struct SyncEngine {
    cookies: Arc<dyn CookieStore>,
    settings: Arc<dyn SettingsStore>,
    sink: Arc<dyn LogSink>,
    browser_id: String,
    cache: Option<SnapshotCache>,
}

impl fmt::Debug for SyncEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncEngine")
            .field("browser_id", &self.browser_id)
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}

impl SyncEngine {
    /// Creates an engine fingerprinted with the current environment.
    #[must_use]
    pub fn new(
        cookies: Arc<dyn CookieStore>,
        settings: Arc<dyn SettingsStore>,
        sink: Arc<dyn LogSink>,
    ) -> Self {
        Self {
            cookies,
            settings,
            sink,
            browser_id: EnvironmentDescriptor::current().browser_id(),
            cache: None,
        }
    }

    /// Uses `environment` for the browser id instead of the current process.
    #[must_use]
    pub fn with_environment(mut self, environment: &EnvironmentDescriptor) -> Self {
        self.browser_id = environment.browser_id();
        self
    }

    /// Mirrors every exported selection into `cache`.
    #[must_use]
    pub fn with_cache(mut self, cache: SnapshotCache) -> Self {
        self.cache = Some(cache);
        self
    }

    /// This environment's browser id.
    #[must_use]
    pub fn browser_id(&self) -> &str {
        &self.browser_id
    }

    /// Stored backend configuration, or the local default when none is stored.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Settings`] when settings cannot be read.
    pub fn backend_config(&self) -> Result<BackendConfig, SyncError> {
        Ok(self
            .settings
            .load()?
            .and_then(|settings| settings.backend)
            .unwrap_or_default())
    }

    /// Exports the selected cookies to the configured backend.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Precondition`] for a missing password or empty
    /// selection, [`SyncError::SaveFailed`] when the backend rejects the blob,
    /// or the underlying component error.
    #[instrument(level = "debug", skip(self, password))]
    pub async fn export(
        &self,
        selection: &Selection,
        password: &str,
    ) -> Result<ExportReport, SyncError> {
        let mut trace = StageTrace::start("export", ExportStage::Idle);
        match self.run_export(&mut trace, selection, password).await {
            Ok((count, backend, config, encoded_len)) => {
                trace.enter(ExportStage::Done);
                info!(count, backend, "export finished");
                self.sink
                    .log(&format!("Export completed: {count} cookies saved via {backend}"));
                Ok(ExportReport {
                    trace,
                    count,
                    backend,
                    config,
                    encoded_len,
                })
            }
            Err(error) => {
                trace.enter(ExportStage::Failed);
                warn!(%error, kind = %error.kind(), "export failed");
                self.sink.log(&format!("Export failed: {error}"));
                Err(error)
            }
        }
    }

    async fn run_export(
        &self,
        trace: &mut StageTrace<ExportStage>,
        selection: &Selection,
        password: &str,
    ) -> Result<(usize, &'static str, BackendConfig, usize), SyncError> {
        let password = require_password(password)?;

        trace.enter(ExportStage::Collecting);
        let selected = selection.select(&self.cookies.list().await?);
        if selected.is_empty() {
            return Err(SyncError::precondition("No cookies selected for export"));
        }
        self.sink
            .log(&format!("Exporting {} selected cookies", selected.len()));

        trace.enter(ExportStage::Serializing);
        let snapshot = Snapshot::new(selected, self.browser_id.clone());
        let json = codec::serialize(&snapshot)?;

        trace.enter(ExportStage::Encrypting);
        let blob = crypto::encrypt(json.as_bytes(), password)?;

        trace.enter(ExportStage::Encoding);
        let encoded = codec::encode_blob(blob.as_bytes());

        trace.enter(ExportStage::Saving);
        let mut settings = self.settings.load()?.unwrap_or_default();
        let config = if let Some(config) = settings.backend.clone() {
            config
        } else {
            self.sink
                .log("No backend configured, defaulting to local download");
            let config = BackendConfig::default();
            settings.backend = Some(config.clone());
            self.settings.save(&settings)?;
            config
        };

        let mut backend = build_backend(&config, Arc::clone(&self.sink))?;
        if !backend.save(DEFAULT_FILENAME, &encoded).await {
            return Err(SyncError::SaveFailed {
                backend: backend.name(),
            });
        }

        let updated = backend.config();
        if matches!(updated, BackendConfig::RemoteDocument(_)) && updated != config {
            settings.backend = Some(updated.clone());
            self.settings.save(&settings)?;
            self.sink.log("Document id saved to settings");
        }

        self.mirror_to_cache(&snapshot.cookies);
        Ok((snapshot.count, backend.name(), updated, encoded.len()))
    }

    fn mirror_to_cache(&self, cookies: &[CookieRecord]) {
        let Some(cache) = &self.cache else {
            return;
        };
        match cache.sync(cookies) {
            Ok(metadata) => {
                self.sink.log(&format!(
                    "Local cache updated: {} cookies in {} chunks",
                    metadata.count, metadata.chunks
                ));
            }
            Err(error) => warn!(%error, "local cache update failed"),
        }
    }

    /// Fetches, decrypts and parses a snapshot without applying anything.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Precondition`] when the password or backend
    /// settings are missing, [`SyncError::Backend`] for lookup and fetch
    /// failures (including `NotFound` when no document holds the blob),
    /// [`SyncError::Cipher`] on a wrong password, or [`SyncError::Codec`]
    /// on malformed data.
    #[instrument(level = "debug", skip(self, source, password))]
    pub async fn fetch_import(
        &self,
        source: ImportSource,
        password: &str,
    ) -> Result<PendingImport, SyncError> {
        let mut trace = StageTrace::start("import", ImportStage::Idle);
        match self.run_fetch(&mut trace, source, password).await {
            Ok((snapshot, source)) => {
                trace.enter(ImportStage::AwaitingSelection);
                let summary = self.summarize(&snapshot, source);
                self.sink.log(&format!(
                    "Decrypted {} cookies from {}",
                    summary.total, summary.source
                ));
                if summary.self_import {
                    warn!("snapshot was exported from this environment");
                    self.sink
                        .log("Warning: importing cookies exported from this same environment");
                }
                Ok(PendingImport {
                    snapshot,
                    summary,
                    trace,
                })
            }
            Err(error) => {
                trace.enter(ImportStage::Failed);
                warn!(%error, kind = %error.kind(), "import failed");
                self.sink.log(&format!("Import failed: {error}"));
                Err(error)
            }
        }
    }

    async fn run_fetch(
        &self,
        trace: &mut StageTrace<ImportStage>,
        source: ImportSource,
        password: &str,
    ) -> Result<(Snapshot, String), SyncError> {
        let password = require_password(password)?;

        trace.enter(ImportStage::ConfigCheck);
        let (source_name, encoded) = match source {
            ImportSource::Blob {
                source_name,
                content,
            } => {
                trace.enter(ImportStage::Fetching);
                (source_name, content)
            }
            ImportSource::Backend => self.fetch_from_backend(trace).await?,
        };
        self.sink.log(&format!(
            "Retrieved {} characters from {source_name}",
            encoded.len()
        ));

        trace.enter(ImportStage::Decrypting);
        let blob = EncryptedBlob::from_bytes(codec::decode_blob(&encoded)?)?;
        let plaintext = crypto::decrypt(&blob, password)?;

        trace.enter(ImportStage::Parsing);
        let snapshot = codec::deserialize_bytes(&plaintext)?;
        Ok((snapshot, source_name))
    }

    async fn fetch_from_backend(
        &self,
        trace: &mut StageTrace<ImportStage>,
    ) -> Result<(String, String), SyncError> {
        let mut settings = self.settings.load()?.unwrap_or_default();
        let Some(config) = settings.backend.clone() else {
            return Err(SyncError::precondition(
                "No backend configured: configure backend settings first",
            ));
        };
        self.sink
            .log(&format!("Backend provider: {}", config.provider()));
        let backend = build_backend(&config, Arc::clone(&self.sink))?;

        let document_id = match config {
            BackendConfig::RemoteDocument(mut remote) => {
                if let Some(id) = remote.document_id.clone() {
                    id
                } else {
                    trace.enter(ImportStage::Locating);
                    let id = backend
                        .locate(DEFAULT_FILENAME)
                        .await?
                        .ok_or_else(|| BackendError::no_document_for(DEFAULT_FILENAME))?;
                    self.sink.log(&format!("Found document: {id}"));
                    remote.set_document_id(Some(id.clone()));
                    settings.backend = Some(BackendConfig::RemoteDocument(remote));
                    self.settings.save(&settings)?;
                    self.sink.log("Document id saved to settings");
                    id
                }
            }
            BackendConfig::Local(_) => String::new(),
        };

        trace.enter(ImportStage::Fetching);
        let content = backend.fetch(&document_id, DEFAULT_FILENAME).await?;
        Ok((format!("remote document {document_id}"), content))
    }

    fn summarize(&self, snapshot: &Snapshot, source: String) -> ImportSummary {
        let exported_at = u64::try_from(snapshot.timestamp)
            .ok()
            .filter(|millis| *millis > 0)
            .map(|millis| httpdate::fmt_http_date(UNIX_EPOCH + Duration::from_millis(millis)));
        ImportSummary {
            source,
            total: snapshot.effective_count(),
            exported_at,
            browser_id_preview: snapshot
                .browser_id
                .chars()
                .take(BROWSER_ID_PREVIEW_LEN)
                .collect(),
            self_import: is_self_import(&snapshot.browser_id, &self.browser_id),
        }
    }

    /// Applies the selected cookies of a pending import to the cookie store.
    ///
    /// Every cookie is written independently; failures are collected in the
    /// report and end the import in `PartiallyFailed`.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Precondition`] when the selection is empty.
    #[instrument(level = "debug", skip(self, pending))]
    pub async fn apply(
        &self,
        pending: PendingImport,
        selection: &Selection,
    ) -> Result<ImportReport, SyncError> {
        let PendingImport {
            snapshot,
            mut trace,
            ..
        } = pending;
        let selected = selection.select(&snapshot.cookies);
        if selected.is_empty() {
            trace.enter(ImportStage::Failed);
            self.sink.log("Import failed: no cookies selected");
            return Err(SyncError::precondition("No cookies selected for import"));
        }

        trace.enter(ImportStage::Applying);
        let report = apply_selected(self.cookies.as_ref(), &selected).await;
        self.sink.log(&format!(
            "Import completed: {} successful, {} failed",
            report.success_count, report.fail_count
        ));
        if let Some(samples) = report.failure_samples() {
            self.sink.log(&format!("Failed cookies: {samples}"));
        }

        trace.enter(if report.is_complete() {
            ImportStage::Done
        } else {
            ImportStage::PartiallyFailed
        });
        info!(
            success = report.success_count,
            failed = report.fail_count,
            "import applied"
        );
        Ok(ImportReport {
            trace,
            apply: report,
        })
    }

    /// Fetches a snapshot and applies `selection` in one call.
    ///
    /// # Errors
    ///
    /// See [`SyncEngine::fetch_import`] and [`SyncEngine::apply`].
    pub async fn import(
        &self,
        source: ImportSource,
        password: &str,
        selection: &Selection,
    ) -> Result<ImportReport, SyncError> {
        let pending = self.fetch_import(source, password).await?;
        self.apply(pending, selection).await
    }

    /// Checks the configured backend is usable.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Backend`] when the backend cannot be reached or
    /// rejects the credentials.
    pub async fn test_connection(&self) -> Result<String, SyncError> {
        let config = self.backend_config()?;
        let backend = build_backend(&config, Arc::clone(&self.sink))?;
        match backend.test_connection().await {
            Ok(description) => {
                self.sink
                    .log(&format!("Connection test passed: {description}"));
                Ok(description)
            }
            Err(error) => {
                self.sink.log(&format!("Connection test failed: {error}"));
                Err(error.into())
            }
        }
    }

    /// Replaces the stored backend configuration.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Settings`] when settings cannot be written.
    pub fn configure(&self, backend: BackendConfig) -> Result<(), SyncError> {
        let mut settings = self.settings.load()?.unwrap_or_default();
        self.sink
            .log(&format!("Backend set to {}", backend.provider()));
        settings.backend = Some(backend);
        self.settings.save(&settings)?;
        Ok(())
    }

    /// Removes stored settings.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Settings`] when removal fails.
    pub fn reset_settings(&self) -> Result<bool, SyncError> {
        let removed = self.settings.reset()?;
        self.sink.log("Settings reset to defaults");
        Ok(removed)
    }
}

/// Surrounding whitespace is not part of the key; a blank password is missing.
fn require_password(password: &str) -> Result<&str, SyncError> {
    let password = password.trim();
    if password.is_empty() {
        return Err(SyncError::precondition(
            "Password required: pass --password or set COOKIESYNC_PASSWORD",
        ));
    }
    Ok(password)
}
