//! Remote document backend for Gist-compatible HTTP APIs.
//!
//! Endpoints, relative to the configured API root:
//! - `GET /{collection}` lists documents owned by the token principal
//! - `GET /{collection}/{id}` reads one document
//! - `POST /{collection}` creates, `PATCH /{collection}/{id}` updates
//! - `GET /user` identifies the token principal
//!
//! Saving runs an explicit reconciliation state machine (see [`SaveState`]).

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, LINK};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info, instrument, warn};

use crate::activity::LogSink;

use super::{Backend, BackendConfig, BackendError, RemoteDocumentConfig};

/// Upper bound on list pages followed while locating a document.
pub const MAX_LIST_PAGES: usize = 10;
const PER_PAGE: usize = 100;
const ACCEPT_VALUE: &str = "application/vnd.github.v3+json";

/// States of the save reconciliation.
///
/// `Start → Locating` when no id is cached, `Start → Verifying` otherwise.
/// `Locating` moves to `Verifying` on a hit and to `Creating` on a miss or error.
/// `Verifying` moves to `Updating` on 2xx and to `Creating` on anything else.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveState {
    /// Entry state.
    Start,
    /// Searching for an existing document by filename.
    Locating,
    /// Checking that a known document is still accessible.
    Verifying(String),
    /// Creating a new document.
    Creating,
    /// Updating an existing document.
    Updating(String),
    /// Saved under the contained id.
    Done(String),
    /// Create or update was rejected.
    Failed,
}

#[derive(Debug, Deserialize)]
struct DocumentSummary {
    id: String,
    #[serde(default)]
    files: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct Document {
    #[serde(default)]
    files: HashMap<String, DocumentFile>,
}

#[derive(Debug, Deserialize)]
struct DocumentFile {
    content: Option<String>,
    #[serde(default)]
    truncated: bool,
}

#[derive(Debug, Deserialize)]
struct WriteResponse {
    id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UserResponse {
    login: String,
}

/// Stores the blob as a file inside a remote document.
pub struct RemoteDocumentBackend {
    config: RemoteDocumentConfig,
    client: Client,
    sink: Arc<dyn LogSink>,
    last_trace: Vec<SaveState>,
}

impl fmt::Debug for RemoteDocumentBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteDocumentBackend")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl RemoteDocumentBackend {
    /// Creates a backend using `client` for all requests.
    #[must_use]
    pub fn new(config: RemoteDocumentConfig, client: Client, sink: Arc<dyn LogSink>) -> Self {
        Self {
            config,
            client,
            sink,
            last_trace: Vec::new(),
        }
    }

    /// Cached document id, if any.
    #[must_use]
    pub fn document_id(&self) -> Option<&str> {
        self.config.document_id.as_deref()
    }

    /// States visited by the most recent [`Backend::save`].
    #[must_use]
    pub fn last_save_trace(&self) -> &[SaveState] {
        &self.last_trace
    }

    fn api_root(&self) -> &str {
        self.config.api_url.trim_end_matches('/')
    }

    fn collection_url(&self) -> String {
        format!(
            "{}/{}",
            self.api_root(),
            self.config.collection.trim_matches('/')
        )
    }

    fn document_url(&self, document_id: &str) -> String {
        format!(
            "{}/{}",
            self.collection_url(),
            urlencoding::encode(document_id)
        )
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        self.client
            .request(method, url)
            .header(AUTHORIZATION, format!("token {}", self.config.token))
            .header(ACCEPT, ACCEPT_VALUE)
    }

    /// Confirms the token is accepted and returns the principal's login.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::Network`] on a non-success status or transport failure.
    #[instrument(level = "debug", skip(self), fields(api = %self.api_root()))]
    pub async fn verify_credentials(&self) -> Result<String, BackendError> {
        let url = format!("{}/user", self.api_root());
        let response = self.request(Method::GET, &url).send().await?;
        let user: UserResponse = read_json(&url, ensure_success(response).await?).await?;
        Ok(user.login)
    }

    async fn verify(&self, document_id: &str) -> Result<(), BackendError> {
        let url = self.document_url(document_id);
        let response = self.request(Method::GET, &url).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(BackendError::document_not_found(document_id));
        }
        ensure_success(response).await?;
        Ok(())
    }

    async fn write_document(
        &self,
        document_id: Option<&str>,
        filename: &str,
        content: &str,
    ) -> Result<String, BackendError> {
        let body = serde_json::json!({
            "description": self.config.description,
            "public": false,
            "files": { filename: { "content": content } },
        });
        let (method, url) = match document_id {
            Some(id) => (Method::PATCH, self.document_url(id)),
            None => (Method::POST, self.collection_url()),
        };
        let response = self.request(method, &url).json(&body).send().await?;
        let written: WriteResponse = read_json(&url, ensure_success(response).await?).await?;
        written
            .id
            .or_else(|| document_id.map(str::to_string))
            .ok_or_else(|| BackendError::InvalidResponse {
                url,
                reason: "response carries no document id".to_string(),
            })
    }

    async fn step(&mut self, state: SaveState, filename: &str, content: &str) -> SaveState {
        match state {
            SaveState::Start => match self.config.document_id.clone() {
                Some(id) => SaveState::Verifying(id),
                None => SaveState::Locating,
            },
            SaveState::Locating => match self.locate(filename).await {
                Ok(Some(id)) => {
                    self.sink.log(&format!("Found existing document: {id}"));
                    self.config.set_document_id(Some(id.clone()));
                    SaveState::Verifying(id)
                }
                Ok(None) => SaveState::Creating,
                Err(error) => {
                    warn!(%error, "document lookup failed; creating a new document");
                    self.sink.log(&format!("Document lookup failed: {error}"));
                    SaveState::Creating
                }
            },
            SaveState::Verifying(id) => match self.verify(&id).await {
                Ok(()) => SaveState::Updating(id),
                Err(error) => {
                    warn!(document_id = %id, %error, "cached document not accessible");
                    self.sink
                        .log(&format!("Document {id} not accessible, creating a new one"));
                    self.config.set_document_id(None);
                    SaveState::Creating
                }
            },
            SaveState::Creating => {
                self.sink.log("Creating new document...");
                self.finish_write(None, filename, content).await
            }
            SaveState::Updating(id) => {
                self.sink.log(&format!("Updating document {id}..."));
                self.finish_write(Some(id), filename, content).await
            }
            terminal @ (SaveState::Done(_) | SaveState::Failed) => terminal,
        }
    }

    async fn finish_write(
        &mut self,
        document_id: Option<String>,
        filename: &str,
        content: &str,
    ) -> SaveState {
        match self
            .write_document(document_id.as_deref(), filename, content)
            .await
        {
            Ok(id) => {
                info!(document_id = %id, "document saved");
                self.sink.log(&format!("Saved to document {id}"));
                SaveState::Done(id)
            }
            Err(error) => {
                warn!(%error, "document save rejected");
                self.sink.log(&format!("Save failed: {error}"));
                SaveState::Failed
            }
        }
    }
}

#[async_trait]
impl Backend for RemoteDocumentBackend {
    fn name(&self) -> &'static str {
        "remote_document"
    }

    fn config(&self) -> BackendConfig {
        BackendConfig::RemoteDocument(self.config.clone())
    }

    #[instrument(level = "debug", skip(self, content), fields(api = %self.api_root(), content_len = content.len()))]
    async fn save(&mut self, filename: &str, content: &str) -> bool {
        let mut state = SaveState::Start;
        let mut trace = Vec::new();
        let saved = loop {
            trace.push(state.clone());
            match state {
                SaveState::Done(id) => {
                    self.config.set_document_id(Some(id));
                    break true;
                }
                SaveState::Failed => break false,
                current => state = self.step(current, filename, content).await,
            }
        };
        debug!(?trace, saved, "save reconciliation finished");
        self.last_trace = trace;
        saved
    }

    #[instrument(level = "debug", skip(self), fields(api = %self.api_root()))]
    async fn fetch(&self, document_id: &str, filename: &str) -> Result<String, BackendError> {
        let url = self.document_url(document_id);
        let response = self.request(Method::GET, &url).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(BackendError::document_not_found(document_id));
        }
        let mut document: Document = read_json(&url, ensure_success(response).await?).await?;

        let not_found = || BackendError::FileNotFound {
            document_id: document_id.to_string(),
            filename: filename.to_string(),
        };
        let file = document.files.remove(filename).ok_or_else(not_found)?;
        match file {
            DocumentFile {
                truncated: true, ..
            }
            | DocumentFile { content: None, .. } => Err(BackendError::Truncated {
                document_id: document_id.to_string(),
                filename: filename.to_string(),
            }),
            DocumentFile {
                content: Some(content),
                ..
            } => {
                debug!(content_len = content.len(), "document content fetched");
                Ok(content)
            }
        }
    }

    #[instrument(level = "debug", skip(self), fields(api = %self.api_root()))]
    async fn locate(&self, filename: &str) -> Result<Option<String>, BackendError> {
        let mut url = format!("{}?per_page={PER_PAGE}", self.collection_url());
        let mut seen = 0_usize;

        for page in 1..=MAX_LIST_PAGES {
            let response = ensure_success(self.request(Method::GET, &url).send().await?).await?;
            let next = next_page_url(response.headers());
            let documents: Vec<DocumentSummary> = read_json(&url, response).await?;
            seen += documents.len();

            if let Some(found) = documents
                .into_iter()
                .find(|document| document.files.contains_key(filename))
            {
                debug!(page, document_id = %found.id, "document located");
                return Ok(Some(found.id));
            }

            match next {
                Some(next) if same_origin(self.api_root(), &next) => url = next,
                Some(next) => {
                    warn!(page, next = %next, "pagination link leaves the API origin");
                    return Err(BackendError::InvalidResponse {
                        url,
                        reason: format!("next page link {next} is outside the API origin"),
                    });
                }
                None => {
                    debug!(page, seen, "no document contains the file");
                    return Ok(None);
                }
            }
        }

        warn!(
            pages = MAX_LIST_PAGES,
            seen, "stopped listing documents at page limit"
        );
        Ok(None)
    }

    async fn test_connection(&self) -> Result<String, BackendError> {
        let login = self.verify_credentials().await?;
        Ok(format!("authenticated as {login} at {}", self.api_root()))
    }
}

async fn ensure_success(response: Response) -> Result<Response, BackendError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(BackendError::http_status(status.as_u16(), body))
}

async fn read_json<T: DeserializeOwned>(url: &str, response: Response) -> Result<T, BackendError> {
    let body = response.text().await?;
    serde_json::from_str(&body).map_err(|error| BackendError::InvalidResponse {
        url: url.to_string(),
        reason: error.to_string(),
    })
}

/// Whether `candidate` shares scheme, host and port with `api_root`.
/// The token is only ever sent to the configured API.
fn same_origin(api_root: &str, candidate: &str) -> bool {
    match (url::Url::parse(api_root), url::Url::parse(candidate)) {
        (Ok(root), Ok(candidate)) => root.origin() == candidate.origin(),
        _ => false,
    }
}

/// Extracts the `rel="next"` target from an RFC 8288 `Link` header.
fn next_page_url(headers: &HeaderMap) -> Option<String> {
    let link = headers.get(LINK)?.to_str().ok()?;
    link.split(',').find_map(|entry| {
        let (target, params) = entry.split_once(';')?;
        params
            .split(';')
            .any(|param| matches!(param.trim(), "rel=\"next\"" | "rel=next"))
            .then(|| {
                target
                    .trim()
                    .trim_start_matches('<')
                    .trim_end_matches('>')
                    .to_string()
            })
    })
}
