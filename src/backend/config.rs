//! Persisted backend configuration.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Default remote document API root.
pub const DEFAULT_API_URL: &str = "https://api.github.com";
/// Default description attached to created documents.
pub const DEFAULT_DESCRIPTION: &str = "sync-your-cookie";
/// Default collection path segment.
pub const DEFAULT_COLLECTION: &str = "gists";

/// Which storage target snapshots are saved to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "provider", rename_all = "snake_case")]
pub enum BackendConfig {
    /// Blob written as a file under a downloads directory.
    Local(LocalConfig),
    /// Blob stored in a Gist-like remote document.
    RemoteDocument(RemoteDocumentConfig),
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self::Local(LocalConfig::default())
    }
}

impl BackendConfig {
    /// Short provider label used in logs and summaries.
    #[must_use]
    pub fn provider(&self) -> &'static str {
        match self {
            Self::Local(_) => "local",
            Self::RemoteDocument(_) => "remote_document",
        }
    }
}

/// Local download settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalConfig {
    /// Target directory; the user's downloads directory when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub downloads_dir: Option<PathBuf>,
}

/// Remote document store settings.
///
/// The token is redacted from Debug output.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteDocumentConfig {
    /// API root, e.g. `https://api.github.com`.
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// Access token sent as `Authorization: token <token>`.
    #[serde(default)]
    pub token: String,
    /// Document holding the blob; filled in once located or created.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_id: Option<String>,
    /// Description attached to created and updated documents.
    #[serde(default = "default_description")]
    pub description: String,
    /// Collection path segment (`gists` or `documents`).
    #[serde(default = "default_collection")]
    pub collection: String,
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_description() -> String {
    DEFAULT_DESCRIPTION.to_string()
}

fn default_collection() -> String {
    DEFAULT_COLLECTION.to_string()
}

impl RemoteDocumentConfig {
    /// Creates a config with default API root, description and collection.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            api_url: default_api_url(),
            token: token.into(),
            document_id: None,
            description: default_description(),
            collection: default_collection(),
        }
    }

    /// Overrides the API root.
    #[must_use]
    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }

    /// Sets or clears the cached document id. Blank ids are treated as unset.
    pub fn set_document_id(&mut self, document_id: Option<String>) {
        self.document_id = document_id.filter(|id| !id.trim().is_empty());
    }

    /// Names of required fields that are blank.
    #[must_use]
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.api_url.trim().is_empty() {
            missing.push("apiUrl");
        }
        if self.token.trim().is_empty() {
            missing.push("token");
        }
        missing
    }
}

impl fmt::Debug for RemoteDocumentConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let token = if self.token.is_empty() {
            "[MISSING]"
        } else {
            "[REDACTED]"
        };
        f.debug_struct("RemoteDocumentConfig")
            .field("api_url", &self.api_url)
            .field("token", &token)
            .field("document_id", &self.document_id)
            .field("description", &self.description)
            .field("collection", &self.collection)
            .finish()
    }
}
