//! Error types for backend operations.
//!
//! Messages follow the What/Suggestion layout used across the crate.

use thiserror::Error;

/// Errors from storage backends.
#[derive(Debug, Error)]
pub enum BackendError {
    /// The backend does not implement this capability.
    #[error("{backend} backend does not support {operation}\n  Suggestion: {suggestion}")]
    Unsupported {
        /// Backend name.
        backend: &'static str,
        /// Capability that was requested.
        operation: &'static str,
        /// How to proceed instead.
        suggestion: &'static str,
    },

    /// The document exists but does not contain the expected file.
    #[error("document '{document_id}' has no file named '{filename}'\n  Suggestion: Export cookies to this document first")]
    FileNotFound {
        /// Document that was read.
        document_id: String,
        /// Filename that was expected.
        filename: String,
    },

    /// The provider returned only part of the file content.
    #[error("content of '{filename}' in document '{document_id}' is truncated by the provider")]
    Truncated {
        /// Document that was read.
        document_id: String,
        /// File whose content was truncated.
        filename: String,
    },

    /// The resource does not exist (HTTP 404 or lookup miss).
    #[error("{resource} not found\n  Suggestion: {suggestion}")]
    NotFound {
        /// What was looked for.
        resource: String,
        /// How to fix the issue.
        suggestion: String,
    },

    /// Non-success HTTP status or transport failure.
    #[error("network request failed: {}{message}", status_prefix(*.status))]
    Network {
        /// HTTP status, if a response was received.
        status: Option<u16>,
        /// Response body or transport error text.
        message: String,
    },

    /// Response body or headers were not what the API returns.
    #[error("unexpected response from {url}: {reason}")]
    InvalidResponse {
        /// Request URL.
        url: String,
        /// What was wrong.
        reason: String,
    },

    /// Required settings are missing.
    #[error("backend is not configured: {0}")]
    NotConfigured(String),

    /// Local filesystem I/O failed.
    #[error("backend I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

fn status_prefix(status: Option<u16>) -> String {
    status.map(|s| format!("HTTP {s}: ")).unwrap_or_default()
}

impl BackendError {
    /// Creates a `NotFound` error for a document id.
    #[must_use]
    pub fn document_not_found(document_id: &str) -> Self {
        Self::NotFound {
            resource: format!("document '{document_id}'"),
            suggestion: "Check the document id or export cookies first".to_string(),
        }
    }

    /// Creates a `NotFound` error for a filename lookup that matched nothing.
    #[must_use]
    pub fn no_document_for(filename: &str) -> Self {
        Self::NotFound {
            resource: format!("document containing '{filename}'"),
            suggestion: "Push cookies first or configure the document id manually".to_string(),
        }
    }

    /// Creates a `Network` error from a non-success HTTP response.
    #[must_use]
    pub fn http_status(status: u16, body: impl Into<String>) -> Self {
        Self::Network {
            status: Some(status),
            message: body.into(),
        }
    }
}

impl From<reqwest::Error> for BackendError {
    fn from(error: reqwest::Error) -> Self {
        Self::Network {
            status: error.status().map(|s| s.as_u16()),
            message: error.to_string(),
        }
    }
}
