//! Error type for export and import operations.

use std::fmt;

use thiserror::Error;

use crate::backend::BackendError;
use crate::codec::CodecError;
use crate::cookie::CookieStoreError;
use crate::crypto::CipherError;
use crate::settings::SettingsError;

/// Failure categories shared by every sync error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A required input or setting is missing.
    Precondition,
    /// Data is malformed (JSON, base64, blob layout).
    Format,
    /// Wrong password or tampered data.
    Authentication,
    /// HTTP or transport failure.
    Network,
    /// Document not found.
    NotFound,
    /// Backend lacks the requested capability.
    Unsupported,
    /// Document lacks the blob file.
    FileNotFound,
    /// Provider returned partial content.
    Truncated,
    /// Local storage (settings, cookie store, filesystem) failed.
    Storage,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Precondition => "precondition",
            Self::Format => "format",
            Self::Authentication => "authentication",
            Self::Network => "network",
            Self::NotFound => "not_found",
            Self::Unsupported => "unsupported",
            Self::FileNotFound => "file_not_found",
            Self::Truncated => "truncated",
            Self::Storage => "storage",
        };
        f.write_str(label)
    }
}

/// Errors surfaced by [`super::SyncEngine`].
#[derive(Debug, Error)]
pub enum SyncError {
    /// A precondition was not met before the operation started.
    #[error("{0}")]
    Precondition(String),
    /// Encryption or decryption failed.
    #[error(transparent)]
    Cipher(#[from] CipherError),
    /// Snapshot or blob encoding failed.
    #[error(transparent)]
    Codec(#[from] CodecError),
    /// The backend failed.
    #[error(transparent)]
    Backend(#[from] BackendError),
    /// The cookie store failed.
    #[error(transparent)]
    CookieStore(#[from] CookieStoreError),
    /// Settings could not be read or written.
    #[error(transparent)]
    Settings(#[from] SettingsError),
    /// The backend reported an unsuccessful save.
    #[error("saving to the {backend} backend failed; see the activity log for details")]
    SaveFailed {
        /// Backend name.
        backend: &'static str,
    },
}

impl SyncError {
    /// Creates a precondition error.
    #[must_use]
    pub fn precondition(message: impl Into<String>) -> Self {
        Self::Precondition(message.into())
    }

    /// Failure category of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Precondition(_) => ErrorKind::Precondition,
            Self::Cipher(CipherError::Authentication) => ErrorKind::Authentication,
            Self::Cipher(CipherError::Format { .. }) | Self::Codec(_) => ErrorKind::Format,
            Self::Cipher(CipherError::Encryption) => ErrorKind::Storage,
            Self::Backend(error) => match error {
                BackendError::Unsupported { .. } => ErrorKind::Unsupported,
                BackendError::FileNotFound { .. } => ErrorKind::FileNotFound,
                BackendError::Truncated { .. } => ErrorKind::Truncated,
                BackendError::NotFound { .. } => ErrorKind::NotFound,
                BackendError::Network { .. } | BackendError::InvalidResponse { .. } => {
                    ErrorKind::Network
                }
                BackendError::NotConfigured(_) => ErrorKind::Precondition,
                BackendError::Io(_) => ErrorKind::Storage,
            },
            Self::CookieStore(_) | Self::Settings(_) => ErrorKind::Storage,
            Self::SaveFailed { .. } => ErrorKind::Network,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_maps_cipher_errors() {
        assert_eq!(
            SyncError::from(CipherError::Authentication).kind(),
            ErrorKind::Authentication
        );
        assert_eq!(
            SyncError::from(CipherError::Format {
                expected: 28,
                actual: 3
            })
            .kind(),
            ErrorKind::Format
        );
    }

    #[test]
    fn test_kind_maps_backend_errors() {
        assert_eq!(
            SyncError::from(BackendError::no_document_for("f")).kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            SyncError::from(BackendError::http_status(500, "")).kind(),
            ErrorKind::Network
        );
        assert_eq!(
            SyncError::from(BackendError::NotConfigured("x".into())).kind(),
            ErrorKind::Precondition
        );
    }

    #[test]
    fn test_precondition_message_is_verbatim() {
        let err = SyncError::precondition("Password required");
        assert_eq!(err.to_string(), "Password required");
        assert_eq!(err.kind().to_string(), "precondition");
    }
}
