//! Cookiesync Core Library
//!
//! Exports a selected set of cookies as a password-encrypted snapshot, stores
//! it through a pluggable backend, and later fetches, decrypts and selectively
//! re-applies it.
//!
//! # Architecture
//!
//! - [`crypto`] - PBKDF2 key derivation and AES-256-GCM blob encryption
//! - [`codec`] - snapshot JSON, base64 transport and chunking
//! - [`backend`] - local downloads directory and remote document storage
//! - [`sync`] - export/import stage machines, selection and apply
//! - [`cookie`] - cookie records and cookie stores
//! - [`settings`], [`activity`], [`cache`], [`fingerprint`] - supporting state

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod activity;
pub mod backend;
pub mod cache;
pub mod codec;
pub mod cookie;
pub mod crypto;
pub mod fingerprint;
pub mod settings;
pub mod sync;
mod user_agent;

#[cfg(test)]
mod test_support;

// Re-export commonly used types
pub use activity::{ActivityLog, ActivityLogEntry, LogSink};
pub use backend::{Backend, BackendConfig, BackendError, DEFAULT_FILENAME, build_backend};
pub use cache::SnapshotCache;
pub use codec::Snapshot;
pub use cookie::{CookieId, CookieRecord, CookieStore, FileCookieStore, MemoryCookieStore};
pub use crypto::CipherError;
pub use fingerprint::EnvironmentDescriptor;
pub use settings::{FileSettingsStore, MemorySettingsStore, Settings, SettingsStore};
pub use sync::{
    ApplyReport, ErrorKind, ExportReport, ImportReport, ImportSource, ImportSummary,
    PendingImport, Selection, SyncEngine, SyncError,
};
