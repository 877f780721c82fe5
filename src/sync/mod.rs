//! Export/import orchestration.
//!
//! Export: `Idle → Collecting → Serializing → Encrypting → Encoding → Saving
//! → Done | Failed`.
//!
//! Import: `Idle → ConfigCheck → Locating (remote, when no id is cached) →
//! Fetching → Decrypting → Parsing → AwaitingSelection → Applying →
//! Done | PartiallyFailed`. Nothing is written to the cookie store before
//! decryption and parsing succeed.

mod apply;
mod engine;
mod error;
mod selection;
mod stage;

pub use apply::{ApplyReport, FAILURE_SAMPLE_LIMIT, FailedItem, apply_selected, normalize};
pub use engine::{
    ExportReport, ImportReport, ImportSource, ImportSummary, PendingImport, SyncEngine,
};
pub use error::{ErrorKind, SyncError};
pub use selection::{Selection, dedupe_last_wins};
pub use stage::{ExportStage, ImportStage, StageTrace};
