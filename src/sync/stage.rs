//! Export and import stage machines.

use std::fmt;

use tracing::debug;

/// Stages of an export.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportStage {
    Idle,
    Collecting,
    Serializing,
    Encrypting,
    Encoding,
    Saving,
    Done,
    Failed,
}

/// Stages of an import.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportStage {
    Idle,
    ConfigCheck,
    Locating,
    Fetching,
    Decrypting,
    Parsing,
    AwaitingSelection,
    Applying,
    Done,
    PartiallyFailed,
    Failed,
}

impl fmt::Display for ExportStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl fmt::Display for ImportStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Ordered record of visited stages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageTrace<S> {
    operation: &'static str,
    visited: Vec<S>,
}

impl<S: Copy + fmt::Display> StageTrace<S> {
    pub(crate) fn start(operation: &'static str, initial: S) -> Self {
        debug!(operation, stage = %initial, "stage");
        Self {
            operation,
            visited: vec![initial],
        }
    }

    pub(crate) fn enter(&mut self, stage: S) {
        debug!(operation = self.operation, stage = %stage, "stage");
        self.visited.push(stage);
    }

    /// Stages visited so far, in order.
    #[must_use]
    pub fn stages(&self) -> &[S] {
        &self.visited
    }

    /// Most recent stage.
    #[must_use]
    pub fn current(&self) -> S {
        // `start` always seeds one stage.
        self.visited[self.visited.len() - 1]
    }
}
