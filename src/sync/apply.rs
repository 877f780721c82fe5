//! Per-cookie apply with partial-failure accounting.

use std::fmt::Write as _;

use tracing::{debug, instrument, warn};

use crate::cookie::{CookieRecord, CookieStore, SameSite};

/// Number of failures listed individually in summaries.
pub const FAILURE_SAMPLE_LIMIT: usize = 5;

/// A cookie that could not be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedItem {
    /// `domain|name|path`.
    pub identity: String,
    /// Why the write failed.
    pub reason: String,
}

/// Result of applying a selection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplyReport {
    pub success_count: usize,
    pub fail_count: usize,
    pub failed_items: Vec<FailedItem>,
}

impl ApplyReport {
    /// Whether every cookie was written.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.fail_count == 0
    }

    /// One-line outcome followed by up to [`FAILURE_SAMPLE_LIMIT`] failures.
    #[must_use]
    pub fn summary(&self) -> String {
        let mut out = format!(
            "Import completed: {} successful, {} failed",
            self.success_count, self.fail_count
        );
        if let Some(failures) = self.failure_samples() {
            let _ = write!(out, "\nFailed cookies: {failures}");
        }
        out
    }

    /// Comma-separated sample of failed identities, with an "and N more" tail.
    #[must_use]
    pub fn failure_samples(&self) -> Option<String> {
        if self.failed_items.is_empty() {
            return None;
        }
        let mut sample = self
            .failed_items
            .iter()
            .take(FAILURE_SAMPLE_LIMIT)
            .map(|item| format!("{} ({})", item.identity, item.reason))
            .collect::<Vec<_>>()
            .join(", ");
        let hidden = self.failed_items.len().saturating_sub(FAILURE_SAMPLE_LIMIT);
        if hidden > 0 {
            let _ = write!(sample, " and {hidden} more");
        }
        Some(sample)
    }
}

/// Normalizes `sameSite` for writing: missing becomes `lax`, and
/// `no_restriction` on an insecure cookie falls back to `lax`.
#[must_use]
pub fn normalize(record: &CookieRecord) -> CookieRecord {
    let mut normalized = record.clone();
    normalized.same_site = match record.same_site {
        None => Some(SameSite::Lax),
        Some(SameSite::NoRestriction) if !record.secure => Some(SameSite::Lax),
        other => other,
    };
    normalized
}

/// Writes every record independently; one failure never stops the rest.
#[instrument(level = "debug", skip_all, fields(count = records.len()))]
pub async fn apply_selected(store: &dyn CookieStore, records: &[CookieRecord]) -> ApplyReport {
    let mut report = ApplyReport::default();
    for record in records {
        let identity = record.id().to_string();
        let normalized = normalize(record);
        let outcome = match normalized.target_url() {
            Ok(url) => store
                .set(&url, &normalized)
                .await
                .map_err(|error| error.to_string()),
            Err(error) => Err(format!("invalid target URL: {error}")),
        };
        match outcome {
            Ok(()) => {
                debug!(cookie = %identity, "cookie applied");
                report.success_count += 1;
            }
            Err(reason) => {
                warn!(cookie = %identity, %reason, "cookie apply failed");
                report.fail_count += 1;
                report.failed_items.push(FailedItem { identity, reason });
            }
        }
    }
    report
}
