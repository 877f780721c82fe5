//! CLI command handlers.

mod cache;
mod config;
mod export;
mod import;
mod log;

use anyhow::{Context, Result};
use cookiesync_core::{CookieId, Selection};

use crate::cli::{PasswordArgs, SelectionArgs};

pub use cache::{run_cache_clear_command, run_cache_status_command, run_cache_sync_command};
pub use config::{
    run_config_reset_command, run_config_set_local_command, run_config_set_remote_command,
    run_config_show_command, run_config_test_command,
};
pub use export::run_export_command;
pub use import::run_import_command;
pub use log::{run_log_clear_command, run_log_show_command};

/// Builds a selection from `--select`/`--domain`; neither means every cookie.
fn selection_from_args(args: &SelectionArgs) -> Result<Selection> {
    if let Some(pattern) = &args.domain {
        return Ok(Selection::Domain(pattern.clone()));
    }
    if args.ids.is_empty() {
        return Ok(Selection::All);
    }
    let ids = args
        .ids
        .iter()
        .map(|raw| {
            raw.parse::<CookieId>()
                .with_context(|| format!("Invalid cookie id '{raw}' (expected domain|name|path)"))
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(Selection::Ids(ids))
}

/// Missing passwords are passed through as empty so the engine records the failure.
fn password_from_args(args: &PasswordArgs) -> &str {
    args.password.as_deref().unwrap_or_default()
}
