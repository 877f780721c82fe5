//! Export command handler.

use anyhow::{Context, Result};
use cookiesync_core::{BackendConfig, DEFAULT_FILENAME};
use tracing::info;

use super::{password_from_args, selection_from_args};
use crate::ProcessExit;
use crate::app::context::AppContext;
use crate::app::terminal;
use crate::cli::ExportArgs;

pub async fn run_export_command(ctx: &AppContext, args: &ExportArgs) -> Result<ProcessExit> {
    let selection = selection_from_args(&args.selection)?;
    let mut engine = ctx.engine();
    if !args.no_cache {
        engine = engine.with_cache(ctx.cache());
    }

    let spinner = terminal::start_spinner(ctx.quiet, "Exporting cookies...");
    let result = engine
        .export(&selection, password_from_args(&args.password))
        .await;
    if let Some(spinner) = spinner {
        spinner.finish_and_clear();
    }
    let report = result.context("Export failed")?;

    info!(
        count = report.count,
        backend = report.backend,
        bytes = report.encoded_len,
        "Export complete"
    );
    println!(
        "Exported {} cookies via {} backend",
        report.count, report.backend
    );
    match &report.config {
        BackendConfig::Local(local) => {
            if let Some(dir) = &local.downloads_dir {
                println!("Saved to {}", dir.join(DEFAULT_FILENAME).display());
            }
        }
        BackendConfig::RemoteDocument(remote) => {
            if let Some(id) = &remote.document_id {
                println!("Document: {id}");
            }
        }
    }
    Ok(ProcessExit::Success)
}
