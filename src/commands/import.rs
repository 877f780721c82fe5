//! Import command handler: fetch, summarize, then apply the selection.

use std::fs;

use anyhow::{Context, Result};
use cookiesync_core::ImportSource;
use tracing::warn;

use super::{password_from_args, selection_from_args};
use crate::ProcessExit;
use crate::app::context::AppContext;
use crate::app::{exit_handler, terminal};
use crate::cli::ImportArgs;

pub async fn run_import_command(ctx: &AppContext, args: &ImportArgs) -> Result<ProcessExit> {
    let selection = selection_from_args(&args.selection)?;
    let source = match &args.file {
        Some(path) => ImportSource::Blob {
            source_name: path.display().to_string(),
            content: fs::read_to_string(path)
                .with_context(|| format!("Cannot read snapshot file '{}'", path.display()))?,
        },
        None => ImportSource::Backend,
    };

    let engine = ctx.engine();
    let spinner = terminal::start_spinner(ctx.quiet, "Fetching snapshot...");
    let result = engine
        .fetch_import(source, password_from_args(&args.password))
        .await;
    if let Some(spinner) = spinner {
        spinner.finish_and_clear();
    }
    let pending = result.context("Import failed")?;

    println!("{}", pending.summary);
    if pending.summary.self_import {
        warn!("Importing a snapshot exported from this environment");
    }

    if args.list {
        for cookie in &pending.snapshot.cookies {
            println!("{}", cookie.id());
        }
        return Ok(ProcessExit::Success);
    }

    let report = engine
        .apply(pending, &selection)
        .await
        .context("Import failed")?;
    println!("{}", report.apply.summary());

    Ok(exit_handler::determine_exit_outcome(
        report.apply.success_count,
        report.apply.fail_count,
    ))
}
