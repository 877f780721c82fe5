//! CLI command routing.

use anyhow::Result;

use crate::app::context::AppContext;
use crate::cli::{CacheCommand, Cli, Command, ConfigCommand, LogCommand};
use crate::{ProcessExit, commands};

/// Runs the command selected on the command line and returns the exit outcome.
pub(crate) async fn dispatch(cli: &Cli) -> Result<ProcessExit> {
    let ctx = AppContext::from_cli(cli)?;

    match &cli.command {
        Command::Export(args) => commands::run_export_command(&ctx, args).await,
        Command::Import(args) => commands::run_import_command(&ctx, args).await,
        Command::Log { command } => {
            match command {
                LogCommand::Show { limit } => commands::run_log_show_command(&ctx, *limit),
                LogCommand::Clear => commands::run_log_clear_command(&ctx),
            }
            Ok(ProcessExit::Success)
        }
        Command::Config { command } => {
            match command {
                ConfigCommand::Show => commands::run_config_show_command(&ctx)?,
                ConfigCommand::SetLocal { dir } => {
                    commands::run_config_set_local_command(&ctx, dir.clone())?;
                }
                ConfigCommand::SetRemote {
                    token,
                    api_url,
                    document_id,
                } => commands::run_config_set_remote_command(
                    &ctx,
                    token,
                    api_url,
                    document_id.clone(),
                )?,
                ConfigCommand::Reset => commands::run_config_reset_command(&ctx)?,
                ConfigCommand::Test => commands::run_config_test_command(&ctx).await?,
            }
            Ok(ProcessExit::Success)
        }
        Command::Cache { command } => {
            match command {
                CacheCommand::Sync { selection } => {
                    commands::run_cache_sync_command(&ctx, selection).await?;
                }
                CacheCommand::Status => commands::run_cache_status_command(&ctx)?,
                CacheCommand::Clear => commands::run_cache_clear_command(&ctx)?,
            }
            Ok(ProcessExit::Success)
        }
    }
}
