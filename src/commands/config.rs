//! Config command handlers: show, change, reset and test backend settings.

use std::path::PathBuf;

use anyhow::{Context, Result};
use cookiesync_core::SettingsStore;
use cookiesync_core::backend::{
    BackendConfig, LocalConfig, RemoteDocumentConfig, default_downloads_dir,
};

use crate::app::context::AppContext;

pub fn run_config_show_command(ctx: &AppContext) -> Result<()> {
    let stored = ctx
        .settings
        .load()
        .context("Cannot read settings")?
        .and_then(|settings| settings.backend);

    println!("settings_path = {}", ctx.settings.path().display());
    println!(
        "settings_file = {}",
        if stored.is_some() {
            "loaded"
        } else {
            "not found (using defaults)"
        }
    );
    println!("cookies = {}", ctx.cookies_path.display());

    match stored.unwrap_or_default() {
        BackendConfig::Local(local) => {
            println!("provider = local");
            let dir = local.downloads_dir.unwrap_or_else(default_downloads_dir);
            println!("downloads_dir = {}", dir.display());
        }
        BackendConfig::RemoteDocument(remote) => {
            println!("provider = remote_document");
            println!("api_url = {}", remote.api_url);
            println!(
                "token = {}",
                if remote.token.is_empty() {
                    "[MISSING]"
                } else {
                    "[REDACTED]"
                }
            );
            println!(
                "document_id = {}",
                remote.document_id.as_deref().unwrap_or("<none>")
            );
            println!("description = {}", remote.description);
            println!("collection = {}", remote.collection);
        }
    }
    Ok(())
}

pub fn run_config_set_local_command(ctx: &AppContext, dir: Option<PathBuf>) -> Result<()> {
    ctx.engine()
        .configure(BackendConfig::Local(LocalConfig { downloads_dir: dir }))
        .context("Cannot save settings")?;
    println!("Backend set to local");
    Ok(())
}

pub fn run_config_set_remote_command(
    ctx: &AppContext,
    token: &str,
    api_url: &str,
    document_id: Option<String>,
) -> Result<()> {
    let mut remote = RemoteDocumentConfig::new(token).with_api_url(api_url);
    remote.set_document_id(document_id);
    ctx.engine()
        .configure(BackendConfig::RemoteDocument(remote))
        .context("Cannot save settings")?;
    println!("Backend set to remote_document");
    Ok(())
}

pub fn run_config_reset_command(ctx: &AppContext) -> Result<()> {
    let removed = ctx
        .engine()
        .reset_settings()
        .context("Cannot reset settings")?;
    if removed {
        println!("Settings reset to defaults");
    } else {
        println!("No stored settings found");
    }
    Ok(())
}

pub async fn run_config_test_command(ctx: &AppContext) -> Result<()> {
    let description = ctx
        .engine()
        .test_connection()
        .await
        .context("Connection test failed")?;
    println!("Connection OK: {description}");
    Ok(())
}
