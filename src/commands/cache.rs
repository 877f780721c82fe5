//! Cache command handlers for the local chunked mirror.

use std::time::{Duration, UNIX_EPOCH};

use anyhow::{Context, Result};
use cookiesync_core::{CookieStore, LogSink};

use super::selection_from_args;
use crate::app::context::AppContext;
use crate::cli::SelectionArgs;

pub async fn run_cache_sync_command(ctx: &AppContext, args: &SelectionArgs) -> Result<()> {
    let selection = selection_from_args(args)?;
    let cookies = ctx
        .cookie_store()
        .list()
        .await
        .with_context(|| format!("Cannot read cookies from '{}'", ctx.cookies_path.display()))?;
    let selected = selection.select(&cookies);

    let cache = ctx.cache();
    let metadata = cache
        .sync(&selected)
        .with_context(|| format!("Cannot write cache under '{}'", cache.dir().display()))?;
    ctx.activity.log(&format!(
        "Local cache updated: {} cookies in {} chunks",
        metadata.count, metadata.chunks
    ));
    println!(
        "Cached {} cookies in {} chunks",
        metadata.count, metadata.chunks
    );
    Ok(())
}

pub fn run_cache_status_command(ctx: &AppContext) -> Result<()> {
    let cache = ctx.cache();
    let Some(metadata) = cache.status().context("Cannot read cache metadata")? else {
        println!("Cache is empty");
        return Ok(());
    };
    println!("cache_dir = {}", cache.dir().display());
    println!("count = {}", metadata.count);
    println!("chunks = {}", metadata.chunks);
    let last_sync = u64::try_from(metadata.timestamp)
        .ok()
        .map_or_else(
            || "unknown".to_string(),
            |millis| httpdate::fmt_http_date(UNIX_EPOCH + Duration::from_millis(millis)),
        );
    println!("last_sync = {last_sync}");
    Ok(())
}

pub fn run_cache_clear_command(ctx: &AppContext) -> Result<()> {
    let removed = ctx.cache().clear().context("Cannot clear cache")?;
    ctx.activity.log("Local cache cleared");
    println!("Removed {removed} cache files");
    Ok(())
}
