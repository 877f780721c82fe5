//! Shared runtime context built from global CLI options.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use cookiesync_core::settings::default_config_dir;
use cookiesync_core::{ActivityLog, FileCookieStore, FileSettingsStore, SnapshotCache, SyncEngine};

use crate::cli::Cli;

const ACTIVITY_LOG_FILE: &str = "activity-log.json";
const CACHE_DIR: &str = "cache";
const DEFAULT_COOKIE_FILE: &str = "cookies.json";

/// Holds the stores every command works against, so handlers take `&AppContext`
/// instead of resolving paths themselves.
pub(crate) struct AppContext {
    pub(crate) config_dir: PathBuf,
    pub(crate) cookies_path: PathBuf,
    pub(crate) settings: Arc<FileSettingsStore>,
    pub(crate) activity: Arc<ActivityLog>,
    pub(crate) quiet: bool,
}

impl AppContext {
    pub(crate) fn from_cli(cli: &Cli) -> Result<Self> {
        let config_dir = match &cli.config_dir {
            Some(dir) => dir.clone(),
            None => default_config_dir()
                .context("Cannot resolve a config directory; pass --config-dir")?,
        };
        let activity_path = config_dir.join(ACTIVITY_LOG_FILE);
        let activity = ActivityLog::open(&activity_path).with_context(|| {
            format!("Cannot read activity log '{}'", activity_path.display())
        })?;
        let cookies_path = cli
            .cookies
            .clone()
            .unwrap_or_else(|| config_dir.join(DEFAULT_COOKIE_FILE));

        Ok(Self {
            settings: Arc::new(FileSettingsStore::in_dir(&config_dir)),
            activity: Arc::new(activity),
            cookies_path,
            config_dir,
            quiet: cli.quiet,
        })
    }

    pub(crate) fn cookie_store(&self) -> FileCookieStore {
        FileCookieStore::new(&self.cookies_path)
    }

    pub(crate) fn cache(&self) -> SnapshotCache {
        SnapshotCache::new(self.config_dir.join(CACHE_DIR))
    }

    pub(crate) fn engine(&self) -> SyncEngine {
        SyncEngine::new(
            Arc::new(self.cookie_store()),
            self.settings.clone(),
            self.activity.clone(),
        )
    }
}
