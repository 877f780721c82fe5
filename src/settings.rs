//! Durable settings storage.
//!
//! Settings live in `settings.json` under the user config directory:
//! `$XDG_CONFIG_HOME/cookiesync`, `$HOME/.config/cookiesync`, or
//! `%APPDATA%/cookiesync`, first available wins.

use std::env;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::backend::BackendConfig;

const APP_DIR_NAME: &str = "cookiesync";
const SETTINGS_FILE_NAME: &str = "settings.json";

/// Errors reading or writing settings.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    /// No suitable user config directory is available.
    #[error("unable to determine config directory (set XDG_CONFIG_HOME or HOME)")]
    ConfigDirUnavailable,
    /// Filesystem I/O failed.
    #[error("settings I/O failed: {0}")]
    Io(#[from] std::io::Error),
    /// Settings file is not valid JSON.
    #[error("settings file is invalid: {0}")]
    Json(#[from] serde_json::Error),
}

/// User settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    /// Configured storage target; unset until first configured or exported.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backend: Option<BackendConfig>,
}

/// Durable store for [`Settings`].
pub trait SettingsStore: Send + Sync {
    /// Loads settings; `None` when nothing has been saved.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError`] when stored settings cannot be read.
    fn load(&self) -> Result<Option<Settings>, SettingsError>;

    /// Replaces stored settings.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError`] when settings cannot be written.
    fn save(&self, settings: &Settings) -> Result<(), SettingsError>;

    /// Removes stored settings. Returns whether anything was removed.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError`] when removal fails.
    fn reset(&self) -> Result<bool, SettingsError>;
}

/// Settings persisted as JSON with owner-only permissions.
#[derive(Debug, Clone)]
pub struct FileSettingsStore {
    path: PathBuf,
}

impl FileSettingsStore {
    /// Store backed by `dir/settings.json`.
    #[must_use]
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self {
            path: dir.as_ref().join(SETTINGS_FILE_NAME),
        }
    }

    /// Settings file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SettingsStore for FileSettingsStore {
    fn load(&self) -> Result<Option<Settings>, SettingsError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let raw = fs::read_to_string(&self.path)?;
        if raw.trim().is_empty() {
            return Ok(None);
        }
        Ok(Some(serde_json::from_str(&raw)?))
    }

    fn save(&self, settings: &Settings) -> Result<(), SettingsError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let payload = serde_json::to_vec_pretty(settings)?;
        fs::write(&self.path, payload)?;
        set_owner_only_permissions(&self.path)?;
        debug!(path = %self.path.display(), "settings saved");
        Ok(())
    }

    fn reset(&self) -> Result<bool, SettingsError> {
        if self.path.exists() {
            fs::remove_file(&self.path)?;
            return Ok(true);
        }
        Ok(false)
    }
}

/// In-process settings store.
#[derive(Debug, Default)]
pub struct MemorySettingsStore {
    settings: Mutex<Option<Settings>>,
}

impl MemorySettingsStore {
    /// Creates a store holding `settings`.
    #[must_use]
    pub fn with_settings(settings: Settings) -> Self {
        Self {
            settings: Mutex::new(Some(settings)),
        }
    }
}

impl SettingsStore for MemorySettingsStore {
    fn load(&self) -> Result<Option<Settings>, SettingsError> {
        Ok(self
            .settings
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    fn save(&self, settings: &Settings) -> Result<(), SettingsError> {
        *self.settings.lock().unwrap_or_else(PoisonError::into_inner) = Some(settings.clone());
        Ok(())
    }

    fn reset(&self) -> Result<bool, SettingsError> {
        Ok(self
            .settings
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .is_some())
    }
}

/// Resolves the per-user config directory for this tool.
///
/// # Errors
///
/// Returns [`SettingsError::ConfigDirUnavailable`] when neither
/// `XDG_CONFIG_HOME`, `HOME`, nor `APPDATA` is set.
pub fn default_config_dir() -> Result<PathBuf, SettingsError> {
    resolve_config_dir(
        sanitize_env_path(env::var_os("XDG_CONFIG_HOME")),
        sanitize_env_path(env::var_os("HOME")),
        sanitize_env_path(env::var_os("APPDATA")),
    )
}

fn sanitize_env_path(value: Option<OsString>) -> Option<PathBuf> {
    let value = value?;
    if value.to_string_lossy().trim().is_empty() {
        return None;
    }
    Some(PathBuf::from(value))
}

fn resolve_config_dir(
    xdg_config_home: Option<PathBuf>,
    home: Option<PathBuf>,
    app_data: Option<PathBuf>,
) -> Result<PathBuf, SettingsError> {
    if let Some(xdg) = xdg_config_home {
        return Ok(xdg.join(APP_DIR_NAME));
    }
    if let Some(home) = home {
        return Ok(home.join(".config").join(APP_DIR_NAME));
    }
    if let Some(app_data) = app_data {
        return Ok(app_data.join(APP_DIR_NAME));
    }
    Err(SettingsError::ConfigDirUnavailable)
}

#[cfg(unix)]
fn set_owner_only_permissions(path: &Path) -> Result<(), SettingsError> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;
    Ok(())
}

#[cfg(not(unix))]
fn set_owner_only_permissions(_path: &Path) -> Result<(), SettingsError> {
    Ok(())
}
