//! Environment fingerprinting for self-import detection.

use std::env;
use std::fs;
use std::path::Path;

use sha2::{Digest, Sha256};

/// The fixed tuple of descriptors hashed into a browser id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvironmentDescriptor {
    /// Client identification string.
    pub user_agent: String,
    /// Operating system and architecture.
    pub platform: String,
    /// Preferred language tag.
    pub language: String,
    /// Available parallelism (0 when unknown).
    pub hardware_concurrency: usize,
    /// Host name, standing in for the display-specific descriptor a browser would use.
    pub host: String,
}

impl EnvironmentDescriptor {
    /// Describes the current process environment.
    #[must_use]
    pub fn current() -> Self {
        Self {
            user_agent: crate::user_agent::default_user_agent(),
            platform: format!("{}-{}", env::consts::OS, env::consts::ARCH),
            language: first_env(&["LC_ALL", "LANG", "LANGUAGE"]).unwrap_or_default(),
            hardware_concurrency: std::thread::available_parallelism().map_or(0, usize::from),
            host: host_name().unwrap_or_default(),
        }
    }

    /// 64-character lowercase hex SHA-256 of `ua|platform|language|concurrency|host`.
    #[must_use]
    pub fn browser_id(&self) -> String {
        let joined = format!(
            "{}|{}|{}|{}|{}",
            self.user_agent, self.platform, self.language, self.hardware_concurrency, self.host
        );
        hex::encode(Sha256::digest(joined.as_bytes()))
    }
}

/// Kernel-reported host name files, checked before the shell variables.
const HOST_NAME_FILES: &[&str] = &["/etc/hostname", "/proc/sys/kernel/hostname"];

/// `HOSTNAME` is usually a non-exported shell variable, so the files win.
fn host_name() -> Option<String> {
    HOST_NAME_FILES
        .iter()
        .find_map(|path| read_host_file(Path::new(path)))
        .or_else(|| first_env(&["HOSTNAME", "COMPUTERNAME"]))
}

fn read_host_file(path: &Path) -> Option<String> {
    let raw = fs::read_to_string(path).ok()?;
    raw.lines()
        .map(str::trim)
        .find(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
}

fn first_env(names: &[&str]) -> Option<String> {
    names.iter().find_map(|name| {
        env::var(name)
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    })
}

/// Whether a snapshot's browser id identifies the current environment.
#[must_use]
pub fn is_self_import(snapshot_browser_id: &str, current_browser_id: &str) -> bool {
    !snapshot_browser_id.is_empty() && snapshot_browser_id == current_browser_id
}
