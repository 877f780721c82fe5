//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Export, store and selectively re-apply encrypted cookie snapshots.
///
/// Cookies are read from and written to a cookie file (JSON or Netscape
/// `cookies.txt`). Snapshots are encrypted with a password and saved to a
/// local downloads directory or a remote document.
#[derive(Parser, Debug)]
#[command(name = "cookiesync")]
#[command(author, version, about)]
pub struct Cli {
    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Directory holding settings, the activity log and the local cache
    #[arg(long, env = "COOKIESYNC_CONFIG_DIR", global = true)]
    pub config_dir: Option<PathBuf>,

    /// Cookie file to export from and import into (defaults to cookies.json in the config directory)
    #[arg(long, env = "COOKIESYNC_COOKIES", global = true)]
    pub cookies: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Encrypt selected cookies and save them to the configured backend
    Export(ExportArgs),
    /// Fetch, decrypt and apply a snapshot
    Import(ImportArgs),
    /// Show or clear the activity log
    Log {
        #[command(subcommand)]
        command: LogCommand,
    },
    /// Manage backend settings
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
    /// Manage the local chunked cookie cache
    Cache {
        #[command(subcommand)]
        command: CacheCommand,
    },
}

#[derive(Args, Debug, Clone)]
pub struct PasswordArgs {
    /// Encryption password
    #[arg(long, env = "COOKIESYNC_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct SelectionArgs {
    /// Select cookies by identity (`domain|name|path`); repeatable
    #[arg(long = "select", value_name = "ID", conflicts_with = "domain")]
    pub ids: Vec<String>,

    /// Select cookies whose domain matches a wildcard pattern (`*`, `?`)
    #[arg(long, value_name = "PATTERN")]
    pub domain: Option<String>,
}

#[derive(Args, Debug)]
pub struct ExportArgs {
    #[command(flatten)]
    pub password: PasswordArgs,

    #[command(flatten)]
    pub selection: SelectionArgs,

    /// Do not mirror the exported cookies into the local cache
    #[arg(long)]
    pub no_cache: bool,
}

#[derive(Args, Debug)]
pub struct ImportArgs {
    #[command(flatten)]
    pub password: PasswordArgs,

    #[command(flatten)]
    pub selection: SelectionArgs,

    /// Read the blob from a downloaded file instead of the configured backend
    #[arg(long, value_name = "PATH")]
    pub file: Option<PathBuf>,

    /// Show the snapshot summary and its cookies without applying anything
    #[arg(long)]
    pub list: bool,
}

#[derive(Subcommand, Debug)]
pub enum LogCommand {
    /// Print activity log entries, newest first
    Show {
        /// Maximum number of entries to print
        #[arg(short = 'n', long, default_value_t = 20, value_parser = clap::value_parser!(u16).range(1..=100))]
        limit: u16,
    },
    /// Remove all entries
    Clear,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Print the stored backend settings (token redacted)
    Show,
    /// Save snapshots as files in a local directory
    SetLocal {
        /// Target directory (defaults to the user's downloads directory)
        #[arg(long, value_name = "DIR")]
        dir: Option<PathBuf>,
    },
    /// Save snapshots in a remote document
    SetRemote {
        /// API access token
        #[arg(long, env = "COOKIESYNC_TOKEN", hide_env_values = true)]
        token: String,

        /// API base URL
        #[arg(long, default_value = cookiesync_core::backend::DEFAULT_API_URL)]
        api_url: String,

        /// Existing document id (looked up by filename when omitted)
        #[arg(long)]
        document_id: Option<String>,
    },
    /// Remove stored settings
    Reset,
    /// Check the configured backend is reachable
    Test,
}

#[derive(Subcommand, Debug)]
pub enum CacheCommand {
    /// Write the selected cookies into the cache
    Sync {
        #[command(flatten)]
        selection: SelectionArgs,
    },
    /// Print cached cookie count and last sync time
    Status,
    /// Remove cached chunks and metadata
    Clear,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_verbose_flag_increments_count() {
        let cli = Cli::try_parse_from(["cookiesync", "-vv", "log", "clear"]).unwrap();
        assert_eq!(cli.verbose, 2);
        assert!(!cli.quiet);
    }

    #[test]
    fn test_cli_requires_subcommand() {
        let err = Cli::try_parse_from(["cookiesync"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingSubcommand);
    }

    #[test]
    fn test_cli_export_collects_repeated_ids() {
        let cli = Cli::try_parse_from([
            "cookiesync",
            "export",
            "--password",
            "pw",
            "--select",
            "a.com|sid|/",
            "--select",
            "b.com|t|/",
        ])
        .unwrap();
        let Command::Export(args) = cli.command else {
            panic!("expected export");
        };
        assert_eq!(args.selection.ids.len(), 2);
        assert_eq!(args.password.password.as_deref(), Some("pw"));
    }

    #[test]
    fn test_cli_select_conflicts_with_domain() {
        let err = Cli::try_parse_from([
            "cookiesync",
            "import",
            "--select",
            "a.com|sid|/",
            "--domain",
            "*.a.com",
        ])
        .unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }

    #[test]
    fn test_cli_log_limit_range_enforced() {
        let err = Cli::try_parse_from(["cookiesync", "log", "show", "-n", "0"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn test_cli_set_remote_defaults_api_url() {
        let cli =
            Cli::try_parse_from(["cookiesync", "config", "set-remote", "--token", "t"]).unwrap();
        let Command::Config {
            command: ConfigCommand::SetRemote { api_url, .. },
        } = cli.command
        else {
            panic!("expected set-remote");
        };
        assert_eq!(api_url, "https://api.github.com");
    }
}
