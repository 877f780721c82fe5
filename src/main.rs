//! CLI entry point for cookiesync.

use std::process::ExitCode;

use clap::Parser;
use tracing::debug;

mod app;
mod cli;
mod commands;

use cli::Cli;

/// Process exit outcome: `0` success, `1` failure, `2` partial import.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ProcessExit {
    Success,
    Failure,
    Partial,
}

impl ProcessExit {
    fn code(self) -> u8 {
        match self {
            Self::Success => 0,
            Self::Failure => 1,
            Self::Partial => 2,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let cli = Cli::parse();

    let default_level = app::terminal::resolve_default_log_level(cli.verbose, cli.quiet);
    app::terminal::init_tracing(default_level, app::terminal::is_no_color_requested());
    debug!(
        verbose = cli.verbose,
        quiet = cli.quiet,
        "CLI arguments parsed"
    );

    let exit = match app::dispatcher::dispatch(&cli).await {
        Ok(exit) => exit,
        Err(error) => {
            eprintln!("Error: {error:#}");
            ProcessExit::Failure
        }
    };
    ExitCode::from(exit.code())
}

#[cfg(test)]
mod tests {
    use super::ProcessExit;

    #[test]
    fn test_process_exit_codes() {
        assert_eq!(ProcessExit::Success.code(), 0);
        assert_eq!(ProcessExit::Failure.code(), 1);
        assert_eq!(ProcessExit::Partial.code(), 2);
    }
}
