//! Recall client
//!
//! One-shot process invoked from shell hooks on every prompt and after
//! every command. Builds a single request, talks to the daemon, prints the
//! response body, exits. Fail-silent by design: a missing daemon must never
//! block or clutter the shell.
//!
//! Exit codes: 0 on a completed round trip or graceful no-daemon skip,
//! 1 when the socket exists but cannot be connected.

use std::io::Write;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};

use recall_core::ipc::{send_request, IpcError};
use recall_core::{Request, Scope};

#[derive(Parser)]
#[command(name = "recall")]
#[command(about = "Context-aware shell history suggestions")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Suggest past commands matching a query
    Suggest {
        /// Substring to match against recorded commands
        query: String,

        /// Search scope
        #[arg(long, value_enum, default_value = "global")]
        scope: ScopeArg,

        /// Working directory for --scope cwd
        #[arg(long)]
        cwd: Option<String>,

        /// Branch name for --scope branch
        #[arg(long)]
        branch: Option<String>,

        /// Only suggest commands that exited successfully
        #[arg(long)]
        success: bool,
    },

    /// Record one command execution (called by the shell hook)
    Record {
        /// The command line that ran
        #[arg(long)]
        cmd: String,

        /// Opaque shell session identifier
        #[arg(long)]
        session: String,

        /// Absolute working directory of the execution
        #[arg(long)]
        cwd: String,

        /// Exit code of the execution
        #[arg(long)]
        exit: i32,

        /// Wall-clock duration in milliseconds
        #[arg(long)]
        duration: i64,
    },
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ScopeArg {
    Global,
    Cwd,
    Branch,
}

/// A scoped query with no context value degrades to global rather than
/// sending a request the daemon would reject.
fn build_scope(scope: ScopeArg, cwd: Option<String>, branch: Option<String>) -> Scope {
    match scope {
        ScopeArg::Global => Scope::Global,
        ScopeArg::Cwd => cwd.map(Scope::Directory).unwrap_or(Scope::Global),
        ScopeArg::Branch => branch.map(Scope::Branch).unwrap_or(Scope::Global),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let request = match cli.command {
        Commands::Suggest {
            query,
            scope,
            cwd,
            branch,
            success,
        } => Request::Suggest {
            query,
            scope: build_scope(scope, cwd, branch),
            only_success: success,
        },
        Commands::Record {
            cmd,
            session,
            cwd,
            exit,
            duration,
        } => Request::Record {
            cmd,
            session_id: session,
            cwd,
            exit_code: exit,
            duration_ms: duration,
        },
    };

    match send_request(&request) {
        Ok(body) => {
            // The shell captures stdout verbatim; an empty body means
            // "no suggestion" and prints nothing.
            let mut stdout = std::io::stdout();
            let _ = stdout.write_all(&body);
            let _ = stdout.flush();
            ExitCode::SUCCESS
        }
        // Daemon never started: skip quietly, the shell must not notice.
        Err(IpcError::DaemonNotRunning) => ExitCode::SUCCESS,
        Err(_) => ExitCode::FAILURE,
    }
}
