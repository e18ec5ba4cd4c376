//! Command-line interface for backsync.
//!
//! Dispatch is hand-rolled; every command writes through injected sinks
//! so tests can drive the full surface without a live process.

use std::env;
use std::io::Write;

pub mod args;
pub mod briefing;
pub mod classify;
pub mod config;
pub mod issues;
pub mod optimize;
pub mod prs;

/// Captured output of one command invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

const USAGE: &str = "\
backsync — keep markdown backlogs in sync with a Forgejo tracker

Usage: backsync <command> [flags]

Commands:
  prs        Sync pull requests into the backlog documents
  issues     Sync issues: snapshot file plus backlog sections
  briefing   Generate the daily briefing document
  classify   Classify a title/description (rule table, optional model)
  optimize   Add YAML frontmatter to wiki documents (--dir, --recursive)
  config     Manage the configuration file (path | init [--force])
  version    Print the version
  help       Print this help

Shared flags for prs/issues:
  --config <file>            Explicit config file
  --url <url>                Tracker base URL (FORGEJO_URL)
  --token <token>            Tracker token (FORGEJO_TOKEN)
  --owner <owner>            Repository owner (FORGEJO_OWNER)
  --repos <a,b>              Comma-separated repositories (FORGEJO_REPOS)
  --state <open|closed|all>  Record state filter
  --days-back <n|None>       Only records updated within n days
  --backlog-file <path>      Personal backlog document
  --crm-backlog-file <path>  Categorized backlog document (None disables)
  --output-file <path>       Issues snapshot file (issues only)
  --allow-empty              Reconcile even when the batch came back empty
";

pub fn run_from_env() -> i32 {
    let args: Vec<String> = env::args().skip(1).collect();
    let mut stdout = std::io::stdout();
    let mut stderr = std::io::stderr();
    run(&args, &mut stdout, &mut stderr)
}

pub fn run_for_test(args: &[&str]) -> CommandOutput {
    let owned: Vec<String> = args.iter().map(|arg| (*arg).to_string()).collect();
    let mut stdout = Vec::new();
    let mut stderr = Vec::new();
    let exit_code = run(&owned, &mut stdout, &mut stderr);
    CommandOutput {
        stdout: String::from_utf8_lossy(&stdout).into_owned(),
        stderr: String::from_utf8_lossy(&stderr).into_owned(),
        exit_code,
    }
}

pub fn run(args: &[String], stdout: &mut dyn Write, stderr: &mut dyn Write) -> i32 {
    let Some(command) = args.first() else {
        let _ = stdout.write_all(USAGE.as_bytes());
        return 0;
    };
    let rest = &args[1..];

    let result = match command.as_str() {
        "help" | "--help" | "-h" => Ok(USAGE.to_string()),
        "version" | "--version" => Ok(format!("backsync {}\n", env!("CARGO_PKG_VERSION"))),
        "prs" => prs::run(rest),
        "issues" => issues::run(rest),
        "briefing" => briefing::run(rest),
        "classify" => classify::run(rest),
        "optimize" => optimize::run(rest),
        "config" => config::run(rest),
        other => Err(format!("unknown command: {other:?} (try `backsync help`)")),
    };

    match result {
        Ok(output) => {
            let _ = stdout.write_all(output.as_bytes());
            0
        }
        Err(message) => {
            let _ = writeln!(stderr, "error: {message}");
            1
        }
    }
}

/// Build a current-thread runtime for driving the async client from
/// synchronous command handlers.
pub(crate) fn runtime() -> Result<tokio::runtime::Runtime, String> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|err| format!("start runtime: {err}"))
}
