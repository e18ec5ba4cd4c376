//! `backsync issues` — issue snapshot plus backlog sections.

use backsync_backlog::{SyncOptions, SyncRunner};

use crate::args::parse_flags;
use crate::prs::{configured, TRACKER_FLAGS};
use crate::runtime;

pub fn run(args: &[String]) -> Result<String, String> {
    let mut allowed: Vec<&str> = TRACKER_FLAGS.to_vec();
    allowed.push("--output-file");
    let flags = parse_flags("issues", args, &allowed)?;
    let mut cfg = configured(&flags)?;

    if let Some(path) = flags.get("--output-file") {
        cfg.outputs.issues_snapshot = path.clone();
    }

    let mut options = SyncOptions::from_config(&cfg);
    if let Some(state) = flags.get("--state") {
        options.issue_state = state.clone();
    }
    options.allow_empty_batch = flags.contains_key("--allow-empty");

    let runner = SyncRunner::new(&cfg, options).map_err(|err| err.to_string())?;
    let report = runtime()?
        .block_on(runner.sync_issues())
        .map_err(|err| err.to_string())?;
    Ok(format!("{}\n", report.summary()))
}
