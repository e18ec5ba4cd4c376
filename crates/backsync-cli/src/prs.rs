//! `backsync prs` — pull-request backlog sync.

use std::collections::BTreeMap;
use std::path::Path;

use backsync_backlog::{SyncOptions, SyncRunner};
use backsync_core::{parse_days_back, split_csv, Config};

use crate::args::parse_flags;
use crate::config::load_config;
use crate::runtime;

pub(crate) const TRACKER_FLAGS: [&str; 10] = [
    "--config",
    "--url",
    "--token",
    "--owner",
    "--repos",
    "--state",
    "--days-back",
    "--backlog-file",
    "--crm-backlog-file",
    "--allow-empty",
];

pub fn run(args: &[String]) -> Result<String, String> {
    let flags = parse_flags("prs", args, &TRACKER_FLAGS)?;
    let cfg = configured(&flags)?;

    let mut options = SyncOptions::from_config(&cfg);
    if let Some(state) = flags.get("--state") {
        options.pr_state = state.clone();
    }
    options.allow_empty_batch = flags.contains_key("--allow-empty");

    let runner = SyncRunner::new(&cfg, options).map_err(|err| err.to_string())?;
    let report = runtime()?
        .block_on(runner.sync_pull_requests())
        .map_err(|err| err.to_string())?;
    Ok(format!("{}\n", report.summary()))
}

/// Load config, apply shared tracker flags, validate.
pub(crate) fn configured(flags: &BTreeMap<String, String>) -> Result<Config, String> {
    let explicit = flags.get("--config").map(Path::new);
    let mut cfg = load_config(explicit)?;

    if let Some(url) = flags.get("--url") {
        cfg.tracker.base_url = url.clone();
    }
    if let Some(token) = flags.get("--token") {
        cfg.tracker.token = token.clone();
    }
    if let Some(owner) = flags.get("--owner") {
        cfg.tracker.owner = owner.clone();
    }
    if let Some(repos) = flags.get("--repos") {
        cfg.tracker.repos = split_csv(repos);
    }
    if let Some(days) = flags.get("--days-back") {
        cfg.tracker.days_back = parse_days_back(days);
    }
    if let Some(path) = flags.get("--backlog-file") {
        cfg.outputs.personal_backlog = path.clone();
    }
    if let Some(path) = flags.get("--crm-backlog-file") {
        cfg.outputs.crm_backlog = if path == "None" {
            None
        } else {
            Some(path.clone())
        };
    }

    cfg.expand_paths();
    cfg.validate()?;
    Ok(cfg)
}
