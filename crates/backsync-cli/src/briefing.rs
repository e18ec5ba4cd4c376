//! `backsync briefing` — generate the daily briefing document.

use std::path::{Path, PathBuf};

use chrono::Local;

use backsync_backlog::briefing::{generate_briefing, BriefingSources};

use crate::args::parse_flags;
use crate::config::load_config;

const FLAGS: [&str; 4] = [
    "--config",
    "--backlog-file",
    "--notes-dir",
    "--issues-snapshot",
];

pub fn run(args: &[String]) -> Result<String, String> {
    let flags = parse_flags("briefing", args, &FLAGS)?;
    let cfg = load_config(flags.get("--config").map(Path::new))?;

    let notes_dir = flags
        .get("--notes-dir")
        .cloned()
        .unwrap_or(cfg.outputs.notes_dir.clone());
    let backlog = flags
        .get("--backlog-file")
        .cloned()
        .unwrap_or(cfg.outputs.personal_backlog.clone());
    let issues_snapshot = flags
        .get("--issues-snapshot")
        .cloned()
        .unwrap_or(cfg.outputs.issues_snapshot.clone());

    let sources = BriefingSources {
        prs_snapshot: snapshot_sibling(&issues_snapshot, "team_prs_summary.md"),
        issues_snapshot: PathBuf::from(issues_snapshot),
        backlog: PathBuf::from(backlog),
        notes_dir: PathBuf::from(notes_dir),
    };

    let (path, _) = generate_briefing(&sources, Local::now()).map_err(|err| err.to_string())?;
    Ok(format!("briefing written: {}\n", path.display()))
}

/// The PR snapshot lives next to the issues snapshot.
fn snapshot_sibling(issues_snapshot: &str, name: &str) -> PathBuf {
    Path::new(issues_snapshot)
        .parent()
        .map_or_else(|| PathBuf::from(name), |dir| dir.join(name))
}
