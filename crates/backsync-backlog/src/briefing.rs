//! Daily briefing generation.
//!
//! Aggregates the generated snapshots, the backlog's current-focus items,
//! and inbox notes into one dated markdown report under
//! `<notes_dir>/daily/`.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};

use backsync_engine::{write_atomic, EngineError};

const FOCUS_HEADING: &str = "## Current focus";
const MAX_PRIORITIES: usize = 5;
const MAX_INBOX_ITEMS: usize = 10;

/// Input documents scanned for the briefing.
#[derive(Debug, Clone)]
pub struct BriefingSources {
    pub prs_snapshot: PathBuf,
    pub issues_snapshot: PathBuf,
    pub backlog: PathBuf,
    pub notes_dir: PathBuf,
}

/// Build and persist the briefing; returns the output path and text.
pub fn generate_briefing(
    sources: &BriefingSources,
    now: DateTime<Local>,
) -> Result<(PathBuf, String), EngineError> {
    let date = now.format("%Y-%m-%d").to_string();
    let output = sources
        .notes_dir
        .join("daily")
        .join(format!("{date}_briefing.md"));

    let text = render_briefing(sources, now);
    write_atomic(&output, &text)?;
    Ok((output, text))
}

/// Render the briefing markdown without touching the filesystem for
/// output.
pub fn render_briefing(sources: &BriefingSources, now: DateTime<Local>) -> String {
    let pr_count = count_snapshot_items(&sources.prs_snapshot);
    let issue_count = count_snapshot_items(&sources.issues_snapshot);
    let priorities = focus_items(&sources.backlog);
    let inbox = inbox_items(&sources.notes_dir);

    let mut lines: Vec<String> = Vec::new();
    lines.push(format!("# Daily Briefing - {}", now.format("%Y-%m-%d")));
    lines.push(String::new());
    lines.push(format!("Generated: {}", now.format("%Y-%m-%d %H:%M")));
    lines.push(String::new());
    lines.push("## Summary".to_string());
    lines.push(String::new());
    lines.push(format!("- **PRs:** {pr_count} active"));
    lines.push(format!("- **Issues:** {issue_count} active"));
    lines.push(format!("- **Backlog items:** {}", priorities.len()));
    lines.push(format!("- **Inbox items:** {}", inbox.len()));
    lines.push(String::new());
    lines.push("## Top Priorities".to_string());
    lines.push(String::new());
    if priorities.is_empty() {
        lines.push("- (no priorities found)".to_string());
    } else {
        for (i, priority) in priorities.iter().take(MAX_PRIORITIES).enumerate() {
            lines.push(format!("{}. {priority}", i + 1));
        }
    }
    lines.push(String::new());
    lines.push("## Inbox Items".to_string());
    lines.push(String::new());
    if inbox.is_empty() {
        lines.push("- (inbox empty)".to_string());
    } else {
        for item in inbox.iter().take(MAX_INBOX_ITEMS) {
            lines.push(format!("- {item}"));
        }
    }
    lines.push(String::new());

    lines.join("\n")
}

/// Count `- #` item lines in a generated snapshot, zero when absent.
fn count_snapshot_items(path: &Path) -> usize {
    match fs::read_to_string(path) {
        Ok(text) => text
            .lines()
            .filter(|line| line.trim_start().starts_with("- #"))
            .count(),
        Err(_) => 0,
    }
}

/// Unchecked task lines under the backlog's current-focus heading.
fn focus_items(backlog: &Path) -> Vec<String> {
    let Ok(text) = fs::read_to_string(backlog) else {
        return Vec::new();
    };
    let Some(at) = text.find(FOCUS_HEADING) else {
        return Vec::new();
    };
    let section = &text[at + FOCUS_HEADING.len()..];
    let end = section.find("\n## ").unwrap_or(section.len());

    section[..end]
        .lines()
        .filter_map(|line| line.trim().strip_prefix("- [ ]"))
        .map(|item| item.trim().to_string())
        .filter(|item| !item.is_empty())
        .collect()
}

/// Markdown note stems in the inbox directory, sorted, index excluded.
fn inbox_items(notes_dir: &Path) -> Vec<String> {
    let inbox = notes_dir.join("00_inbox");
    let Ok(entries) = fs::read_dir(&inbox) else {
        return Vec::new();
    };
    let mut items: Vec<String> = entries
        .filter_map(Result::ok)
        .filter_map(|entry| {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "md") {
                path.file_stem()
                    .map(|stem| stem.to_string_lossy().into_owned())
            } else {
                None
            }
        })
        .filter(|stem| stem != "index")
        .collect();
    items.sort();
    items
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at() -> DateTime<Local> {
        Local.with_ymd_and_hms(2026, 8, 5, 7, 0, 0).unwrap()
    }

    fn sources_in(dir: &Path) -> BriefingSources {
        BriefingSources {
            prs_snapshot: dir.join("team_prs_summary.md"),
            issues_snapshot: dir.join("team_issues_summary.md"),
            backlog: dir.join("BACKLOG.md"),
            notes_dir: dir.join("notes"),
        }
    }

    #[test]
    fn briefing_counts_sources() {
        let dir = tempfile::tempdir().unwrap();
        let sources = sources_in(dir.path());

        fs::write(&sources.issues_snapshot, "- #1 **a**\n- #2 **b**\n").unwrap();
        fs::write(
            &sources.backlog,
            "# W\n\n## Current focus\n\n- [ ] ship sync\n- [x] done item\n- [ ] fix daemon\n\n## Other\n",
        )
        .unwrap();
        let inbox = sources.notes_dir.join("00_inbox");
        fs::create_dir_all(&inbox).unwrap();
        fs::write(inbox.join("idea.md"), "").unwrap();
        fs::write(inbox.join("index.md"), "").unwrap();

        let text = render_briefing(&sources, at());
        assert!(text.contains("- **PRs:** 0 active"));
        assert!(text.contains("- **Issues:** 2 active"));
        assert!(text.contains("- **Backlog items:** 2"));
        assert!(text.contains("1. ship sync"));
        assert!(text.contains("2. fix daemon"));
        assert!(!text.contains("done item"));
        assert!(text.contains("- idea"));
        assert!(!text.contains("- index"));
    }

    #[test]
    fn briefing_tolerates_missing_sources() {
        let dir = tempfile::tempdir().unwrap();
        let text = render_briefing(&sources_in(dir.path()), at());
        assert!(text.contains("- (no priorities found)"));
        assert!(text.contains("- (inbox empty)"));
    }

    #[test]
    fn generate_writes_dated_file() {
        let dir = tempfile::tempdir().unwrap();
        let sources = sources_in(dir.path());
        let (path, text) = generate_briefing(&sources, at()).unwrap();
        assert!(path.ends_with("daily/2026-08-05_briefing.md"));
        assert_eq!(fs::read_to_string(&path).unwrap(), text);
        assert!(text.starts_with("# Daily Briefing - 2026-08-05"));
    }
}
