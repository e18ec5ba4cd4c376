//! The standalone issues snapshot document.
//!
//! Rewritten whole on every run (not region-synced): it is a generated
//! report, not a document anyone edits by hand.

use std::collections::BTreeMap;

use chrono::{DateTime, Local};

use backsync_tracker::{date_part, Issue};

/// Parameters echoed into the snapshot header.
#[derive(Debug, Clone)]
pub struct SnapshotScope {
    pub owner: String,
    pub repos: Vec<String>,
    pub state: String,
    pub days_back: Option<i64>,
}

/// Render the full snapshot markdown for issues grouped by repository.
pub fn render_snapshot(
    scope: &SnapshotScope,
    by_repo: &BTreeMap<String, Vec<Issue>>,
    now: DateTime<Local>,
) -> String {
    let mut lines: Vec<String> = Vec::new();
    lines.push("# Forgejo Issues Snapshot".to_string());
    lines.push(String::new());
    lines.push(format!("- Generated: {}", now.format("%Y-%m-%d %H:%M")));
    lines.push(format!("- Owner: `{}`", scope.owner));
    lines.push(format!(
        "- Repos: {}",
        scope
            .repos
            .iter()
            .map(|repo| format!("`{repo}`"))
            .collect::<Vec<_>>()
            .join(", ")
    ));
    lines.push(format!("- State: `{}`", scope.state));
    match scope.days_back {
        Some(days) => lines.push(format!("- Days back: `{days}`")),
        None => lines.push("- Days back: `all`".to_string()),
    }
    lines.push(String::new());

    let total: usize = by_repo.values().map(Vec::len).sum();
    lines.push("## Summary".to_string());
    lines.push(String::new());
    lines.push(format!("- Total issues: **{total}**"));
    for (repo, issues) in by_repo {
        lines.push(format!("- `{repo}`: **{}**", issues.len()));
    }
    lines.push(String::new());

    for (repo, issues) in by_repo {
        lines.push(format!("## {repo}"));
        lines.push(String::new());
        if issues.is_empty() {
            lines.push("- (none)".to_string());
            lines.push(String::new());
            continue;
        }
        for issue in issues {
            lines.push(render_snapshot_line(issue));
        }
        lines.push(String::new());
    }

    let mut out = lines.join("\n");
    out.truncate(out.trim_end().len());
    out.push('\n');
    out
}

fn render_snapshot_line(issue: &Issue) -> String {
    let mut tags: Vec<String> = Vec::new();
    let labels = issue.label_names();
    if !labels.is_empty() {
        tags.push(format!("labels={}", labels.join(", ")));
    }
    let assignees = issue.assignee_logins();
    if !assignees.is_empty() {
        tags.push(format!("assignees={}", assignees.join(", ")));
    }
    let tag_text = if tags.is_empty() {
        String::new()
    } else {
        format!(" ({})", tags.join("; "))
    };

    let created = issue.created_at.as_deref().map(date_part).unwrap_or_default();
    let updated = issue.updated_date().unwrap_or_default();

    let prefix = match issue.id() {
        Some(id) => format!("- #{id}"),
        None => "-".to_string(),
    };

    format!(
        "{prefix} **{title}** — {state} | created {created} | updated {updated} | by {author}{tag_text}\n  - {url}",
        title = issue.title(),
        state = issue.state(),
        author = issue.author_login(),
        url = issue.html_url(),
    )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
