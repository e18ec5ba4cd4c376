//! The personal backlog's `## BACKLOG - Issues` section.
//!
//! Unlike the team section this one is bootstrapped on demand: when the
//! heading is missing it is inserted before `## Automation` (so the
//! automation notes stay last) or appended.

use std::collections::BTreeMap;

use backsync_engine::{
    build_region_body, ensure_heading, locate, order_entries, parse_entries, reconcile,
    splice_region, Anchor, EngineError, EntryPattern, EntryRank, Placement, ReconcileCounts,
};
use backsync_tracker::Issue;

pub const ISSUES_SECTION_HEADING: &str = "## BACKLOG - Issues";
pub const AUTOMATION_HEADING: &str = "## Automation";

/// One issue entry, tagged with the repository it came from.
pub fn render_issue(repo: &str, issue: &Issue) -> String {
    let title = issue.title();
    let title = if title.is_empty() { "(no title)" } else { title };

    let mut lines: Vec<String> = Vec::new();
    match issue.id() {
        Some(id) => lines.push(format!("#### #{id} {title}")),
        None => lines.push(format!("#### {title}")),
    }
    lines.push(format!("- **Repo:** {repo}"));
    lines.push(format!("- **Link:** {}", issue.html_url()));
    let labels = issue.label_names();
    if !labels.is_empty() {
        lines.push(format!("- **Labels:** {}", labels.join(", ")));
    }
    lines.push(format!("- **Assignee:** {}", issue.assignee_line()));
    lines.push(format!("- **Status:** {}", issue.state()));
    if let Some(date) = issue.updated_date() {
        lines.push(format!("- **Updated at:** {date}"));
    }
    lines.join("\n")
}

/// Rank: open before closed, then newest update, then highest ID.
pub fn issue_rank(issue: &Issue) -> EntryRank {
    EntryRank {
        bucket: u8::from(!issue.is_open()),
        timestamp: issue.updated_timestamp(),
        id: issue.id().unwrap_or(0),
    }
}

/// Sync the issues section against `(repo, issue)` pairs, creating the
/// section when absent.
pub fn sync_issues_section(
    text: &str,
    items: &[(String, Issue)],
) -> Result<(String, ReconcileCounts), EngineError> {
    let (text, _) = ensure_heading(
        text,
        ISSUES_SECTION_HEADING,
        &Placement::BeforeHeading(AUTOMATION_HEADING.to_string()),
    );
    let region = locate(&text, &Anchor::heading(ISSUES_SECTION_HEADING))?;
    let parsed = parse_entries(&text[region.start..region.end], &EntryPattern::HashId);

    let (map, mut counts) = reconcile(
        &parsed.entries,
        items,
        |(_, issue)| issue.id(),
        |_| true,
        |(repo, issue)| render_issue(repo, issue),
    );
    counts.skipped += parsed.malformed;

    let ranks: BTreeMap<u64, EntryRank> = items
        .iter()
        .filter_map(|(_, issue)| issue.id().map(|id| (id, issue_rank(issue))))
        .collect();
    let ordered = order_entries(&map, |id, _| {
        ranks.get(&id).copied().unwrap_or(EntryRank::by_id(id))
    });

    let body = build_region_body(&parsed.prefix, &ordered, true);
    Ok((splice_region(&text, region, &body), counts))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
