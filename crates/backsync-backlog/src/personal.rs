//! The personal backlog's `## BACKLOG - Team` pull-request section.

use backsync_engine::{
    build_region_body, locate, order_entries, parse_entries, reconcile, splice_region, Anchor,
    EngineError, EntryPattern, EntryRank, ReconcileCounts,
};
use backsync_tracker::PullRequest;

use crate::title::strip_leading_issue_ref;

pub const TEAM_SECTION_HEADING: &str = "## BACKLOG - Team";

/// Legacy auto-marker lines left behind by an earlier generation of this
/// tool; stripped before parsing so they disappear on the next sync.
const LEGACY_MARKERS: [&str; 2] = [
    "<!-- AUTO:FORGEJO_PRS_START -->",
    "<!-- AUTO:FORGEJO_PRS_END -->",
];

/// Keep open or merged pull requests that carry a description; a closed
/// but unmerged record drops out, as does one whose description was
/// edited away.
pub fn include_pull_request(pr: &PullRequest) -> bool {
    pr.has_description() && (pr.is_open() || pr.is_merged())
}

/// Fixed-field block: title line, quoted summary, link/labels/assignee/
/// status details.
pub fn render_pull_request(pr: &PullRequest) -> String {
    let id = pr.number;
    let cleaned = strip_leading_issue_ref(pr.title());
    let title = if cleaned.is_empty() {
        "(no title)"
    } else {
        cleaned.as_str()
    };

    let status = if pr.is_merged() {
        "merged".to_string()
    } else if pr.is_open() {
        "open".to_string()
    } else {
        let state = pr.state();
        if state.is_empty() { "unknown" } else { state }.to_string()
    };

    let summary = pr.first_description_line();
    let summary = if summary.is_empty() {
        "(no description)".to_string()
    } else {
        summary
    };

    let mut lines: Vec<String> = Vec::new();
    lines.push(format!("#### #{id} {title}"));
    lines.push(format!("> {summary}"));
    lines.push(String::new());

    if !pr.html_url().is_empty() {
        lines.push(format!("- **Link:** {}", pr.html_url()));
    }
    let labels = pr.label_names();
    if !labels.is_empty() {
        lines.push(format!("- **Labels:** {}", labels.join(", ")));
    }
    lines.push(format!("- **Assignee:** {}", pr.assignee_line()));
    lines.push(format!("- **Status:** {status}"));
    if let Some(date) = pr.merged_date() {
        lines.push(format!("- **Merged at:** {date}"));
    }

    lines.join("\n")
}

/// Sync the team section against a pull-request batch.
///
/// The heading is required; this document is never bootstrapped from
/// nothing, so a missing heading is a structural error for the caller to
/// surface.
pub fn sync_team_section(
    text: &str,
    prs: &[PullRequest],
) -> Result<(String, ReconcileCounts), EngineError> {
    let region = locate(text, &Anchor::heading(TEAM_SECTION_HEADING))?;
    let section = strip_legacy_markers(&text[region.start..region.end]);

    let parsed = parse_entries(&section, &EntryPattern::HashId);
    let (map, mut counts) = reconcile(
        &parsed.entries,
        prs,
        PullRequest::id,
        include_pull_request,
        render_pull_request,
    );
    counts.skipped += parsed.malformed;

    let ordered = order_entries(&map, |id, _| EntryRank::by_id(id));
    let body = build_region_body(&parsed.prefix, &ordered, true);
    Ok((splice_region(text, region, &body), counts))
}

fn strip_legacy_markers(section: &str) -> String {
    section
        .split_inclusive('\n')
        .filter(|raw| {
            let line = raw.trim();
            !LEGACY_MARKERS.contains(&line)
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn pr(json: &str) -> PullRequest {
        serde_json::from_str(json).unwrap()
    }

    fn open_pr(number: u64, title: &str, body: &str) -> PullRequest {
        pr(&format!(
            r#"{{"number": {number}, "title": "{title}", "body": "{body}", "state": "open",
                "html_url": "https://git.example.test/team/crm/pulls/{number}"}}"#
        ))
    }

    const DOC: &str = "\
# Wiki

## BACKLOG - Team

## Next
";

    #[test]
    fn predicate_rules() {
        assert!(include_pull_request(&open_pr(1, "T", "described")));

        let closed_unmerged = pr(r#"{"number": 2, "body": "d", "state": "closed"}"#);
        assert!(!include_pull_request(&closed_unmerged));

        let merged =
            pr(r#"{"number": 3, "body": "d", "state": "closed", "merged_at": "2026-07-01T00:00:00Z"}"#);
        assert!(include_pull_request(&merged));

        let undescribed = pr(r#"{"number": 4, "state": "open"}"#);
        assert!(!include_pull_request(&undescribed));
    }

    #[test]
    fn rendered_block_shape() {
        let record = pr(
            r##"{"number": 31, "title": "#31 - Add exports", "body": "CSV export.\nmore",
                "state": "open",
                "html_url": "https://git.example.test/team/crm/pulls/31",
                "labels": [{"name": "feature"}],
                "assignees": [{"login": "dan"}]}"##,
        );
        let block = render_pull_request(&record);
        assert_eq!(
            block,
            "#### #31 Add exports\n\
             > CSV export.\n\
             \n\
             - **Link:** https://git.example.test/team/crm/pulls/31\n\
             - **Labels:** feature\n\
             - **Assignee:** @dan\n\
             - **Status:** open"
        );
    }

    #[test]
    fn merged_block_carries_merge_date() {
        let record = pr(
            r#"{"number": 8, "title": "T", "body": "d", "state": "closed",
                "merged_at": "2026-07-20T10:00:00Z"}"#,
        );
        let block = render_pull_request(&record);
        assert!(block.contains("- **Status:** merged"));
        assert!(block.contains("- **Merged at:** 2026-07-20"));
    }

    #[test]
    fn sync_orders_by_descending_id() {
        let batch = vec![open_pr(3, "Three", "d3"), open_pr(12, "Twelve", "d12")];
        let (out, counts) = sync_team_section(DOC, &batch).unwrap();
        assert_eq!(counts.inserted, 2);
        let twelve = out.find("#### #12").unwrap();
        let three = out.find("#### #3 ").unwrap();
        assert!(twelve < three);
        assert!(out.ends_with("## Next\n"));
    }

    #[test]
    fn missing_heading_is_fatal() {
        let err = sync_team_section("# Wiki\n", &[]).unwrap_err();
        assert!(matches!(err, EngineError::HeadingNotFound { .. }));
    }

    #[test]
    fn legacy_markers_vanish_without_touching_entries() {
        let doc = "\
## BACKLOG - Team

<!-- AUTO:FORGEJO_PRS_START -->
#### #5 Old entry
> kept

- **Assignee:** (unassigned)
- **Status:** open
<!-- AUTO:FORGEJO_PRS_END -->
";
        let batch = vec![open_pr(5, "Old entry", "kept")];
        let (out, _) = sync_team_section(doc, &batch).unwrap();
        assert!(!out.contains("AUTO:FORGEJO_PRS"));
        assert!(out.contains("#### #5 Old entry"));
    }

    #[test]
    fn resync_is_idempotent() {
        let batch = vec![open_pr(9, "Nine", "d9"), open_pr(4, "Four", "d4")];
        let (once, _) = sync_team_section(DOC, &batch).unwrap();
        let (twice, counts) = sync_team_section(&once, &batch).unwrap();
        assert_eq!(once, twice);
        assert!(!counts.changed());
        assert_eq!(counts.unchanged, 2);
    }
}
