//! The categorized project backlog: label-bucketed sections with
//! numbered, renumbered entry templates.
//!
//! Pull requests split across `## Features` and
//! `## Bugs / Enhancements / Maintenance` by label; issues are managed
//! strictly between auto-markers under `### Issues` inside
//! `## [Unreleased]` so the long-form notes in that section can never be
//! wiped by a sync.

use backsync_engine::{
    build_region_body, bucket_records, ensure_heading, ensure_markers, locate, order_entries,
    parse_entries, reconcile, renumber, splice_region, Anchor, EngineError, EntryPattern,
    EntryRank, LinkKind, Placement, ReconcileCounts,
};
use backsync_tracker::{timestamp, Issue, PullRequest};

use crate::personal::include_pull_request;
use crate::title::clean_title;

pub const FEATURES_HEADING: &str = "## Features";
pub const BEM_HEADING: &str = "## Bugs / Enhancements / Maintenance";
pub const UNRELEASED_HEADING: &str = "## [Unreleased]";
pub const ISSUES_SUBHEADING: &str = "### Issues";
pub const ISSUES_MARK_BEGIN: &str = "<!-- AUTO:ISSUES:BEGIN -->";
pub const ISSUES_MARK_END: &str = "<!-- AUTO:ISSUES:END -->";

const IN_PROGRESS_TAG: &str = "In Progress";

/// Which section a pull request belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum CrmBucket {
    Features,
    Maintenance,
}

impl CrmBucket {
    pub fn heading(self) -> &'static str {
        match self {
            Self::Features => FEATURES_HEADING,
            Self::Maintenance => BEM_HEADING,
        }
    }
}

/// Any label containing `feature` routes to the Features section.
pub fn classify_pull_request(pr: &PullRequest) -> CrmBucket {
    let is_feature = pr
        .label_names()
        .iter()
        .any(|name| name.to_lowercase().contains("feature"));
    if is_feature {
        CrmBucket::Features
    } else {
        CrmBucket::Maintenance
    }
}

/// Numbered template for one pull request; the ordinal placeholder is
/// substituted after ordering.
pub fn render_pull_request_template(pr: &PullRequest) -> String {
    let tag = pr
        .merged_date()
        .unwrap_or_else(|| IN_PROGRESS_TAG.to_string());
    let cleaned = clean_title(pr.title());
    let title = if cleaned.is_empty() {
        "(no title)"
    } else {
        cleaned.as_str()
    };
    format!(
        "#### {{n}}. [{tag}] - {title}\n    > {desc}\n\n   **Link:** {url}\n   **Assignee:** {assignee}",
        desc = pr.first_description_line(),
        url = pr.html_url(),
        assignee = pr.assignee_line(),
    )
}

/// Numbered template for one issue, with the full (image-stripped) body
/// indented under the title line.
pub fn render_issue_template(issue: &Issue) -> String {
    let tag = if issue.is_open() {
        IN_PROGRESS_TAG.to_string()
    } else {
        issue
            .closed_date()
            .unwrap_or_else(|| IN_PROGRESS_TAG.to_string())
    };
    let title = issue.title();
    let title = if title.is_empty() { "(no title)" } else { title };

    let body = issue.body_without_images();
    let body_block = if body.is_empty() {
        String::new()
    } else {
        let indented: Vec<String> = body
            .lines()
            .map(|line| {
                if line.trim().is_empty() {
                    String::new()
                } else {
                    format!("    {line}")
                }
            })
            .collect();
        format!("{}\n", indented.join("\n").trim_end())
    };

    format!(
        "#### {{n}}. [{tag}] - {title}\n{body_block}\n   **Link:** {url}\n   **Assignee:** {assignee}",
        url = issue.html_url(),
        assignee = issue.assignee_line(),
    )
}

/// Rank an entry by the tag embedded in its rendered text: `In Progress`
/// entries first, then dated entries newest first, then ID descending.
/// A tag that is not a parsable date counts as in-progress.
fn tag_rank(id: u64, entry: &str) -> EntryRank {
    let dated = embedded_tag(entry)
        .map(|tag| timestamp(&format!("{tag}T00:00:00Z")))
        .filter(|ts| *ts > 0);
    match dated {
        Some(ts) => EntryRank {
            bucket: 1,
            timestamp: ts,
            id,
        },
        None => EntryRank {
            bucket: 0,
            timestamp: 0,
            id,
        },
    }
}

/// The `[...]` tag on the entry's first line.
fn embedded_tag(entry: &str) -> Option<String> {
    let first = entry.lines().next()?;
    let open = first.find('[')?;
    let close = first[open + 1..].find(']')?;
    Some(first[open + 1..open + 1 + close].to_string())
}

/// Sync both pull-request sections, creating missing headings, and return
/// the new text plus per-section counts.
pub fn sync_crm_pull_requests(
    text: &str,
    prs: &[PullRequest],
) -> Result<(String, Vec<(CrmBucket, ReconcileCounts)>), EngineError> {
    let (text, _) = ensure_heading(text, FEATURES_HEADING, &Placement::AfterFirstH1);
    let (mut text, _) = ensure_heading(&text, BEM_HEADING, &Placement::End);

    let mut buckets = bucket_records(prs.to_vec(), classify_pull_request);
    buckets.entry(CrmBucket::Features).or_default();
    buckets.entry(CrmBucket::Maintenance).or_default();

    let mut reports = Vec::new();
    for (bucket, records) in buckets {
        let (next, counts) = sync_numbered_section(
            &text,
            &Anchor::heading(bucket.heading()),
            LinkKind::Pulls,
            true,
            &records,
            PullRequest::id,
            include_pull_request,
            render_pull_request_template,
        )?;
        text = next;
        reports.push((bucket, counts));
    }
    Ok((text, reports))
}

/// Sync the issues auto-block, creating the `[Unreleased]` scaffolding and
/// marker pair on demand.
pub fn sync_crm_issues(
    text: &str,
    issues: &[Issue],
) -> Result<(String, ReconcileCounts), EngineError> {
    let (text, _) = ensure_heading(text, UNRELEASED_HEADING, &Placement::AfterFirstH1);
    let (text, _) = ensure_heading(
        &text,
        ISSUES_SUBHEADING,
        &Placement::AfterHeading(UNRELEASED_HEADING.to_string()),
    );
    let (text, _) = ensure_markers(&text, ISSUES_SUBHEADING, ISSUES_MARK_BEGIN, ISSUES_MARK_END)?;

    sync_numbered_section(
        &text,
        &Anchor::markers(ISSUES_MARK_BEGIN, ISSUES_MARK_END),
        LinkKind::Issues,
        false,
        issues,
        Issue::id,
        |_| true,
        render_issue_template,
    )
}

/// One reconcile+order+renumber+splice pass over a numbered-template
/// region.
#[allow(clippy::too_many_arguments)]
fn sync_numbered_section<R>(
    text: &str,
    anchor: &Anchor,
    link: LinkKind,
    leading_blank: bool,
    records: &[R],
    id_of: impl Fn(&R) -> Option<u64>,
    include: impl Fn(&R) -> bool,
    render: impl Fn(&R) -> String,
) -> Result<(String, ReconcileCounts), EngineError> {
    let region = locate(text, anchor)?;
    let parsed = parse_entries(
        &text[region.start..region.end],
        &EntryPattern::NumberedTemplate { link },
    );

    let (map, mut counts) = reconcile(&parsed.entries, records, id_of, include, render);
    counts.skipped += parsed.malformed;

    let ordered = renumber(order_entries(&map, tag_rank));
    let body = build_region_body(&parsed.prefix, &ordered, leading_blank);
    Ok((splice_region(text, region, &body), counts))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
