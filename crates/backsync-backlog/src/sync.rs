//! Sync orchestration: fetch → reconcile → atomic write → counts report.
//!
//! Fetching is fully separated from document application so the document
//! flow stays testable without a live tracker. Nothing is written until a
//! whole document reconciled cleanly, and a document whose batch looks
//! truncated is refused rather than stripped.

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::{DateTime, Duration, Local, Utc};
use thiserror::Error;

use backsync_core::{Config, OutputsConfig};
use backsync_engine::{write_atomic, Document, EngineError, ReconcileCounts};
use backsync_tracker::{parse_utc, Issue, PullRequest, TrackerClient, TrackerError};

use crate::categorized::{sync_crm_issues, sync_crm_pull_requests};
use crate::issues::sync_issues_section;
use crate::personal::sync_team_section;
use crate::snapshot::{render_snapshot, SnapshotScope};

#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Tracker(#[from] TrackerError),

    /// The incoming batch was empty while the document still holds
    /// entries; reconciling would delete them all. Most likely a
    /// truncated fetch, so the document is left untouched.
    #[error(
        "refusing to reconcile {}: empty batch would remove {would_remove} entries \
         (pass allow-empty to override)",
        .document.display()
    )]
    SuspectEmptyBatch {
        document: PathBuf,
        would_remove: usize,
    },
}

/// Fetch scope and safeguards for one run.
#[derive(Debug, Clone)]
pub struct SyncOptions {
    pub pr_state: String,
    pub issue_state: String,
    pub days_back: Option<i64>,
    pub allow_empty_batch: bool,
}

impl SyncOptions {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            pr_state: cfg.tracker.pr_state.clone(),
            issue_state: cfg.tracker.issue_state.clone(),
            days_back: cfg.tracker.days_back,
            allow_empty_batch: false,
        }
    }
}

/// Counts for one synced section of one document.
#[derive(Debug, Clone)]
pub struct SectionReport {
    pub document: PathBuf,
    pub section: String,
    pub counts: ReconcileCounts,
}

/// Outcome of one sync run across all target documents.
#[derive(Debug, Clone, Default)]
pub struct SyncReport {
    pub sections: Vec<SectionReport>,
    pub fetched: usize,
}

impl SyncReport {
    pub fn changed(&self) -> bool {
        self.sections.iter().any(|section| section.counts.changed())
    }

    /// One line per section plus a closing status line; "nothing to do"
    /// reads differently from a failure.
    pub fn summary(&self) -> String {
        let mut lines: Vec<String> = Vec::new();
        for section in &self.sections {
            lines.push(format!(
                "{} / {}: {}",
                section.document.display(),
                section.section,
                section.counts
            ));
        }
        if self.changed() {
            lines.push("sync complete".to_string());
        } else {
            lines.push("sync complete, no changes".to_string());
        }
        lines.join("\n")
    }

    fn push(&mut self, document: &Document, section: &str, counts: ReconcileCounts) {
        self.sections.push(SectionReport {
            document: document.path().to_path_buf(),
            section: section.to_string(),
            counts,
        });
    }
}

// ---------------------------------------------------------------------------
// Document application (pure of any network)
// ---------------------------------------------------------------------------

/// Apply a pull-request batch to the personal and categorized backlogs.
pub fn apply_pull_requests(
    outputs: &OutputsConfig,
    prs: &[PullRequest],
    allow_empty_batch: bool,
) -> Result<SyncReport, SyncError> {
    let mut report = SyncReport {
        fetched: prs.len(),
        ..SyncReport::default()
    };

    let mut personal = Document::load(&outputs.personal_backlog)?;
    let (text, counts) = sync_team_section(personal.text(), prs)?;
    guard_empty_batch(prs.len(), counts.removed, allow_empty_batch, &personal)?;
    report.push(&personal, "BACKLOG - Team", counts);
    if text != personal.text() {
        personal.set_text(text);
        personal.save()?;
    }

    if let Some(crm_path) = &outputs.crm_backlog {
        let mut crm = Document::load(crm_path)?;
        let (text, bucket_reports) = sync_crm_pull_requests(crm.text(), prs)?;
        let removed_total: usize = bucket_reports.iter().map(|(_, c)| c.removed).sum();
        guard_empty_batch(prs.len(), removed_total, allow_empty_batch, &crm)?;
        for (bucket, counts) in bucket_reports {
            report.push(&crm, bucket.heading().trim_start_matches("## "), counts);
        }
        if text != crm.text() {
            crm.set_text(text);
            crm.save()?;
        }
    }

    Ok(report)
}

/// Apply an issue batch: snapshot file, personal issues section, and the
/// categorized issues block.
pub fn apply_issues(
    outputs: &OutputsConfig,
    scope: &SnapshotScope,
    by_repo: &BTreeMap<String, Vec<Issue>>,
    now: DateTime<Local>,
    allow_empty_batch: bool,
) -> Result<SyncReport, SyncError> {
    let items: Vec<(String, Issue)> = by_repo
        .iter()
        .flat_map(|(repo, issues)| {
            issues
                .iter()
                .map(move |issue| (repo.clone(), issue.clone()))
        })
        .collect();

    let mut report = SyncReport {
        fetched: items.len(),
        ..SyncReport::default()
    };

    let snapshot_path = PathBuf::from(&outputs.issues_snapshot);
    write_atomic(&snapshot_path, &render_snapshot(scope, by_repo, now))?;

    let mut personal = Document::load_or_empty(&outputs.personal_backlog)?;
    let (text, counts) = sync_issues_section(personal.text(), &items)?;
    guard_empty_batch(items.len(), counts.removed, allow_empty_batch, &personal)?;
    report.push(&personal, "BACKLOG - Issues", counts);
    if text != personal.text() {
        personal.set_text(text);
        personal.save()?;
    }

    if let Some(crm_path) = &outputs.crm_backlog {
        let issues: Vec<Issue> = items.iter().map(|(_, issue)| issue.clone()).collect();
        let mut crm = Document::load(crm_path)?;
        let (text, counts) = sync_crm_issues(crm.text(), &issues)?;
        guard_empty_batch(issues.len(), counts.removed, allow_empty_batch, &crm)?;
        report.push(&crm, "Unreleased Issues", counts);
        if text != crm.text() {
            crm.set_text(text);
            crm.save()?;
        }
    }

    Ok(report)
}

/// Minimum staleness safeguard for the full-replace policy: an empty
/// batch that would remove entries is treated as a truncated fetch.
fn guard_empty_batch(
    incoming: usize,
    would_remove: usize,
    allow_empty_batch: bool,
    document: &Document,
) -> Result<(), SyncError> {
    if incoming == 0 && would_remove > 0 && !allow_empty_batch {
        return Err(SyncError::SuspectEmptyBatch {
            document: document.path().to_path_buf(),
            would_remove,
        });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Runner: fetch + apply
// ---------------------------------------------------------------------------

/// Fetches records for the configured scope and applies them to the
/// target documents.
#[derive(Debug, Clone)]
pub struct SyncRunner {
    client: TrackerClient,
    owner: String,
    repos: Vec<String>,
    ignored_titles: Vec<String>,
    outputs: OutputsConfig,
    options: SyncOptions,
}

impl SyncRunner {
    pub fn new(cfg: &Config, options: SyncOptions) -> Result<Self, SyncError> {
        let client = TrackerClient::new(&cfg.tracker.base_url, &cfg.tracker.token)?;
        Ok(Self {
            client,
            owner: cfg.tracker.owner.clone(),
            repos: cfg.tracker.repos.clone(),
            ignored_titles: cfg.tracker.ignored_titles.clone(),
            outputs: cfg.outputs.clone(),
            options,
        })
    }

    /// Full pull-request sync: fetch (complete drain), cutoff filter,
    /// backlog application. Backlogs sync from the first configured
    /// repository.
    pub async fn sync_pull_requests(&self) -> Result<SyncReport, SyncError> {
        self.sync_pull_requests_at(Utc::now()).await
    }

    pub async fn sync_pull_requests_at(
        &self,
        now: DateTime<Utc>,
    ) -> Result<SyncReport, SyncError> {
        let cutoff = self.cutoff(now);

        // Backlogs track the first configured repository.
        let mut prs = match self.repos.first() {
            Some(repo) => {
                self.client
                    .list_pull_requests(&self.owner, repo, &self.options.pr_state)
                    .await?
            }
            None => Vec::new(),
        };
        if let Some(cutoff) = cutoff {
            prs.retain(|pr| {
                pr.updated_at
                    .as_deref()
                    .and_then(parse_utc)
                    .is_some_and(|at| at >= cutoff)
            });
        }

        apply_pull_requests(&self.outputs, &prs, self.options.allow_empty_batch)
    }

    /// Full issue sync: fetch per repo, title/cutoff filters, snapshot
    /// plus backlog application.
    pub async fn sync_issues(&self) -> Result<SyncReport, SyncError> {
        self.sync_issues_at(Utc::now(), Local::now()).await
    }

    pub async fn sync_issues_at(
        &self,
        now: DateTime<Utc>,
        now_local: DateTime<Local>,
    ) -> Result<SyncReport, SyncError> {
        let cutoff = self.cutoff(now);
        let mut by_repo: BTreeMap<String, Vec<Issue>> = BTreeMap::new();

        for repo in &self.repos {
            let issues = self
                .client
                .list_issues(&self.owner, repo, &self.options.issue_state)
                .await?;
            let kept: Vec<Issue> = issues
                .into_iter()
                .filter(|issue| !self.ignored_titles.iter().any(|t| t == issue.title()))
                .filter(|issue| match cutoff {
                    // Keep records with unparsable timestamps; only a
                    // parsed time older than the cutoff drops out.
                    Some(cutoff) => issue
                        .updated_at
                        .as_deref()
                        .and_then(parse_utc)
                        .is_none_or(|at| at >= cutoff),
                    None => true,
                })
                .collect();
            by_repo.insert(repo.clone(), kept);
        }

        let scope = SnapshotScope {
            owner: self.owner.clone(),
            repos: self.repos.clone(),
            state: self.options.issue_state.clone(),
            days_back: self.options.days_back,
        };
        apply_issues(
            &self.outputs,
            &scope,
            &by_repo,
            now_local,
            self.options.allow_empty_batch,
        )
    }

    fn cutoff(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.options
            .days_back
            .map(|days| now - Duration::days(days))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::fs;

    fn outputs_in(dir: &std::path::Path, with_crm: bool) -> OutputsConfig {
        OutputsConfig {
            personal_backlog: dir.join("BACKLOG.md").display().to_string(),
            crm_backlog: with_crm.then(|| dir.join("CRM.md").display().to_string()),
            issues_snapshot: dir.join("team_issues_summary.md").display().to_string(),
            notes_dir: dir.join("notes").display().to_string(),
        }
    }

    fn pr(json: &str) -> PullRequest {
        serde_json::from_str(json).unwrap()
    }

    fn open_pr(number: u64) -> PullRequest {
        pr(&format!(
            r#"{{"number": {number}, "title": "PR {number}", "body": "desc", "state": "open",
                "html_url": "https://x.test/t/crm/pulls/{number}"}}"#
        ))
    }

    const PERSONAL: &str = "# Wiki\n\n## BACKLOG - Team\n\n## Automation\n";
    const CRM: &str = "# Project Backlog\n";

    #[test]
    fn pull_request_sync_touches_both_documents() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("BACKLOG.md"), PERSONAL).unwrap();
        fs::write(dir.path().join("CRM.md"), CRM).unwrap();

        let outputs = outputs_in(dir.path(), true);
        let report = apply_pull_requests(&outputs, &[open_pr(4)], false).unwrap();

        assert!(report.changed());
        assert_eq!(report.fetched, 1);
        let personal = fs::read_to_string(dir.path().join("BACKLOG.md")).unwrap();
        assert!(personal.contains("#### #4 PR 4"));
        let crm = fs::read_to_string(dir.path().join("CRM.md")).unwrap();
        assert!(crm.contains("#### 1. [In Progress] - PR 4"));

        let summary = report.summary();
        assert!(summary.contains("BACKLOG - Team: inserted=1"));
        assert!(summary.ends_with("sync complete"));
    }

    #[test]
    fn unchanged_rerun_reports_no_changes_and_keeps_mtime_content() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("BACKLOG.md"), PERSONAL).unwrap();
        let outputs = outputs_in(dir.path(), false);

        apply_pull_requests(&outputs, &[open_pr(4)], false).unwrap();
        let after_first = fs::read_to_string(dir.path().join("BACKLOG.md")).unwrap();
        let report = apply_pull_requests(&outputs, &[open_pr(4)], false).unwrap();

        assert!(!report.changed());
        assert!(report.summary().ends_with("sync complete, no changes"));
        let after_second = fs::read_to_string(dir.path().join("BACKLOG.md")).unwrap();
        assert_eq!(after_first, after_second);
    }

    #[test]
    fn empty_batch_against_populated_section_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("BACKLOG.md"), PERSONAL).unwrap();
        let outputs = outputs_in(dir.path(), false);

        apply_pull_requests(&outputs, &[open_pr(4)], false).unwrap();
        let before = fs::read_to_string(dir.path().join("BACKLOG.md")).unwrap();

        let err = apply_pull_requests(&outputs, &[], false).unwrap_err();
        assert!(matches!(err, SyncError::SuspectEmptyBatch { .. }));

        // Document untouched by the refused run.
        let after = fs::read_to_string(dir.path().join("BACKLOG.md")).unwrap();
        assert_eq!(before, after);

        // Explicit override empties the section.
        let report = apply_pull_requests(&outputs, &[], true).unwrap();
        assert!(report.changed());
        let emptied = fs::read_to_string(dir.path().join("BACKLOG.md")).unwrap();
        assert!(!emptied.contains("#### #4"));
    }

    #[test]
    fn missing_personal_backlog_is_a_read_error_for_pr_sync() {
        let dir = tempfile::tempdir().unwrap();
        let outputs = outputs_in(dir.path(), false);
        let err = apply_pull_requests(&outputs, &[open_pr(1)], false).unwrap_err();
        assert!(matches!(err, SyncError::Engine(EngineError::Read { .. })));
    }

    #[test]
    fn issue_sync_writes_snapshot_and_sections() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("BACKLOG.md"), PERSONAL).unwrap();
        fs::write(dir.path().join("CRM.md"), CRM).unwrap();
        let outputs = outputs_in(dir.path(), true);

        let issue: Issue = serde_json::from_str(
            r#"{"number": 6, "title": "Tracked", "state": "open", "body": "details",
                "html_url": "https://x.test/t/crm/issues/6",
                "updated_at": "2026-08-01T00:00:00Z"}"#,
        )
        .unwrap();
        let mut by_repo = BTreeMap::new();
        by_repo.insert("crm".to_string(), vec![issue]);

        let scope = SnapshotScope {
            owner: "team".into(),
            repos: vec!["crm".into()],
            state: "all".into(),
            days_back: Some(3),
        };
        let now = chrono::TimeZone::with_ymd_and_hms(&Local, 2026, 8, 5, 7, 0, 0).unwrap();
        let report = apply_issues(&outputs, &scope, &by_repo, now, false).unwrap();

        assert!(report.changed());
        let snapshot = fs::read_to_string(dir.path().join("team_issues_summary.md")).unwrap();
        assert!(snapshot.contains("# Forgejo Issues Snapshot"));
        assert!(snapshot.contains("- #6 **Tracked**"));

        let personal = fs::read_to_string(dir.path().join("BACKLOG.md")).unwrap();
        assert!(personal.contains("## BACKLOG - Issues"));
        assert!(personal.contains("#### #6 Tracked"));

        let crm = fs::read_to_string(dir.path().join("CRM.md")).unwrap();
        assert!(crm.contains("<!-- AUTO:ISSUES:BEGIN -->"));
        assert!(crm.contains("#### 1. [In Progress] - Tracked"));
    }

    #[test]
    fn sync_options_come_from_config() {
        let mut cfg = Config::default();
        cfg.tracker.pr_state = "open".into();
        cfg.tracker.days_back = Some(7);
        let options = SyncOptions::from_config(&cfg);
        assert_eq!(options.pr_state, "open");
        assert_eq!(options.days_back, Some(7));
        assert!(!options.allow_empty_batch);
    }
}
