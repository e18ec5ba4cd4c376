//! Record models for tracker API payloads.
//!
//! Fields mirror the Forgejo REST shapes but stay tolerant: anything the
//! renderers do not strictly need is optional and defaults cleanly, so a
//! sparse or slightly off payload never aborts a sync.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Deserialize;

/// A tracker user reference.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct Account {
    #[serde(default)]
    pub login: String,
    #[serde(default)]
    pub full_name: String,
}

impl Account {
    fn display(&self) -> String {
        let login = if self.login.is_empty() {
            "unknown"
        } else {
            &self.login
        };
        let name = self.full_name.trim();
        if name.is_empty() || name == login {
            format!("@{login}")
        } else {
            format!("@{login} ({name})")
        }
    }
}

/// A tracker label reference.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct Label {
    #[serde(default)]
    pub name: String,
}

/// One pull request as returned by the tracker API.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PullRequest {
    #[serde(default)]
    pub number: i64,
    pub title: Option<String>,
    pub body: Option<String>,
    pub state: Option<String>,
    #[serde(default)]
    pub merged: bool,
    pub merged_at: Option<String>,
    pub updated_at: Option<String>,
    pub html_url: Option<String>,
    #[serde(default)]
    pub labels: Vec<Label>,
    pub assignees: Option<Vec<Account>>,
    pub assignee: Option<Account>,
}

impl PullRequest {
    /// Stable external ID; positive record numbers only.
    pub fn id(&self) -> Option<u64> {
        u64::try_from(self.number).ok().filter(|id| *id > 0)
    }

    pub fn title(&self) -> &str {
        self.title.as_deref().unwrap_or("").trim()
    }

    pub fn state(&self) -> &str {
        self.state.as_deref().unwrap_or("")
    }

    pub fn is_open(&self) -> bool {
        self.state() == "open"
    }

    /// Merged flag or a non-empty merge timestamp.
    pub fn is_merged(&self) -> bool {
        self.merged
            || self
                .merged_at
                .as_deref()
                .is_some_and(|at| !at.trim().is_empty())
    }

    pub fn has_description(&self) -> bool {
        self.body.as_deref().is_some_and(|body| !body.trim().is_empty())
    }

    /// First non-blank line of the description.
    pub fn first_description_line(&self) -> String {
        first_line(self.body.as_deref().unwrap_or(""))
    }

    pub fn html_url(&self) -> &str {
        self.html_url.as_deref().unwrap_or("")
    }

    pub fn label_names(&self) -> Vec<String> {
        label_names(&self.labels)
    }

    /// `@login (Full Name)` list, falling back to the single assignee
    /// field and then `(unassigned)`.
    pub fn assignee_line(&self) -> String {
        if let Some(assignees) = &self.assignees {
            if !assignees.is_empty() {
                return assignees
                    .iter()
                    .map(Account::display)
                    .collect::<Vec<_>>()
                    .join(", ");
            }
        }
        if let Some(assignee) = &self.assignee {
            return assignee.display();
        }
        "(unassigned)".to_string()
    }

    /// Merge date as `YYYY-MM-DD`, when merged.
    pub fn merged_date(&self) -> Option<String> {
        self.merged_at
            .as_deref()
            .filter(|at| !at.trim().is_empty())
            .map(date_part)
    }

    /// Update time as unix seconds, zero when absent or unparsable.
    pub fn updated_timestamp(&self) -> i64 {
        self.updated_at.as_deref().map_or(0, timestamp)
    }
}

/// One issue as returned by the tracker API.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Issue {
    #[serde(default)]
    pub number: i64,
    pub title: Option<String>,
    pub body: Option<String>,
    pub state: Option<String>,
    pub html_url: Option<String>,
    pub updated_at: Option<String>,
    pub created_at: Option<String>,
    pub closed_at: Option<String>,
    pub user: Option<Account>,
    #[serde(default)]
    pub labels: Vec<Label>,
    pub assignees: Option<Vec<Account>>,
    /// Present when the "issue" is actually a pull request; used as a
    /// guard in case the server ignores the `type` filter.
    pub pull_request: Option<serde_json::Value>,
}

impl Issue {
    pub fn id(&self) -> Option<u64> {
        u64::try_from(self.number).ok().filter(|id| *id > 0)
    }

    pub fn title(&self) -> &str {
        self.title.as_deref().unwrap_or("").trim()
    }

    pub fn state(&self) -> &str {
        self.state.as_deref().unwrap_or("")
    }

    pub fn is_open(&self) -> bool {
        self.state() == "open"
    }

    pub fn is_pull_request(&self) -> bool {
        self.pull_request.is_some()
    }

    pub fn html_url(&self) -> &str {
        self.html_url.as_deref().unwrap_or("")
    }

    pub fn author_login(&self) -> &str {
        self.user.as_ref().map_or("", |user| user.login.as_str())
    }

    pub fn label_names(&self) -> Vec<String> {
        label_names(&self.labels)
    }

    pub fn assignee_logins(&self) -> Vec<String> {
        self.assignees
            .as_deref()
            .unwrap_or(&[])
            .iter()
            .filter(|account| !account.login.trim().is_empty())
            .map(|account| account.login.trim().to_string())
            .collect()
    }

    /// `@a, @b` list or `(unassigned)`.
    pub fn assignee_line(&self) -> String {
        let logins = self.assignee_logins();
        if logins.is_empty() {
            "(unassigned)".to_string()
        } else {
            logins
                .iter()
                .map(|login| format!("@{login}"))
                .collect::<Vec<_>>()
                .join(", ")
        }
    }

    /// Body with image-only markdown lines removed and surrounding blank
    /// lines trimmed. Lines starting with `![` after trim are images.
    pub fn body_without_images(&self) -> String {
        let body = self.body.as_deref().unwrap_or("").trim();
        if body.is_empty() {
            return String::new();
        }
        let kept: Vec<&str> = body
            .lines()
            .map(str::trim_end)
            .filter(|line| !line.trim_start().starts_with("!["))
            .collect();
        kept.join("\n").trim_matches('\n').trim_end().to_string()
    }

    pub fn updated_date(&self) -> Option<String> {
        self.updated_at
            .as_deref()
            .filter(|at| !at.trim().is_empty())
            .map(date_part)
    }

    /// Close date, falling back to the update date.
    pub fn closed_date(&self) -> Option<String> {
        self.closed_at
            .as_deref()
            .filter(|at| !at.trim().is_empty())
            .map(date_part)
            .or_else(|| self.updated_date())
    }

    pub fn updated_timestamp(&self) -> i64 {
        self.updated_at.as_deref().map_or(0, timestamp)
    }
}

// ---------------------------------------------------------------------------
// Timestamp helpers
// ---------------------------------------------------------------------------

/// Parse a tracker timestamp (`2026-02-11T03:41:08Z` or RFC 3339).
pub fn parse_utc(value: &str) -> Option<DateTime<Utc>> {
    let trimmed = value.trim();
    if let Some(naive) = trimmed
        .strip_suffix('Z')
        .and_then(|raw| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S").ok())
    {
        return Some(naive.and_utc());
    }
    DateTime::parse_from_rfc3339(trimmed)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// `YYYY-MM-DD` of a tracker timestamp, first ten characters as fallback.
pub fn date_part(value: &str) -> String {
    match parse_utc(value) {
        Some(dt) => dt.format("%Y-%m-%d").to_string(),
        None => value.trim().chars().take(10).collect(),
    }
}

/// Unix seconds of a tracker timestamp, zero when unparsable.
pub fn timestamp(value: &str) -> i64 {
    parse_utc(value).map_or(0, |dt| dt.timestamp())
}

fn first_line(body: &str) -> String {
    body.lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or("")
        .to_string()
}

fn label_names(labels: &[Label]) -> Vec<String> {
    labels
        .iter()
        .filter(|label| !label.name.trim().is_empty())
        .map(|label| label.name.trim().to_string())
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn pr_json(body: &str) -> PullRequest {
        serde_json::from_str(body).unwrap()
    }

    #[test]
    fn sparse_payload_deserializes_with_defaults() {
        let pr = pr_json(r#"{"number": 7}"#);
        assert_eq!(pr.id(), Some(7));
        assert_eq!(pr.title(), "");
        assert!(!pr.is_merged());
        assert!(!pr.has_description());
        assert_eq!(pr.assignee_line(), "(unassigned)");
    }

    #[test]
    fn null_body_and_title_are_tolerated() {
        let pr = pr_json(r#"{"number": 3, "title": null, "body": null}"#);
        assert_eq!(pr.title(), "");
        assert!(!pr.has_description());
    }

    #[test]
    fn merged_from_flag_or_timestamp() {
        let by_flag = pr_json(r#"{"number": 1, "merged": true}"#);
        assert!(by_flag.is_merged());
        let by_ts = pr_json(r#"{"number": 2, "merged_at": "2026-07-20T10:00:00Z"}"#);
        assert!(by_ts.is_merged());
        assert_eq!(by_ts.merged_date().as_deref(), Some("2026-07-20"));
    }

    #[test]
    fn nonpositive_numbers_have_no_id() {
        assert_eq!(pr_json(r#"{"number": 0}"#).id(), None);
        assert_eq!(pr_json(r#"{"number": -4}"#).id(), None);
    }

    #[test]
    fn assignee_line_prefers_list_then_single() {
        let pr = pr_json(
            r#"{"number": 1,
                "assignees": [{"login": "dan", "full_name": "Dan N"}, {"login": "kim"}],
                "assignee": {"login": "ignored"}}"#,
        );
        assert_eq!(pr.assignee_line(), "@dan (Dan N), @kim");

        let single = pr_json(r#"{"number": 1, "assignee": {"login": "solo"}}"#);
        assert_eq!(single.assignee_line(), "@solo");
    }

    #[test]
    fn first_description_line_skips_blanks() {
        let pr = pr_json(r#"{"number": 1, "body": "\n\n  summary line  \nrest"}"#);
        assert_eq!(pr.first_description_line(), "summary line");
    }

    #[test]
    fn issue_body_without_images_drops_image_lines() {
        let issue: Issue = serde_json::from_str(
            r#"{"number": 2, "body": "first\n![shot](http://x/i.png)\n\nsecond\n  ![other](y)"}"#,
        )
        .unwrap();
        assert_eq!(issue.body_without_images(), "first\n\nsecond");
    }

    #[test]
    fn issue_pull_request_guard() {
        let issue: Issue =
            serde_json::from_str(r#"{"number": 2, "pull_request": {"merged": false}}"#).unwrap();
        assert!(issue.is_pull_request());
        let plain: Issue = serde_json::from_str(r#"{"number": 2}"#).unwrap();
        assert!(!plain.is_pull_request());
    }

    #[test]
    fn closed_date_falls_back_to_updated() {
        let issue: Issue = serde_json::from_str(
            r#"{"number": 2, "state": "closed", "updated_at": "2026-06-01T00:00:00Z"}"#,
        )
        .unwrap();
        assert_eq!(issue.closed_date().as_deref(), Some("2026-06-01"));
    }

    #[test]
    fn timestamp_parsing_variants() {
        assert!(parse_utc("2026-02-11T03:41:08Z").is_some());
        assert!(parse_utc("2026-02-11T03:41:08+02:00").is_some());
        assert!(parse_utc("not a time").is_none());
        assert_eq!(date_part("2026-02-11T03:41:08Z"), "2026-02-11");
        assert_eq!(date_part("garbage-but-long-enough"), "garbage-bu");
        assert_eq!(timestamp("bad"), 0);
        assert!(timestamp("2026-02-11T03:41:08Z") > 0);
    }
}
