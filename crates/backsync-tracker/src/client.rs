//! Minimal Forgejo API client for pull requests and issues.
//!
//! Every listing drains pagination completely before returning: the
//! reconciler treats absence as deletion, so a partially-paged result must
//! never reach it.

use std::time::Duration;

use serde::de::DeserializeOwned;

use crate::error::TrackerError;
use crate::record::{Issue, PullRequest};

const PAGE_LIMIT: usize = 100;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Forgejo (Gitea-compatible) API client scoped to one host + token.
#[derive(Debug, Clone)]
pub struct TrackerClient {
    base_url: String,
    token: String,
    http: reqwest::Client,
}

impl TrackerClient {
    pub fn new(base_url: &str, token: &str) -> Result<Self, TrackerError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
            http,
        })
    }

    /// List pull requests for `owner/repo`, newest updates first, all
    /// pages drained.
    pub async fn list_pull_requests(
        &self,
        owner: &str,
        repo: &str,
        state: &str,
    ) -> Result<Vec<PullRequest>, TrackerError> {
        let url = format!("{}/api/v1/repos/{owner}/{repo}/pulls", self.base_url);
        self.drain_pages(&url, &[("state", state), ("sort", "recentupdate")])
            .await
    }

    /// List issues for `owner/repo`, excluding pull requests, all pages
    /// drained.
    pub async fn list_issues(
        &self,
        owner: &str,
        repo: &str,
        state: &str,
    ) -> Result<Vec<Issue>, TrackerError> {
        let url = format!("{}/api/v1/repos/{owner}/{repo}/issues", self.base_url);
        let issues: Vec<Issue> = self
            .drain_pages(
                &url,
                &[
                    ("state", state),
                    ("type", "issues"),
                    ("sort", "updated"),
                    ("direction", "desc"),
                ],
            )
            .await?;
        // Belt and braces: some servers ignore the type filter.
        Ok(issues
            .into_iter()
            .filter(|issue| !issue.is_pull_request())
            .collect())
    }

    async fn drain_pages<T: DeserializeOwned>(
        &self,
        url: &str,
        params: &[(&str, &str)],
    ) -> Result<Vec<T>, TrackerError> {
        let mut out: Vec<T> = Vec::new();
        let mut page = 1usize;

        loop {
            let limit = PAGE_LIMIT.to_string();
            let page_param = page.to_string();
            let response = self
                .http
                .get(url)
                .header("Authorization", format!("token {}", self.token))
                .query(params)
                .query(&[("limit", limit.as_str()), ("page", page_param.as_str())])
                .send()
                .await?;

            let status = response.status();
            if !status.is_success() {
                return Err(TrackerError::Status {
                    status: status.as_u16(),
                    url: url.to_string(),
                });
            }

            let batch: Vec<T> = response.json().await?;
            let len = batch.len();
            out.extend(batch);
            if len < PAGE_LIMIT {
                break;
            }
            page += 1;
        }

        Ok(out)
    }
}
