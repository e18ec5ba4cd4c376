//! Commit-and-push of changed backlog documents after a webhook sync.
//!
//! Only files that actually appear in `git status --porcelain` are
//! committed; a sync that changed nothing publishes nothing.

use std::path::{Path, PathBuf};
use std::process::Command;

use chrono::{DateTime, Local};
use thiserror::Error;

use backsync_core::GitConfig;

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("git {args}: {output}")]
    Git { args: String, output: String },

    #[error("spawn git: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Publishes backlog changes to a remote branch.
#[derive(Debug, Clone)]
pub struct GitPublisher {
    repo_root: PathBuf,
    remote: String,
    branch: String,
}

impl GitPublisher {
    /// Returns `None` when pushing is disabled.
    pub fn from_config(cfg: &GitConfig) -> Option<Self> {
        if !cfg.push_enabled {
            return None;
        }
        Some(Self {
            repo_root: PathBuf::from(&cfg.repo_root),
            remote: cfg.remote.clone(),
            branch: cfg.branch.clone(),
        })
    }

    /// Commit and push any of `files` with working-tree changes.
    /// Returns whether a commit was made.
    pub fn commit_and_push(
        &self,
        files: &[PathBuf],
        now: DateTime<Local>,
    ) -> Result<bool, PublishError> {
        let status = self.git(&["status", "--porcelain"])?;
        let changed: Vec<String> = files
            .iter()
            .map(|file| self.relative(file))
            .filter(|rel| status.contains(rel.as_str()))
            .collect();
        if changed.is_empty() {
            return Ok(false);
        }

        for rel in &changed {
            self.git(&["add", rel])?;
        }
        let message = format!(
            "chore(backlog): sync from tracker ({})",
            now.format("%Y-%m-%d %H:%M:%S")
        );
        self.git(&["commit", "-m", &message])?;
        self.git(&["push", &self.remote, &self.branch])?;
        Ok(true)
    }

    fn relative(&self, file: &Path) -> String {
        file.strip_prefix(&self.repo_root)
            .unwrap_or(file)
            .display()
            .to_string()
    }

    fn git(&self, args: &[&str]) -> Result<String, PublishError> {
        let output = Command::new("git")
            .args(args)
            .current_dir(&self.repo_root)
            .output()?;
        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));
        if !output.status.success() {
            return Err(PublishError::Git {
                args: args.join(" "),
                output: combined,
            });
        }
        Ok(combined)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
