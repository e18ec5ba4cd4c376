//! Forgejo (Gitea-compatible) record source and record models.
//!
//! Produces complete, fully-drained record lists for a given scope before
//! the sync engine ever runs, plus the rule-based/LLM classifier used by
//! briefings.

pub mod classify;
pub mod client;
pub mod error;
pub mod record;

pub use classify::{
    detect_duplicate, rule_based, similarity, Category, Classification, Classifier, Priority,
    Provider,
};
pub use client::TrackerClient;
pub use error::TrackerError;
pub use record::{date_part, parse_utc, timestamp, Account, Issue, Label, PullRequest};
