//! Configuration types for the backsync system.
//!
//! Root configuration struct and nested section types with full defaults,
//! validation, environment variable overrides, and tilde path expansion.
//! YAML file loading lives in the CLI crate so this crate stays
//! dependency-free.

use std::env;
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// Root config
// ---------------------------------------------------------------------------

/// Root configuration for the backsync system.
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub tracker: TrackerConfig,
    pub outputs: OutputsConfig,
    pub schedule: ScheduleConfig,
    pub telegram: TelegramConfig,
    pub webhook: WebhookConfig,
    pub git: GitConfig,
    pub logging: LoggingConfig,
}

impl Config {
    /// Validates the entire configuration, returning an error message on failure.
    pub fn validate(&self) -> Result<(), String> {
        // Tracker
        if self.tracker.base_url.trim().is_empty() {
            return Err("tracker.base_url is required (or set FORGEJO_URL)".into());
        }
        if self.tracker.token.trim().is_empty() {
            return Err("tracker.token is required (or set FORGEJO_TOKEN)".into());
        }
        if self.tracker.owner.trim().is_empty() {
            return Err("tracker.owner is required (or set FORGEJO_OWNER)".into());
        }
        if self.tracker.repos.is_empty() {
            return Err("tracker.repos must list at least one repository".into());
        }
        match self.tracker.pr_state.as_str() {
            "open" | "closed" | "all" => {}
            _ => return Err("tracker.pr_state must be one of open, closed, all".into()),
        }
        match self.tracker.issue_state.as_str() {
            "open" | "closed" | "all" => {}
            _ => return Err("tracker.issue_state must be one of open, closed, all".into()),
        }
        if let Some(days) = self.tracker.days_back {
            if days < 0 {
                return Err("tracker.days_back must be zero or greater".into());
            }
        }

        // Outputs
        if self.outputs.personal_backlog.trim().is_empty() {
            return Err("outputs.personal_backlog is required".into());
        }

        // Schedule
        parse_time_of_day(&self.schedule.briefing_time)
            .map_err(|err| format!("schedule.briefing_time: {err}"))?;
        for (i, at) in self.schedule.sync_times.iter().enumerate() {
            parse_time_of_day(at).map_err(|err| format!("schedule.sync_times[{i}]: {err}"))?;
        }
        if self.schedule.morning_days_back < 1 {
            return Err("schedule.morning_days_back must be at least 1".into());
        }
        if self.schedule.default_days_back < 1 {
            return Err("schedule.default_days_back must be at least 1".into());
        }

        // Webhook
        if self.webhook.bind_host.trim().is_empty() {
            return Err("webhook.bind_host is required".into());
        }
        if self.webhook.bind_port == 0 {
            return Err("webhook.bind_port must be greater than 0".into());
        }

        // Git
        if self.git.remote.trim().is_empty() {
            return Err("git.remote is required".into());
        }
        if self.git.branch.trim().is_empty() {
            return Err("git.branch is required".into());
        }

        // Logging
        match self.logging.level.to_lowercase().trim() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => return Err("logging.level must be one of trace, debug, info, warn, error".into()),
        }
        match self.logging.format.to_lowercase().trim() {
            "console" | "json" => {}
            _ => return Err("logging.format must be one of console, json".into()),
        }

        Ok(())
    }

    /// Expands `~` to home directory in all path-related config fields.
    pub fn expand_paths(&mut self) {
        self.outputs.personal_backlog = expand_tilde(&self.outputs.personal_backlog);
        if let Some(crm) = &self.outputs.crm_backlog {
            self.outputs.crm_backlog = Some(expand_tilde(crm));
        }
        self.outputs.issues_snapshot = expand_tilde(&self.outputs.issues_snapshot);
        self.outputs.notes_dir = expand_tilde(&self.outputs.notes_dir);
        self.git.repo_root = expand_tilde(&self.git.repo_root);
        self.logging.file = expand_tilde(&self.logging.file);
    }

    /// Applies environment variable overrides onto the current values.
    ///
    /// Env vars win over file values; CLI flags are applied by the caller
    /// after this and win over both.
    pub fn apply_env(&mut self) {
        if let Some(v) = non_empty_env("FORGEJO_URL") {
            self.tracker.base_url = v;
        }
        if let Some(v) = non_empty_env("FORGEJO_TOKEN") {
            self.tracker.token = v;
        }
        if let Some(v) = non_empty_env("FORGEJO_OWNER") {
            self.tracker.owner = v;
        }
        if let Some(v) = non_empty_env("FORGEJO_REPOS") {
            self.tracker.repos = split_csv(&v);
        }
        if let Some(v) = non_empty_env("PR_STATE") {
            self.tracker.pr_state = v;
        }
        if let Some(v) = non_empty_env("ISSUE_STATE") {
            self.tracker.issue_state = v;
        }
        if let Some(v) = non_empty_env("DAYS_BACK") {
            self.tracker.days_back = parse_days_back(&v);
        }
        if let Some(v) = non_empty_env("BACKLOG_FILE") {
            self.outputs.personal_backlog = v;
        }
        if let Some(v) = non_empty_env("CRM_BACKLOG_FILE") {
            self.outputs.crm_backlog = if v == "None" { None } else { Some(v) };
        }
        if let Some(v) = non_empty_env("OUTPUT_ISSUES_FILE") {
            self.outputs.issues_snapshot = v;
        }
        if let Some(v) = non_empty_env("TELEGRAM_BOT_TOKEN") {
            self.telegram.bot_token = v;
        }
        if let Some(v) = non_empty_env("TELEGRAM_CHAT_ID") {
            self.telegram.chat_id = v;
        }
        if let Some(v) = non_empty_env("WEBHOOK_SECRET") {
            self.webhook.secret = v;
        }
        if let Some(v) = non_empty_env("GIT_REMOTE") {
            self.git.remote = v;
        }
        if let Some(v) = non_empty_env("GIT_BRANCH") {
            self.git.branch = v;
        }
    }
}

// ---------------------------------------------------------------------------
// Section configs
// ---------------------------------------------------------------------------

/// Forgejo (Gitea-compatible) tracker connection and fetch scope.
#[derive(Debug, Clone)]
pub struct TrackerConfig {
    pub base_url: String,
    pub token: String,
    pub owner: String,
    pub repos: Vec<String>,
    pub pr_state: String,
    pub issue_state: String,
    /// Only include records updated within this many days; `None` keeps all.
    pub days_back: Option<i64>,
    /// Issue titles to skip entirely (internal tracking/meta tasks).
    pub ignored_titles: Vec<String>,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            token: String::new(),
            owner: String::new(),
            repos: Vec::new(),
            pr_state: "all".into(),
            issue_state: "all".into(),
            days_back: Some(3),
            ignored_titles: Vec::new(),
        }
    }
}

/// Target document paths.
#[derive(Debug, Clone)]
pub struct OutputsConfig {
    /// Personal wiki backlog (Team + Issues sections).
    pub personal_backlog: String,
    /// Categorized project backlog; `None` disables that output.
    pub crm_backlog: Option<String>,
    /// Issues snapshot markdown file (rewritten whole each run).
    pub issues_snapshot: String,
    /// Notes root for daily briefings and inbox scanning.
    pub notes_dir: String,
}

impl Default for OutputsConfig {
    fn default() -> Self {
        Self {
            personal_backlog: "BACKLOG.md".into(),
            crm_backlog: None,
            issues_snapshot: "team_issues_summary.md".into(),
            notes_dir: "notes".into(),
        }
    }
}

/// Daemon task schedule, times of day in local `HH:MM`.
#[derive(Debug, Clone)]
pub struct ScheduleConfig {
    pub briefing_time: String,
    pub sync_times: Vec<String>,
    /// Look-back window for the first (morning) sync of the day.
    pub morning_days_back: i64,
    /// Look-back window for every other sync.
    pub default_days_back: i64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            briefing_time: "07:00".into(),
            sync_times: vec!["08:00".into(), "11:00".into(), "16:00".into()],
            morning_days_back: 7,
            default_days_back: 1,
        }
    }
}

/// Telegram notification settings. Empty token disables notifications.
#[derive(Debug, Clone, Default)]
pub struct TelegramConfig {
    pub bot_token: String,
    pub chat_id: String,
}

impl TelegramConfig {
    pub fn enabled(&self) -> bool {
        !self.bot_token.trim().is_empty() && !self.chat_id.trim().is_empty()
    }
}

/// Webhook receiver settings. Empty secret disables signature checks.
#[derive(Debug, Clone)]
pub struct WebhookConfig {
    pub bind_host: String,
    pub bind_port: u16,
    pub secret: String,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            bind_host: "127.0.0.1".into(),
            bind_port: 9009,
            secret: String::new(),
        }
    }
}

/// Commit-and-push settings for webhook-triggered syncs.
#[derive(Debug, Clone)]
pub struct GitConfig {
    /// Working tree containing the backlog documents.
    pub repo_root: String,
    pub remote: String,
    pub branch: String,
    /// Whether the webhook commits and pushes after a changed sync.
    pub push_enabled: bool,
}

impl Default for GitConfig {
    fn default() -> Self {
        Self {
            repo_root: ".".into(),
            remote: "origin".into(),
            branch: "main".into(),
            push_enabled: true,
        }
    }
}

/// Logging configuration section.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
    pub file: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "console".into(),
            file: String::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Parse `HH:MM` into `(hour, minute)`.
pub fn parse_time_of_day(value: &str) -> Result<(u8, u8), String> {
    let trimmed = value.trim();
    let (h, m) = trimmed
        .split_once(':')
        .ok_or_else(|| format!("expected HH:MM, got {trimmed:?}"))?;
    let hour: u8 = h
        .parse()
        .map_err(|_| format!("expected HH:MM, got {trimmed:?}"))?;
    let minute: u8 = m
        .parse()
        .map_err(|_| format!("expected HH:MM, got {trimmed:?}"))?;
    if hour > 23 || minute > 59 {
        return Err(format!("time of day out of range: {trimmed:?}"));
    }
    Ok((hour, minute))
}

/// Split a comma-separated list, dropping empty items.
pub fn split_csv(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

/// Parse a days-back value; `None`/empty disables the cutoff.
pub fn parse_days_back(value: &str) -> Option<i64> {
    let trimmed = value.trim();
    if trimmed.is_empty() || trimmed == "None" {
        return None;
    }
    trimmed.parse().ok()
}

fn non_empty_env(key: &str) -> Option<String> {
    match env::var(key) {
        Ok(value) if !value.trim().is_empty() => Some(value.trim().to_string()),
        _ => None,
    }
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &str) -> String {
    if path.is_empty() {
        return path.to_string();
    }
    if path == "~" {
        return home_dir().display().to_string();
    }
    if let Some(rest) = path.strip_prefix("~/") {
        return home_dir().join(rest).display().to_string();
    }
    path.to_string()
}

/// Search for a configuration file in the standard locations.
/// Returns `None` if no config file is found.
pub fn find_config_file() -> Option<PathBuf> {
    for dir in config_search_paths() {
        let candidate = dir.join("backsync.yaml");
        if candidate.is_file() {
            return Some(candidate);
        }
    }
    None
}

fn config_search_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    if let Ok(xdg) = env::var("XDG_CONFIG_HOME") {
        paths.push(Path::new(&xdg).join("backsync"));
    }

    let home = home_dir();
    if home.as_os_str() != "" {
        paths.push(home.join(".config/backsync"));
    }

    paths.push(PathBuf::from("."));

    paths
}

/// Get the user's home directory, falling back to `/` on failure.
fn home_dir() -> PathBuf {
    #[allow(deprecated)]
    env::home_dir().unwrap_or_else(|| PathBuf::from("/"))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
