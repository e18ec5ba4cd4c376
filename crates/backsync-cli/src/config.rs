//! Config file loading and the `config` command.
//!
//! The YAML file shape mirrors the core `Config` sections with every
//! field optional; file values are merged over defaults, then env vars
//! win over the file, then command-line flags win over both.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use backsync_core::{find_config_file, parse_days_back, split_csv, Config};

use crate::args::parse_flags;

// ---------------------------------------------------------------------------
// YAML shape
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ConfigFile {
    tracker: TrackerFile,
    outputs: OutputsFile,
    schedule: ScheduleFile,
    telegram: TelegramFile,
    webhook: WebhookFile,
    git: GitFile,
    logging: LoggingFile,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct TrackerFile {
    base_url: Option<String>,
    token: Option<String>,
    owner: Option<String>,
    repos: Option<Vec<String>>,
    pr_state: Option<String>,
    issue_state: Option<String>,
    days_back: Option<String>,
    ignored_titles: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct OutputsFile {
    personal_backlog: Option<String>,
    crm_backlog: Option<String>,
    issues_snapshot: Option<String>,
    notes_dir: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ScheduleFile {
    briefing_time: Option<String>,
    sync_times: Option<Vec<String>>,
    morning_days_back: Option<i64>,
    default_days_back: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct TelegramFile {
    bot_token: Option<String>,
    chat_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct WebhookFile {
    bind_host: Option<String>,
    bind_port: Option<u16>,
    secret: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct GitFile {
    repo_root: Option<String>,
    remote: Option<String>,
    branch: Option<String>,
    push_enabled: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct LoggingFile {
    level: Option<String>,
    format: Option<String>,
    file: Option<String>,
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Load configuration: defaults ← file ← env. Path expansion runs last;
/// validation is left to the commands that need a live tracker.
pub fn load_config(explicit: Option<&Path>) -> Result<Config, String> {
    let mut cfg = Config::default();

    let path = match explicit {
        Some(path) => Some(path.to_path_buf()),
        None => find_config_file(),
    };
    if let Some(path) = path {
        let raw = fs::read_to_string(&path)
            .map_err(|err| format!("read config {}: {err}", path.display()))?;
        if !raw.trim().is_empty() {
            let file: ConfigFile = serde_yaml::from_str(&raw)
                .map_err(|err| format!("parse config {}: {err}", path.display()))?;
            merge_file(&mut cfg, file);
        }
    }

    cfg.apply_env();
    cfg.expand_paths();
    Ok(cfg)
}

fn merge_file(cfg: &mut Config, file: ConfigFile) {
    let t = file.tracker;
    merge(&mut cfg.tracker.base_url, t.base_url);
    merge(&mut cfg.tracker.token, t.token);
    merge(&mut cfg.tracker.owner, t.owner);
    if let Some(repos) = t.repos {
        cfg.tracker.repos = repos;
    }
    merge(&mut cfg.tracker.pr_state, t.pr_state);
    merge(&mut cfg.tracker.issue_state, t.issue_state);
    if let Some(days) = t.days_back {
        cfg.tracker.days_back = parse_days_back(&days);
    }
    if let Some(titles) = t.ignored_titles {
        cfg.tracker.ignored_titles = titles;
    }

    let o = file.outputs;
    merge(&mut cfg.outputs.personal_backlog, o.personal_backlog);
    if let Some(crm) = o.crm_backlog {
        cfg.outputs.crm_backlog = if crm == "None" { None } else { Some(crm) };
    }
    merge(&mut cfg.outputs.issues_snapshot, o.issues_snapshot);
    merge(&mut cfg.outputs.notes_dir, o.notes_dir);

    let s = file.schedule;
    merge(&mut cfg.schedule.briefing_time, s.briefing_time);
    if let Some(times) = s.sync_times {
        cfg.schedule.sync_times = times;
    }
    if let Some(days) = s.morning_days_back {
        cfg.schedule.morning_days_back = days;
    }
    if let Some(days) = s.default_days_back {
        cfg.schedule.default_days_back = days;
    }

    merge(&mut cfg.telegram.bot_token, file.telegram.bot_token);
    merge(&mut cfg.telegram.chat_id, file.telegram.chat_id);

    merge(&mut cfg.webhook.bind_host, file.webhook.bind_host);
    if let Some(port) = file.webhook.bind_port {
        cfg.webhook.bind_port = port;
    }
    merge(&mut cfg.webhook.secret, file.webhook.secret);

    merge(&mut cfg.git.repo_root, file.git.repo_root);
    merge(&mut cfg.git.remote, file.git.remote);
    merge(&mut cfg.git.branch, file.git.branch);
    if let Some(push) = file.git.push_enabled {
        cfg.git.push_enabled = push;
    }

    merge(&mut cfg.logging.level, file.logging.level);
    merge(&mut cfg.logging.format, file.logging.format);
    merge(&mut cfg.logging.file, file.logging.file);
}

fn merge(target: &mut String, value: Option<String>) {
    if let Some(value) = value {
        *target = value;
    }
}

// ---------------------------------------------------------------------------
// The `config` command
// ---------------------------------------------------------------------------

const DEFAULT_CONFIG_YAML: &str = "\
# backsync configuration
tracker:
  base_url: \"\"          # or FORGEJO_URL
  token: \"\"             # or FORGEJO_TOKEN
  owner: \"\"             # or FORGEJO_OWNER
  repos: []              # or FORGEJO_REPOS=a,b
  pr_state: all
  issue_state: all
  days_back: \"3\"         # \"None\" disables the cutoff
  ignored_titles: []

outputs:
  personal_backlog: BACKLOG.md
  crm_backlog: \"None\"    # path of the categorized backlog, or None
  issues_snapshot: team_issues_summary.md
  notes_dir: notes

schedule:
  briefing_time: \"07:00\"
  sync_times: [\"08:00\", \"11:00\", \"16:00\"]
  morning_days_back: 7
  default_days_back: 1

telegram:
  bot_token: \"\"          # or TELEGRAM_BOT_TOKEN
  chat_id: \"\"            # or TELEGRAM_CHAT_ID

webhook:
  bind_host: 127.0.0.1
  bind_port: 9009
  secret: \"\"             # or WEBHOOK_SECRET

git:
  repo_root: .
  remote: origin
  branch: main
  push_enabled: true

logging:
  level: info
  format: console
  file: \"\"
";

pub fn run(args: &[String]) -> Result<String, String> {
    let Some(sub) = args.first() else {
        return Err("config requires a subcommand: path | init".to_string());
    };

    match sub.as_str() {
        "path" => {
            let path = find_config_file().unwrap_or_else(default_config_path);
            Ok(format!("{}\n", path.display()))
        }
        "init" => {
            let flags = parse_flags("config init", &args[1..], &["--force"])?;
            let path = default_config_path();
            if path.exists() && !flags.contains_key("--force") {
                return Err(format!(
                    "config already exists at {} (use --force to overwrite)",
                    path.display()
                ));
            }
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)
                    .map_err(|err| format!("create {}: {err}", parent.display()))?;
            }
            fs::write(&path, DEFAULT_CONFIG_YAML)
                .map_err(|err| format!("write {}: {err}", path.display()))?;
            Ok(format!("wrote {}\n", path.display()))
        }
        other => Err(format!("unknown config subcommand: {other:?}")),
    }
}

fn default_config_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    Path::new(&home).join(".config/backsync/backsync.yaml")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
