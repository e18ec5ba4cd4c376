//! Task scheduling: fixed times of day with explicit last-run state.
//!
//! A task fires when the local clock is within one minute of its
//! scheduled time and it has not run within the past hour; the state
//! holding last-run times is an explicit struct owned by the daemon loop,
//! not process-global.

use std::collections::HashMap;

use chrono::{DateTime, Local, Utc};

use backsync_core::{parse_time_of_day, ScheduleConfig};

const RUN_WINDOW_MINUTES: i64 = 1;
const MIN_GAP_SECONDS: i64 = 3600;

/// What a scheduled slot does when it fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskKind {
    Briefing,
    IssueSync { days_back: i64 },
}

/// One scheduled slot.
#[derive(Debug, Clone)]
pub struct ScheduledTask {
    pub name: String,
    pub hour: u8,
    pub minute: u8,
    pub kind: TaskKind,
}

/// Build the task list from config. The first sync of the day looks
/// further back than the rest.
pub fn build_schedule(cfg: &ScheduleConfig) -> Result<Vec<ScheduledTask>, String> {
    let mut tasks = Vec::new();

    let (hour, minute) = parse_time_of_day(&cfg.briefing_time)?;
    tasks.push(ScheduledTask {
        name: "daily_briefing".to_string(),
        hour,
        minute,
        kind: TaskKind::Briefing,
    });

    for (i, at) in cfg.sync_times.iter().enumerate() {
        let (hour, minute) = parse_time_of_day(at)?;
        let days_back = if i == 0 {
            cfg.morning_days_back
        } else {
            cfg.default_days_back
        };
        tasks.push(ScheduledTask {
            name: format!("issue_sync_{hour:02}{minute:02}"),
            hour,
            minute,
            kind: TaskKind::IssueSync { days_back },
        });
    }

    Ok(tasks)
}

/// Last-run bookkeeping for the daemon loop.
#[derive(Debug, Clone, Default)]
pub struct ScheduleState {
    last_run: HashMap<String, DateTime<Utc>>,
}

impl ScheduleState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `task` should fire at `now`.
    pub fn should_run(&self, task: &ScheduledTask, now: DateTime<Local>) -> bool {
        let time = now.time();
        let current_minutes =
            i64::from(chrono::Timelike::hour(&time)) * 60 + i64::from(chrono::Timelike::minute(&time));
        let scheduled_minutes = i64::from(task.hour) * 60 + i64::from(task.minute);
        if (current_minutes - scheduled_minutes).abs() > RUN_WINDOW_MINUTES {
            return false;
        }

        match self.last_run.get(&task.name) {
            Some(last) => {
                let elapsed = now.with_timezone(&Utc).signed_duration_since(*last);
                elapsed.num_seconds() >= MIN_GAP_SECONDS
            }
            None => true,
        }
    }

    pub fn mark_ran(&mut self, name: &str, now: DateTime<Utc>) {
        self.last_run.insert(name.to_string(), now);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
