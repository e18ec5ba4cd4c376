//! The daemon loop: scheduled tasks, webhook hosting, notifications.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{Local, Utc};
use tokio::signal::unix::{signal, SignalKind};

use backsync_backlog::briefing::{generate_briefing, BriefingSources};
use backsync_backlog::{SyncOptions, SyncRunner};
use backsync_core::Config;

use crate::bootstrap::{Logger, TICK_INTERVAL};
use crate::notify::Notifier;
use crate::publish::GitPublisher;
use crate::schedule::{build_schedule, ScheduleState, ScheduledTask, TaskKind};
use crate::webhook::{self, WebhookState};

/// The backsync background service.
pub struct Daemon {
    cfg: Config,
    logger: Logger,
    notifier: Option<Notifier>,
}

impl Daemon {
    pub fn new(cfg: Config) -> Result<Self, String> {
        cfg.validate()?;
        let logger = Logger::from_config(&cfg.logging);
        let notifier = Notifier::from_config(&cfg.telegram);
        Ok(Self {
            cfg,
            logger,
            notifier,
        })
    }

    pub fn logger(&self) -> &Logger {
        &self.logger
    }

    /// Run until SIGINT/SIGTERM. Scheduled and webhook-triggered syncs
    /// serialize behind one lock so no two syncs touch a document at
    /// once.
    pub async fn run(&self) -> Result<(), String> {
        let tasks = build_schedule(&self.cfg.schedule)?;
        let mut state = ScheduleState::new();
        let sync_lock = Arc::new(tokio::sync::Mutex::new(()));

        let runner = SyncRunner::new(&self.cfg, SyncOptions::from_config(&self.cfg))
            .map_err(|err| err.to_string())?;
        let webhook_state = Arc::new(WebhookState {
            secret: self.cfg.webhook.secret.clone(),
            runner,
            publisher: GitPublisher::from_config(&self.cfg.git),
            documents: self.publish_candidates(),
            logger: self.logger.clone(),
            sync_lock: sync_lock.clone(),
        });
        let host = self.cfg.webhook.bind_host.clone();
        let port = self.cfg.webhook.bind_port;
        let webhook_logger = self.logger.clone();
        let webhook_task = tokio::spawn(async move {
            if let Err(err) = webhook::serve(webhook_state, host, port).await {
                webhook_logger.error(&err);
            }
        });

        self.logger.info("backsync daemon started");
        self.notify(&self.startup_message(&tasks)).await;

        let mut sigterm =
            signal(SignalKind::terminate()).map_err(|err| format!("install SIGTERM: {err}"))?;
        let mut interval = tokio::time::interval(TICK_INTERVAL);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let now = Local::now();
                    for task in &tasks {
                        if state.should_run(task, now) {
                            self.logger.info(&format!("running scheduled task: {}", task.name));
                            self.run_task(task, &sync_lock).await;
                            state.mark_ran(&task.name, Utc::now());
                        }
                    }
                }
                _ = tokio::signal::ctrl_c() => break,
                _ = sigterm.recv() => break,
            }
        }

        webhook_task.abort();
        self.logger.info("backsync daemon stopped");
        self.notify("🛑 *Backsync daemon stopped*").await;
        Ok(())
    }

    async fn run_task(&self, task: &ScheduledTask, sync_lock: &Arc<tokio::sync::Mutex<()>>) {
        let result = match task.kind {
            TaskKind::Briefing => self.run_briefing().await,
            TaskKind::IssueSync { days_back } => self.run_issue_sync(days_back, sync_lock).await,
        };
        if let Err(err) = result {
            self.logger.error(&format!("task {} failed: {err}", task.name));
            self.notify(&format!("❌ *Task failed: {}*\n\n{err}", task.name))
                .await;
        }
    }

    async fn run_briefing(&self) -> Result<(), String> {
        let snapshot = Path::new(&self.cfg.outputs.issues_snapshot);
        let sources = BriefingSources {
            prs_snapshot: snapshot
                .parent()
                .map_or_else(|| PathBuf::from("team_prs_summary.md"), |dir| dir.join("team_prs_summary.md")),
            issues_snapshot: snapshot.to_path_buf(),
            backlog: PathBuf::from(&self.cfg.outputs.personal_backlog),
            notes_dir: PathBuf::from(&self.cfg.outputs.notes_dir),
        };
        let (path, _) = generate_briefing(&sources, Local::now()).map_err(|err| err.to_string())?;
        self.logger.info(&format!("briefing written: {}", path.display()));

        if let Some(notifier) = &self.notifier {
            if let Err(err) = notifier.send_document(&path, "📄 Daily briefing").await {
                self.logger.warn(&format!("send briefing document: {err}"));
            }
        }
        Ok(())
    }

    async fn run_issue_sync(
        &self,
        days_back: i64,
        sync_lock: &Arc<tokio::sync::Mutex<()>>,
    ) -> Result<(), String> {
        let mut options = SyncOptions::from_config(&self.cfg);
        options.days_back = Some(days_back);
        let runner = SyncRunner::new(&self.cfg, options).map_err(|err| err.to_string())?;

        let _guard = sync_lock.lock().await;
        let report = runner.sync_issues().await.map_err(|err| err.to_string())?;
        self.logger.info(&report.summary());
        self.notify(&format!("📋 *Issue sync*\n\n{}", report.summary()))
            .await;
        Ok(())
    }

    fn publish_candidates(&self) -> Vec<PathBuf> {
        let mut documents = vec![PathBuf::from(&self.cfg.outputs.personal_backlog)];
        if let Some(crm) = &self.cfg.outputs.crm_backlog {
            documents.push(PathBuf::from(crm));
        }
        documents
    }

    fn startup_message(&self, tasks: &[ScheduledTask]) -> String {
        let mut lines = vec![
            "🚀 *Backsync daemon started*".to_string(),
            String::new(),
            format!("Time: {}", Local::now().format("%Y-%m-%d %H:%M")),
            "Schedule:".to_string(),
        ];
        for task in tasks {
            lines.push(format!("• {} at {:02}:{:02}", task.name, task.hour, task.minute));
        }
        lines.join("\n")
    }

    async fn notify(&self, text: &str) {
        if let Some(notifier) = &self.notifier {
            if let Err(err) = notifier.send_message(text).await {
                self.logger.warn(&format!("send notification: {err}"));
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
