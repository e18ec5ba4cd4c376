//! Telegram notification sender.
//!
//! No retry contract: callers log failures and continue, a missed
//! notification never fails a sync.

use std::path::Path;
use std::time::Duration;

use thiserror::Error;

use backsync_core::TelegramConfig;

const MESSAGE_TIMEOUT: Duration = Duration::from_secs(10);
const DOCUMENT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("telegram request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("telegram returned HTTP {status}")]
    Status { status: u16 },

    #[error("read document {path}: {source}")]
    Document {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Telegram bot client bound to one chat.
#[derive(Debug, Clone)]
pub struct Notifier {
    base_url: String,
    chat_id: String,
    http: reqwest::Client,
}

impl Notifier {
    /// Returns `None` when notifications are not configured.
    pub fn from_config(cfg: &TelegramConfig) -> Option<Self> {
        if !cfg.enabled() {
            return None;
        }
        let http = reqwest::Client::builder().build().ok()?;
        Some(Self {
            base_url: format!("https://api.telegram.org/bot{}", cfg.bot_token.trim()),
            chat_id: cfg.chat_id.trim().to_string(),
            http,
        })
    }

    /// Send a Markdown-formatted text message.
    pub async fn send_message(&self, text: &str) -> Result<(), NotifyError> {
        let url = format!("{}/sendMessage", self.base_url);
        let response = self
            .http
            .post(&url)
            .timeout(MESSAGE_TIMEOUT)
            .json(&serde_json::json!({
                "chat_id": self.chat_id,
                "text": text,
                "parse_mode": "Markdown",
            }))
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(NotifyError::Status {
                status: status.as_u16(),
            });
        }
        Ok(())
    }

    /// Upload a file with a caption.
    pub async fn send_document(&self, path: &Path, caption: &str) -> Result<(), NotifyError> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|source| NotifyError::Document {
                path: path.display().to_string(),
                source,
            })?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document.md".to_string());

        let form = reqwest::multipart::Form::new()
            .text("chat_id", self.chat_id.clone())
            .text("caption", caption.to_string())
            .part(
                "document",
                reqwest::multipart::Part::bytes(bytes).file_name(file_name),
            );

        let url = format!("{}/sendDocument", self.base_url);
        let response = self
            .http
            .post(&url)
            .timeout(DOCUMENT_TIMEOUT)
            .multipart(form)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(NotifyError::Status {
                status: status.as_u16(),
            });
        }
        Ok(())
    }
}
