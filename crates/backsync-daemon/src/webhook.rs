//! Webhook receiver for tracker pull-request events.
//!
//! Verifies the shared-secret signature, filters event types, runs
//! exactly one pull-request sync behind the process-wide sync lock, then
//! commits and pushes the changed documents when publishing is enabled.

use std::path::PathBuf;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Local;
use serde_json::{json, Value};
use sha2::{Digest, Sha256};

use backsync_backlog::SyncRunner;

use crate::bootstrap::Logger;
use crate::publish::GitPublisher;

/// Pull-request actions that trigger a sync; everything else is
/// acknowledged and ignored.
const PROCESSED_ACTIONS: [&str; 11] = [
    "opened",
    "edited",
    "reopened",
    "closed",
    "synchronized",
    "assigned",
    "unassigned",
    "labeled",
    "unlabeled",
    "review_requested",
    "review_request_removed",
];

/// Shared state behind the webhook routes.
pub struct WebhookState {
    pub secret: String,
    pub runner: SyncRunner,
    pub publisher: Option<GitPublisher>,
    /// Documents eligible for commit after a changed sync.
    pub documents: Vec<PathBuf>,
    pub logger: Logger,
    /// Single-flight guard shared with the scheduler loop.
    pub sync_lock: Arc<tokio::sync::Mutex<()>>,
}

pub fn build_router(state: Arc<WebhookState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/webhook/forgejo", post(receive_webhook))
        .with_state(state)
}

/// Bind and serve the webhook routes until the task is dropped.
pub async fn serve(state: Arc<WebhookState>, host: String, port: u16) -> Result<(), String> {
    let listener = tokio::net::TcpListener::bind((host.as_str(), port))
        .await
        .map_err(|err| format!("bind webhook {host}:{port}: {err}"))?;
    axum::serve(listener, build_router(state))
        .await
        .map_err(|err| format!("webhook server: {err}"))
}

async fn health() -> Json<Value> {
    Json(json!({ "ok": true }))
}

async fn receive_webhook(
    State(state): State<Arc<WebhookState>>,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, Json<Value>) {
    let signature = header(&headers, "x-gitea-signature")
        .or_else(|| header(&headers, "x-forgejo-signature"));
    let token =
        header(&headers, "x-gitea-token").or_else(|| header(&headers, "x-forgejo-token"));

    if let Err(reason) = authorize_webhook(&state.secret, signature, token, &body) {
        state.logger.warn(&format!("webhook rejected: {reason}"));
        return (StatusCode::UNAUTHORIZED, Json(json!({ "error": reason })));
    }

    let Some(event) =
        header(&headers, "x-gitea-event").or_else(|| header(&headers, "x-forgejo-event"))
    else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "missing event header" })),
        );
    };

    let payload: Value = if body.is_empty() {
        json!({})
    } else {
        match serde_json::from_slice(&body) {
            Ok(payload) => payload,
            Err(_) => {
                return (
                    StatusCode::BAD_REQUEST,
                    Json(json!({ "error": "invalid JSON payload" })),
                )
            }
        }
    };

    let action = payload["action"].as_str();
    if !should_process(event, action) {
        return (
            StatusCode::OK,
            Json(json!({ "ok": true, "ignored": true, "event": event, "action": action })),
        );
    }

    state
        .logger
        .info(&format!("webhook sync: event={event} action={action:?}"));
    let _guard = state.sync_lock.lock().await;

    let report = match state.runner.sync_pull_requests().await {
        Ok(report) => report,
        Err(err) => {
            state.logger.error(&format!("webhook sync failed: {err}"));
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": err.to_string() })),
            );
        }
    };

    if report.changed() {
        if let Some(publisher) = state.publisher.clone() {
            let documents = state.documents.clone();
            let pushed = tokio::task::spawn_blocking(move || {
                publisher.commit_and_push(&documents, Local::now())
            })
            .await;
            match pushed {
                Ok(Ok(_)) => {}
                Ok(Err(err)) => {
                    state.logger.error(&format!("publish failed: {err}"));
                    return (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        Json(json!({ "error": err.to_string() })),
                    );
                }
                Err(err) => {
                    state.logger.error(&format!("publish task failed: {err}"));
                    return (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        Json(json!({ "error": "publish task failed" })),
                    );
                }
            }
        }
    }

    (
        StatusCode::OK,
        Json(json!({
            "ok": true,
            "changed": report.changed(),
            "summary": report.summary(),
        })),
    )
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

// ---------------------------------------------------------------------------
// Authorization
// ---------------------------------------------------------------------------

/// Verify a webhook request against the shared secret.
///
/// Preferred: hex HMAC-SHA256 signature of the raw body. Fallback: a
/// plain token header compared in constant time. An empty secret
/// disables verification entirely.
pub fn authorize_webhook(
    secret: &str,
    signature: Option<&str>,
    token: Option<&str>,
    body: &[u8],
) -> Result<(), &'static str> {
    if secret.trim().is_empty() {
        return Ok(());
    }

    if let Some(signature) = signature {
        let expected = hex::encode(hmac_sha256(secret.as_bytes(), body));
        if constant_time_eq(expected.as_bytes(), signature.trim().as_bytes()) {
            return Ok(());
        }
        return Err("invalid webhook signature");
    }

    if let Some(token) = token {
        if constant_time_eq(token.trim().as_bytes(), secret.as_bytes()) {
            return Ok(());
        }
        return Err("invalid webhook token");
    }

    Err("missing webhook signature or token")
}

/// Only pull-request events with a known action trigger a sync.
pub fn should_process(event: &str, action: Option<&str>) -> bool {
    event == "pull_request" && action.is_some_and(|action| PROCESSED_ACTIONS.contains(&action))
}

fn hmac_sha256(key: &[u8], message: &[u8]) -> [u8; 32] {
    const BLOCK: usize = 64;

    let mut key_block = [0u8; BLOCK];
    if key.len() > BLOCK {
        let digest = Sha256::digest(key);
        key_block[..digest.len()].copy_from_slice(&digest);
    } else {
        key_block[..key.len()].copy_from_slice(key);
    }

    let mut inner = Sha256::new();
    inner.update(key_block.map(|byte| byte ^ 0x36));
    inner.update(message);
    let inner_digest = inner.finalize();

    let mut outer = Sha256::new();
    outer.update(key_block.map(|byte| byte ^ 0x5c));
    outer.update(inner_digest);
    outer.finalize().into()
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hmac_sha256_known_vector() {
        // RFC 4231 test case 2.
        let mac = hmac_sha256(b"Jefe", b"what do ya want for nothing?");
        assert_eq!(
            hex::encode(mac),
            "5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843"
        );
    }

    #[test]
    fn empty_secret_allows_everything() {
        assert!(authorize_webhook("", None, None, b"body").is_ok());
        assert!(authorize_webhook("  ", Some("junk"), None, b"body").is_ok());
    }

    #[test]
    fn valid_signature_is_accepted() {
        let body = br#"{"action": "opened"}"#;
        let signature = hex::encode(hmac_sha256(b"secret", body));
        assert!(authorize_webhook("secret", Some(&signature), None, body).is_ok());
    }

    #[test]
    fn tampered_body_is_rejected() {
        let signature = hex::encode(hmac_sha256(b"secret", b"original"));
        let err = authorize_webhook("secret", Some(&signature), None, b"tampered");
        assert_eq!(err, Err("invalid webhook signature"));
    }

    #[test]
    fn token_fallback_constant_time_compare() {
        assert!(authorize_webhook("secret", None, Some("secret"), b"").is_ok());
        assert!(authorize_webhook("secret", None, Some(" secret "), b"").is_ok());
        assert_eq!(
            authorize_webhook("secret", None, Some("wrong"), b""),
            Err("invalid webhook token")
        );
    }

    #[test]
    fn missing_credentials_with_secret_are_rejected() {
        assert_eq!(
            authorize_webhook("secret", None, None, b""),
            Err("missing webhook signature or token")
        );
    }

    #[test]
    fn signature_wins_over_token() {
        // A bad signature rejects even when the token would match.
        let err = authorize_webhook("secret", Some("deadbeef"), Some("secret"), b"body");
        assert_eq!(err, Err("invalid webhook signature"));
    }

    #[test]
    fn event_and_action_filtering() {
        assert!(should_process("pull_request", Some("opened")));
        assert!(should_process("pull_request", Some("labeled")));
        assert!(!should_process("pull_request", Some("milestoned")));
        assert!(!should_process("pull_request", None));
        assert!(!should_process("push", Some("opened")));
        assert!(!should_process("issues", Some("opened")));
    }

    #[test]
    fn constant_time_eq_basics() {
        assert!(constant_time_eq(b"abc", b"abc"));
        assert!(!constant_time_eq(b"abc", b"abd"));
        assert!(!constant_time_eq(b"abc", b"abcd"));
        assert!(constant_time_eq(b"", b""));
    }
}
