//! Background service for scheduled backlog syncs.
//!
//! Runs the daily briefing and issue syncs at configured times of day,
//! hosts the tracker webhook receiver, and pushes results through the
//! Telegram notifier. Scheduled and webhook-triggered syncs share one
//! single-flight lock per process so two syncs never race on the same
//! document.

pub mod bootstrap;
pub mod notify;
pub mod pidfile;
pub mod publish;
pub mod runtime;
pub mod schedule;
pub mod webhook;

pub use bootstrap::{LogFormat, LogLevel, Logger};
pub use pidfile::PidFile;
pub use runtime::Daemon;
