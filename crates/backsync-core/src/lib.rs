//! Core configuration types for the backsync system.

pub mod config;

pub use config::{
    expand_tilde, find_config_file, parse_days_back, parse_time_of_day, split_csv, Config,
    GitConfig, LoggingConfig, OutputsConfig, ScheduleConfig, TelegramConfig, TrackerConfig,
    WebhookConfig,
};
