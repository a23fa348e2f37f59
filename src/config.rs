// src/config.rs

use std::env;
use dotenvy::dotenv;

/// Default number of attempts returned by the analytics endpoint.
pub const DEFAULT_ATTEMPT_LIMIT: i64 = 100;

/// Hard ceiling on attempts loaded for analytics.
pub const MAX_ATTEMPT_LIMIT: i64 = 500;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub rust_log: String,
    pub bind_addr: String,
    /// Grace period after `durationSec` before `submit` is refused.
    /// `None` leaves the exam duration purely client-tracked.
    pub submit_grace_secs: Option<u64>,
    pub event_buffer: usize,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let database_url = env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://exam.db?mode=rwc".to_string());

        let jwt_secret = env::var("JWT_SECRET")
            .expect("JWT_SECRET must be set");

        let rust_log = env::var("RUST_LOG")
            .unwrap_or_else(|_| "info".to_string());

        let bind_addr = env::var("BIND_ADDR")
            .unwrap_or_else(|_| "0.0.0.0:3000".to_string());

        let submit_grace_secs = env::var("SUBMIT_GRACE_SECS")
            .ok()
            .and_then(|v| v.parse().ok());

        let event_buffer = env::var("EVENT_BUFFER")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(256);

        Self {
            database_url,
            jwt_secret,
            rust_log,
            bind_addr,
            submit_grace_secs,
            event_buffer,
        }
    }
}
