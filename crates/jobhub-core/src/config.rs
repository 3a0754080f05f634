//! Configuration module
//!
//! Environment-driven configuration for the dispatch engine: database
//! connection settings, queue polling and retry knobs, and SMTP transport
//! settings for the mailer.

use std::env;

// Common constants
const MAX_CONNECTIONS: u32 = 20;
const CONNECTION_TIMEOUT_SECS: u64 = 30;
const QUEUE_POLL_INTERVAL_MS: u64 = 5000;
const QUEUE_MAX_ATTEMPTS: u32 = 3;
const QUEUE_RETRY_INITIAL_DELAY_MS: u64 = 1000;
const SMTP_PORT: u16 = 587;

/// Application configuration (dispatch worker).
#[derive(Clone, Debug)]
pub struct Config {
    pub environment: String,
    pub database_url: String,
    pub db_max_connections: u32,
    pub db_timeout_seconds: u64,
    // Queue configuration
    pub queue_poll_interval_ms: u64,
    pub queue_max_attempts: u32,
    pub queue_retry_initial_delay_ms: u64,
    /// How the router treats a failed channel read: "fail_fast" stops the
    /// loop, "skip_and_log" logs and continues with the other channels.
    pub queue_channel_failure_mode: String,
    // SMTP transport
    pub smtp_host: Option<String>,
    pub smtp_port: Option<u16>,
    pub smtp_user: Option<String>,
    pub smtp_password: Option<String>,
    pub smtp_from: Option<String>,
    pub smtp_tls: bool,
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string());

        Ok(Config {
            environment,
            database_url: env::var("DATABASE_URL")
                .map_err(|_| anyhow::anyhow!("DATABASE_URL must be set"))?,
            db_max_connections: env::var("DB_MAX_CONNECTIONS")
                .unwrap_or_else(|_| MAX_CONNECTIONS.to_string())
                .parse()
                .unwrap_or(MAX_CONNECTIONS),
            db_timeout_seconds: env::var("DB_TIMEOUT_SECONDS")
                .unwrap_or_else(|_| CONNECTION_TIMEOUT_SECS.to_string())
                .parse()
                .unwrap_or(CONNECTION_TIMEOUT_SECS),
            queue_poll_interval_ms: env::var("QUEUE_POLL_INTERVAL_MS")
                .unwrap_or_else(|_| QUEUE_POLL_INTERVAL_MS.to_string())
                .parse()
                .unwrap_or(QUEUE_POLL_INTERVAL_MS),
            queue_max_attempts: env::var("QUEUE_MAX_ATTEMPTS")
                .unwrap_or_else(|_| QUEUE_MAX_ATTEMPTS.to_string())
                .parse()
                .unwrap_or(QUEUE_MAX_ATTEMPTS),
            queue_retry_initial_delay_ms: env::var("QUEUE_RETRY_INITIAL_DELAY_MS")
                .unwrap_or_else(|_| QUEUE_RETRY_INITIAL_DELAY_MS.to_string())
                .parse()
                .unwrap_or(QUEUE_RETRY_INITIAL_DELAY_MS),
            queue_channel_failure_mode: env::var("QUEUE_CHANNEL_FAILURE_MODE")
                .unwrap_or_else(|_| "fail_fast".to_string())
                .to_lowercase(),
            smtp_host: env::var("SMTP_HOST").ok(),
            smtp_port: env::var("SMTP_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .or(Some(SMTP_PORT)),
            smtp_user: env::var("SMTP_USER").ok(),
            smtp_password: env::var("SMTP_PASSWORD").ok(),
            smtp_from: env::var("SMTP_FROM").ok(),
            smtp_tls: env::var("SMTP_TLS")
                .unwrap_or_else(|_| "true".to_string())
                .to_lowercase()
                .parse()
                .unwrap_or(true),
        })
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        let env = self.environment.to_lowercase();
        env == "production" || env == "prod"
    }
}
