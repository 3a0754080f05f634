//! Email dispatch worker.
//!
//! Wires configuration, the Postgres-backed event store, the SMTP mailer,
//! and the queue router, then runs the poll loop until SIGINT.

use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use jobhub_core::Config;
use jobhub_db::EmailEventRepository;
use jobhub_mailer::SmtpMailer;
use jobhub_queue::{
    EmailQueueController, QueueController, QueueRouter, QueueRouterConfig, RetryPolicy,
};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            "jobhub_worker=debug,jobhub_queue=debug,jobhub_db=debug,jobhub_mailer=debug".into()
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .acquire_timeout(Duration::from_secs(config.db_timeout_seconds))
        .connect(&config.database_url)
        .await
        .context("Failed to connect to database")?;
    jobhub_db::run_migrations(&pool).await?;

    let repository = EmailEventRepository::new(pool);
    let mailer = SmtpMailer::from_config(&config)?;
    let retry = RetryPolicy::new(
        config.queue_max_attempts,
        Duration::from_millis(config.queue_retry_initial_delay_ms),
    );

    let controller = EmailQueueController::new(Arc::new(repository), Arc::new(mailer), retry);
    let controllers: Vec<Arc<dyn QueueController>> = vec![Arc::new(controller)];

    let router = QueueRouter::new(
        &controllers,
        QueueRouterConfig {
            poll_interval_ms: config.queue_poll_interval_ms,
            channel_failure_mode: config.queue_channel_failure_mode.parse()?,
        },
    );
    let handle = router.start()?;

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;
    tracing::info!("Shutdown signal received");
    router.stop().await;
    handle.await.context("Queue router task panicked")?;

    Ok(())
}
