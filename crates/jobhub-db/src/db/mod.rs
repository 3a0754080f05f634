//! Database repositories for data access layer
//!
//! Repositories provide CRUD operations and the specialized queries the
//! dispatch engine needs; each repository owns a specific domain entity.

use anyhow::{Context, Result};
use sqlx::PgPool;

pub mod email_event;

pub use email_event::EmailEventRepository;

/// Run the embedded migrations against the given pool.
pub async fn run_migrations(pool: &PgPool) -> Result<()> {
    sqlx::migrate!()
        .run(pool)
        .await
        .context("Failed to run database migrations")?;
    Ok(())
}
