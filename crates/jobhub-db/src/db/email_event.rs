use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

use jobhub_core::models::{EmailEvent, EmailEventStats, EmailJob, EventStatus};
use jobhub_core::EmailEventStore;

#[derive(Clone)]
pub struct EmailEventRepository {
    pool: PgPool,
}

impl EmailEventRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Enqueue a new email event in pending status.
    /// Called by upstream business actions (e.g. user registration).
    #[tracing::instrument(skip(self, job), fields(event_name = %job.event_name()))]
    pub async fn enqueue(&self, job: &EmailJob) -> Result<EmailEvent> {
        let event: EmailEvent = sqlx::query_as::<Postgres, EmailEvent>(
            r#"
            INSERT INTO email_events (event_name, payload, status)
            VALUES ($1, $2, 'pending')
            RETURNING
                id,
                event_name,
                payload,
                status,
                created_at,
                updated_at,
                processed_at
            "#,
        )
        .bind(job.event_name())
        .bind(job.payload_json())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(
                error = %e,
                event_name = %job.event_name(),
                "Failed to insert email event into database"
            );
            anyhow::anyhow!("Failed to insert email event into database: {}", e)
        })?;

        tracing::info!(
            event_id = %event.id,
            event_name = %event.event_name,
            recipient = %job.recipient(),
            "Email event enqueued"
        );

        Ok(event)
    }

    /// Get an email event by ID
    #[tracing::instrument(skip(self))]
    pub async fn get(&self, event_id: Uuid) -> Result<Option<EmailEvent>> {
        let event: Option<EmailEvent> = sqlx::query_as::<Postgres, EmailEvent>(
            r#"
            SELECT
                id,
                event_name,
                payload,
                status,
                created_at,
                updated_at,
                processed_at
            FROM email_events
            WHERE id = $1
            "#,
        )
        .bind(event_id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch email event")?;

        Ok(event)
    }

    /// List all pending email events, oldest first.
    ///
    /// No side effects on read: rows stay pending until the dispatcher
    /// claims them, so a handler lookup failure leaves the item retryable
    /// on the next poll cycle.
    #[tracing::instrument(skip(self))]
    pub async fn list_pending_events(&self) -> Result<Vec<EmailEvent>> {
        let events = sqlx::query_as::<Postgres, EmailEvent>(
            r#"
            SELECT
                id,
                event_name,
                payload,
                status,
                created_at,
                updated_at,
                processed_at
            FROM email_events
            WHERE status = 'pending'
            ORDER BY created_at ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to list pending email events")?;

        Ok(events)
    }

    /// Update event status (used for the pending -> processing transition)
    #[tracing::instrument(skip(self))]
    pub async fn set_status(&self, event_id: Uuid, status: EventStatus) -> Result<EmailEvent> {
        let event: EmailEvent = sqlx::query_as::<Postgres, EmailEvent>(
            r#"
            UPDATE email_events
            SET status = $2,
                updated_at = NOW()
            WHERE id = $1
            RETURNING
                id,
                event_name,
                payload,
                status,
                created_at,
                updated_at,
                processed_at
            "#,
        )
        .bind(event_id)
        .bind(status)
        .fetch_one(&self.pool)
        .await
        .context("Failed to update email event status")?;

        tracing::debug!(
            event_id = %event_id,
            status = %status,
            "Email event status updated"
        );

        Ok(event)
    }

    /// Mark event as processed after a successful send
    #[tracing::instrument(skip(self))]
    pub async fn mark_processed(&self, event_id: Uuid) -> Result<EmailEvent> {
        let event: EmailEvent = sqlx::query_as::<Postgres, EmailEvent>(
            r#"
            UPDATE email_events
            SET status = 'processed',
                processed_at = NOW(),
                updated_at = NOW()
            WHERE id = $1
            RETURNING
                id,
                event_name,
                payload,
                status,
                created_at,
                updated_at,
                processed_at
            "#,
        )
        .bind(event_id)
        .fetch_one(&self.pool)
        .await
        .context("Failed to mark email event as processed")?;

        tracing::info!(
            event_id = %event_id,
            event_name = %event.event_name,
            "Email event processed"
        );

        Ok(event)
    }

    /// Mark event as failed after retries are exhausted
    #[tracing::instrument(skip(self))]
    pub async fn mark_failed(&self, event_id: Uuid) -> Result<EmailEvent> {
        let event: EmailEvent = sqlx::query_as::<Postgres, EmailEvent>(
            r#"
            UPDATE email_events
            SET status = 'failed',
                processed_at = NOW(),
                updated_at = NOW()
            WHERE id = $1
            RETURNING
                id,
                event_name,
                payload,
                status,
                created_at,
                updated_at,
                processed_at
            "#,
        )
        .bind(event_id)
        .fetch_one(&self.pool)
        .await
        .context("Failed to mark email event as failed")?;

        tracing::error!(
            event_id = %event_id,
            event_name = %event.event_name,
            "Email event failed"
        );

        Ok(event)
    }

    /// Get aggregated event statistics for reporting and ops tooling
    #[tracing::instrument(skip(self))]
    pub async fn get_stats(&self) -> Result<EmailEventStats> {
        use sqlx::Row;
        let row = sqlx::query(
            r#"
            SELECT
                COUNT(*) as total,
                COUNT(*) FILTER (WHERE status = 'pending') as pending,
                COUNT(*) FILTER (WHERE status = 'processing') as processing,
                COUNT(*) FILTER (WHERE status = 'processed') as processed,
                COUNT(*) FILTER (WHERE status = 'failed') as failed
            FROM email_events
            "#,
        )
        .fetch_one(&self.pool)
        .await
        .context("Failed to fetch email event stats")?;

        Ok(EmailEventStats {
            total: row.get::<Option<i64>, _>("total").unwrap_or(0),
            pending: row.get::<Option<i64>, _>("pending").unwrap_or(0),
            processing: row.get::<Option<i64>, _>("processing").unwrap_or(0),
            processed: row.get::<Option<i64>, _>("processed").unwrap_or(0),
            failed: row.get::<Option<i64>, _>("failed").unwrap_or(0),
        })
    }
}

#[async_trait]
impl EmailEventStore for EmailEventRepository {
    async fn list_pending(&self) -> Result<Vec<EmailEvent>> {
        self.list_pending_events().await
    }

    async fn update_status(&self, id: Uuid, status: EventStatus) -> Result<()> {
        match status {
            EventStatus::Processed => self.mark_processed(id).await?,
            EventStatus::Failed => self.mark_failed(id).await?,
            other => self.set_status(id, other).await?,
        };
        Ok(())
    }
}
