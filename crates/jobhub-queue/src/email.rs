//! Email dispatch controller.
//!
//! Owns the per-item state machine: claim the item as processing, execute
//! the templated send through the retry policy, then persist processed or
//! failed. Errors are re-raised to the router, which contains them per item.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::sync::Arc;

use jobhub_core::models::{EmailEvent, EventKind, EventStatus};
use jobhub_core::{EmailEventStore, Mailer};

use crate::channel::{QueueChannel, QueueMessage};
use crate::registry::{QueueController, QueueHandler};
use crate::retry::RetryPolicy;

/// Controller for the email work-item queue. Serves both known event names
/// with a single handler; the template branch happens on the typed job.
#[derive(Clone)]
pub struct EmailQueueController {
    store: Arc<dyn EmailEventStore>,
    mailer: Arc<dyn Mailer>,
    retry: RetryPolicy,
}

impl EmailQueueController {
    pub fn new(
        store: Arc<dyn EmailEventStore>,
        mailer: Arc<dyn Mailer>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            store,
            mailer,
            retry,
        }
    }

    /// Process one claimed work item through to a terminal status.
    #[tracing::instrument(skip(self, event), fields(event_id = %event.id, event_name = %event.event_name))]
    async fn process(&self, event: &EmailEvent) -> Result<()> {
        // Claim before the side effect: a crash mid-send is then visible as
        // stuck-in-processing instead of silently returning to pending.
        self.store
            .update_status(event.id, EventStatus::Processing)
            .await
            .context("Failed to mark email event as processing")?;

        // A payload that does not parse into the closed job set can never
        // succeed; fail it without consuming send attempts.
        let job = match event.job() {
            Ok(job) => job,
            Err(e) => {
                self.store
                    .update_status(event.id, EventStatus::Failed)
                    .await
                    .context("Failed to mark email event as failed")?;
                return Err(anyhow::Error::from(e)
                    .context(format!("Unprocessable email event {}", event.id)));
            }
        };

        let event_id = event.id;
        let event_name = event.event_name.clone();
        let _listener = self.retry.events().subscribe(move |error| {
            tracing::warn!(
                event_id = %event_id,
                event_name = %event_name,
                error = %error,
                "Email send attempt failed, will retry"
            );
        });

        let send = self.retry.execute(|| {
            let mailer = self.mailer.clone();
            let job = job.clone();
            async move { mailer.send(&job).await }
        });

        match send.await {
            Ok(()) => {
                self.store
                    .update_status(event.id, EventStatus::Processed)
                    .await
                    .context("Failed to mark email event as processed")?;
                tracing::info!(
                    event_id = %event.id,
                    event_name = %event.event_name,
                    "Email event processed"
                );
                Ok(())
            }
            Err(error) => {
                self.store
                    .update_status(event.id, EventStatus::Failed)
                    .await
                    .context("Failed to mark email event as failed")?;
                Err(error.context(format!(
                    "Email send exhausted retries for event {}",
                    event.id
                )))
            }
        }
    }
}

struct EmailQueueHandler {
    controller: EmailQueueController,
}

#[async_trait]
impl QueueHandler for EmailQueueHandler {
    async fn handle(&self, event: &EmailEvent) -> Result<()> {
        self.controller.process(event).await
    }
}

impl QueueController for EmailQueueController {
    fn routes(&self) -> Vec<(String, Arc<dyn QueueHandler>)> {
        let handler: Arc<dyn QueueHandler> = Arc::new(EmailQueueHandler {
            controller: self.clone(),
        });
        vec![
            (EventKind::VerifyEmail.to_string(), handler.clone()),
            (EventKind::ResetPassword.to_string(), handler),
        ]
    }

    fn channels(&self) -> Vec<Arc<dyn QueueChannel>> {
        vec![Arc::new(PendingEmailChannel {
            store: self.store.clone(),
        })]
    }
}

/// Channel over the store's pending email events.
pub struct PendingEmailChannel {
    store: Arc<dyn EmailEventStore>,
}

impl PendingEmailChannel {
    pub fn new(store: Arc<dyn EmailEventStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl QueueChannel for PendingEmailChannel {
    fn name(&self) -> &str {
        "email-events"
    }

    async fn poll(&self) -> Result<Vec<QueueMessage>> {
        let events = self
            .store
            .list_pending()
            .await
            .context("Failed to list pending email events")?;
        Ok(events.into_iter().map(QueueMessage::from_event).collect())
    }
}
