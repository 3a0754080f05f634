//! Pollable message sources.

use async_trait::async_trait;

use jobhub_core::models::EmailEvent;

/// One work item ready for dispatch, keyed by its routing name.
#[derive(Debug, Clone)]
pub struct QueueMessage {
    pub event_name: String,
    pub event: EmailEvent,
}

impl QueueMessage {
    pub fn from_event(event: EmailEvent) -> Self {
        Self {
            event_name: event.event_name.clone(),
            event,
        }
    }
}

/// A pollable source of pending work items, read once per poll cycle.
///
/// Reading must not mutate item status; claiming is the handler's job so a
/// failed handler lookup leaves the item pending for the next cycle.
#[async_trait]
pub trait QueueChannel: Send + Sync {
    /// Stable channel name used in logs.
    fn name(&self) -> &str;

    /// Fetch the current batch of dispatchable messages.
    async fn poll(&self) -> anyhow::Result<Vec<QueueMessage>>;
}
