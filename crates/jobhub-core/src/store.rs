//! Persistence collaborator trait
//!
//! The queue engine consumes the store purely through this seam: list the
//! pending work items and advance a single item's status. The Postgres
//! implementation lives in `jobhub-db`; tests substitute an in-memory store.

use async_trait::async_trait;
use uuid::Uuid;

use crate::models::{EmailEvent, EventStatus};

/// Store of persisted email work items.
///
/// Reads must not mutate status; status transitions are the dispatcher's
/// responsibility so that a routing failure leaves an item pending.
#[async_trait]
pub trait EmailEventStore: Send + Sync {
    /// List all work items currently in pending status, oldest first.
    async fn list_pending(&self) -> anyhow::Result<Vec<EmailEvent>>;

    /// Persist a status transition for one work item.
    async fn update_status(&self, id: Uuid, status: EventStatus) -> anyhow::Result<()>;
}
