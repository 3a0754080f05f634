//! Outbound-notification collaborator trait
//!
//! A mailer accepts a templated send request and succeeds or fails with a
//! transport error; there are no partial-success states. The SMTP
//! implementation lives in `jobhub-mailer`.

use async_trait::async_trait;

use crate::models::EmailJob;

#[async_trait]
pub trait Mailer: Send + Sync {
    /// Render and send the templated message for one job.
    async fn send(&self, job: &EmailJob) -> anyhow::Result<()>;
}
