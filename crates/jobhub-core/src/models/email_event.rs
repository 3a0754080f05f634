use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use uuid::Uuid;

use crate::error::AppError;

/// Closed set of event names the dispatch engine knows how to process.
/// An event name outside this set is a configuration error surfaced at
/// handler resolution, not silently dropped.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum EventKind {
    VerifyEmail,
    ResetPassword,
}

impl Display for EventKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            EventKind::VerifyEmail => write!(f, "verify-email"),
            EventKind::ResetPassword => write!(f, "reset-password"),
        }
    }
}

impl FromStr for EventKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "verify-email" => Ok(EventKind::VerifyEmail),
            "reset-password" => Ok(EventKind::ResetPassword),
            _ => Err(anyhow::anyhow!("Invalid event kind: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "email_event_status", rename_all = "lowercase")
)]
#[serde(rename_all = "snake_case")]
pub enum EventStatus {
    Pending,
    Processing,
    Processed,
    Failed,
}

impl EventStatus {
    /// Terminal statuses are never transitioned out of by the engine.
    pub fn is_terminal(&self) -> bool {
        matches!(self, EventStatus::Processed | EventStatus::Failed)
    }
}

impl Display for EventStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            EventStatus::Pending => write!(f, "pending"),
            EventStatus::Processing => write!(f, "processing"),
            EventStatus::Processed => write!(f, "processed"),
            EventStatus::Failed => write!(f, "failed"),
        }
    }
}

impl FromStr for EventStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(EventStatus::Pending),
            "processing" => Ok(EventStatus::Processing),
            "processed" => Ok(EventStatus::Processed),
            "failed" => Ok(EventStatus::Failed),
            _ => Err(anyhow::anyhow!("Invalid event status: {}", s)),
        }
    }
}

/// A persisted email work item. Created pending by an upstream business
/// action; the dispatch engine only reads pending rows and advances status.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct EmailEvent {
    pub id: Uuid,
    /// Kept as a raw string so rows with unregistered names stay
    /// representable and are skipped instead of failing deserialization.
    pub event_name: String,
    pub payload: serde_json::Value,
    pub status: EventStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
}

impl EmailEvent {
    pub fn is_pending(&self) -> bool {
        self.status == EventStatus::Pending
    }

    /// Parse the event name and payload into the typed job union.
    pub fn job(&self) -> Result<EmailJob, AppError> {
        let kind: EventKind = self
            .event_name
            .parse()
            .map_err(|_| AppError::UnknownEvent(self.event_name.clone()))?;
        let job = match kind {
            EventKind::VerifyEmail => EmailJob::VerifyEmail(self.try_payload_as()?),
            EventKind::ResetPassword => EmailJob::ResetPassword(self.try_payload_as()?),
        };
        Ok(job)
    }

    /// Extract the payload as a typed struct.
    /// Returns None if deserialization fails.
    pub fn payload_as<P: EventPayload>(&self) -> Option<P> {
        serde_json::from_value(self.payload.clone()).ok()
    }

    /// Extract the payload as a typed struct, returning an error on failure.
    pub fn try_payload_as<P: EventPayload>(&self) -> Result<P, serde_json::Error> {
        serde_json::from_value(self.payload.clone())
    }

    /// Create a payload value from a typed struct.
    /// Use this when enqueuing events to ensure type consistency.
    pub fn payload_from<P: EventPayload>(payload: &P) -> serde_json::Value {
        serde_json::to_value(payload).unwrap_or_default()
    }
}

/// Trait for type-safe event payloads
pub trait EventPayload: Serialize + for<'de> Deserialize<'de> {
    fn kind() -> EventKind;
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VerifyEmailPayload {
    pub email: String,
    pub link: String,
}

impl EventPayload for VerifyEmailPayload {
    fn kind() -> EventKind {
        EventKind::VerifyEmail
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResetPasswordPayload {
    pub email: String,
    pub link: String,
}

impl EventPayload for ResetPasswordPayload {
    fn kind() -> EventKind {
        EventKind::ResetPassword
    }
}

/// Tagged union over the closed event-kind set, each variant carrying its
/// strongly-typed payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmailJob {
    VerifyEmail(VerifyEmailPayload),
    ResetPassword(ResetPasswordPayload),
}

impl EmailJob {
    pub fn kind(&self) -> EventKind {
        match self {
            EmailJob::VerifyEmail(_) => EventKind::VerifyEmail,
            EmailJob::ResetPassword(_) => EventKind::ResetPassword,
        }
    }

    /// The routing key this job is dispatched under.
    pub fn event_name(&self) -> String {
        self.kind().to_string()
    }

    pub fn recipient(&self) -> &str {
        match self {
            EmailJob::VerifyEmail(p) => &p.email,
            EmailJob::ResetPassword(p) => &p.email,
        }
    }

    pub fn payload_json(&self) -> serde_json::Value {
        match self {
            EmailJob::VerifyEmail(p) => EmailEvent::payload_from(p),
            EmailJob::ResetPassword(p) => EmailEvent::payload_from(p),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct EmailEventStats {
    pub total: i64,
    pub pending: i64,
    pub processing: i64,
    pub processed: i64,
    pub failed: i64,
}
