pub mod email_event;

pub use email_event::{
    EmailEvent, EmailEventStats, EmailJob, EventKind, EventPayload, EventStatus,
    ResetPasswordPayload, VerifyEmailPayload,
};
