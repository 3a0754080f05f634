//! Jobhub Mailer – outbound email transport over SMTP.
//!
//! Implements the `Mailer` collaborator trait: render the plain-text
//! template for a job and hand it to lettre's async SMTP transport.

mod smtp;
mod templates;

pub use smtp::SmtpMailer;
pub use templates::{render, EmailTemplate};
