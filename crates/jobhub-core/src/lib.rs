//! Jobhub Core Library
//!
//! This crate provides the domain models, error types, configuration, and
//! collaborator traits shared by the queue engine, the persistence layer,
//! and the mailer.

pub mod config;
pub mod error;
pub mod mail;
pub mod models;
pub mod store;

// Re-export commonly used types
pub use config::Config;
pub use error::AppError;
pub use mail::Mailer;
pub use store::EmailEventStore;
