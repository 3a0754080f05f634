//! Jobhub persistence layer.
//!
//! Postgres repository for email work items plus embedded migrations. This
//! crate implements the `EmailEventStore` collaborator trait consumed by the
//! queue engine.

pub mod db;

pub use db::{run_migrations, EmailEventRepository};
