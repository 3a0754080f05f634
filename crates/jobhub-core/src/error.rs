//! Error types module
//!
//! Unified error enum for the dispatch engine and its collaborators. The
//! `Database` variant and `From<sqlx::Error>` are gated behind the `sqlx`
//! feature; with `default-features = false` the enum carries a plain string
//! variant for data-access errors instead.

#[cfg(feature = "sqlx")]
use sqlx::Error as SqlxError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[cfg(feature = "sqlx")]
    #[error("Database error: {0}")]
    Database(#[source] SqlxError),

    #[cfg(not(feature = "sqlx"))]
    #[error("Database error: {0}")]
    Database(String),

    #[error("Mail transport error: {0}")]
    Mail(String),

    #[error("Unknown event name: {0}")]
    UnknownEvent(String),

    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Internal error with source")]
    InternalWithSource {
        message: String,
        #[source]
        source: anyhow::Error,
    },
}

#[cfg(feature = "sqlx")]
impl From<SqlxError> for AppError {
    fn from(err: SqlxError) -> Self {
        AppError::Database(err)
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::InvalidPayload(format!("JSON parsing error: {}", err))
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::InternalWithSource {
            message: err.to_string(),
            source: err,
        }
    }
}

impl AppError {
    /// Whether a retry of the failed operation could plausibly succeed.
    /// Unknown names and malformed payloads are configuration errors and
    /// never become retryable at runtime.
    pub fn is_recoverable(&self) -> bool {
        match self {
            AppError::Database(_) | AppError::Mail(_) | AppError::Internal(_) => true,
            AppError::InternalWithSource { .. } => true,
            AppError::UnknownEvent(_) | AppError::InvalidPayload(_) | AppError::NotFound(_) => {
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_event_not_recoverable() {
        let err = AppError::UnknownEvent("mystery".to_string());
        assert!(!err.is_recoverable());
        assert_eq!(err.to_string(), "Unknown event name: mystery");
    }

    #[test]
    fn test_mail_error_recoverable() {
        let err = AppError::Mail("connection refused".to_string());
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_invalid_payload_from_serde() {
        let serde_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: AppError = serde_err.into();
        assert!(matches!(err, AppError::InvalidPayload(_)));
        assert!(!err.is_recoverable());
    }
}
