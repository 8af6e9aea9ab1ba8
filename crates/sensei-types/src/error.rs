//! Error hierarchy for Sensei.

use thiserror::Error;

/// Errors from validating a chat message batch.
///
/// Validation is all-or-nothing: one bad message rejects the whole batch.
/// Every malformed input shape maps to a variant here; validation never
/// panics.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Messages must be an array of {{role, content}} objects")]
    InvalidFormat,

    #[error("Message batch is empty")]
    EmptyBatch,

    #[error("Message batch has {len} messages (max {max})")]
    BatchTooLarge { len: usize, max: usize },

    #[error("Invalid message role '{role}'")]
    InvalidRole { role: String },

    #[error("Message {index} has no content after sanitization")]
    EmptyContent { index: usize },
}

/// Errors surfaced by a streaming chat call.
///
/// All guard failures are reported before any network I/O. For a given
/// call, the error callback and the done callback are mutually exclusive.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("No active session; sign in to continue")]
    AuthRequired,

    #[error("Authentication rejected by server (status {status})")]
    AuthFailed { status: u16 },

    #[error("Invalid format: {message}")]
    InvalidFormat { message: String },

    #[error("Resource {resource} does not belong to the current user")]
    Unauthorized { resource: String },

    #[error("Rate limit exceeded; retry in {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("AI credits depleted")]
    CreditsDepleted,

    #[error("Connection failed: {message}")]
    Connection { message: String },

    #[error("Request timed out after {seconds}s")]
    Timeout { seconds: u64 },

    #[error("Operation cancelled")]
    Cancelled,

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

impl ChatError {
    /// Whether the caller can plausibly recover by retrying later.
    ///
    /// Auth errors need a re-sign-in first; format, ownership, and
    /// validation failures are caller bugs and will not heal on retry.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ChatError::RateLimited { .. }
                | ChatError::Connection { .. }
                | ChatError::Timeout { .. }
        )
    }
}

/// Errors from configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config file parse error at {path}: {message}")]
    Parse { path: String, message: String },

    #[error("Missing required configuration: {key}")]
    MissingKey { key: String },

    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },
}

/// Errors from rate-limit record storage.
///
/// The limiter treats any of these as a signal to fail open; they are
/// logged, never propagated to the caller.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_kinds() {
        assert!(ChatError::RateLimited {
            retry_after_secs: 30
        }
        .is_retryable());
        assert!(ChatError::Connection {
            message: "reset".into()
        }
        .is_retryable());
        assert!(ChatError::Timeout { seconds: 30 }.is_retryable());
    }

    #[test]
    fn non_retryable_kinds() {
        assert!(!ChatError::AuthRequired.is_retryable());
        assert!(!ChatError::CreditsDepleted.is_retryable());
        assert!(!ChatError::Unauthorized {
            resource: "r".into()
        }
        .is_retryable());
        assert!(!ChatError::Validation(ValidationError::EmptyBatch).is_retryable());
    }

    #[test]
    fn validation_error_display() {
        let err = ValidationError::BatchTooLarge { len: 51, max: 50 };
        assert_eq!(err.to_string(), "Message batch has 51 messages (max 50)");
    }
}
