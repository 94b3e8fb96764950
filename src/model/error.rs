use thiserror::Error;

/// Errors surfaced by the listing and transfer services.
///
/// Every variant is terminal for the call that produced it; nothing is
/// retried internally.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// The store rejected or failed an operation.
    #[error("{message}")]
    Backend { message: String },

    /// A bounded enumeration exceeded its deadline.
    #[error("{operation} timed out")]
    Timeout { operation: String },

    /// Malformed tabular content.
    #[error("failed to parse {path}: {message}")]
    Parse { path: String, message: String },

    /// Data was written but the stream could not be closed, so the object's
    /// durability is unconfirmed.
    #[error("write to {path} not confirmed: {message}")]
    IncompleteWrite { path: String, message: String },

    #[error("invalid argument: {message}")]
    InvalidArgument { message: String },
}

impl StorageError {
    pub fn backend(message: impl Into<String>) -> Self {
        StorageError::Backend {
            message: message.into(),
        }
    }

    pub fn timeout(operation: impl Into<String>) -> Self {
        StorageError::Timeout {
            operation: operation.into(),
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        StorageError::InvalidArgument {
            message: message.into(),
        }
    }

    /// Short label used as the `error_group` field in logs.
    pub fn group(&self) -> &'static str {
        match self {
            StorageError::Backend { .. } => "backend",
            StorageError::Timeout { .. } => "timeout",
            StorageError::Parse { .. } => "parse",
            StorageError::IncompleteWrite { .. } => "incomplete_write",
            StorageError::InvalidArgument { .. } => "invalid_argument",
        }
    }
}
