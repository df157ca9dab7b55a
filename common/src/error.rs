//! Error types shared by kursbot persistence collaborators.

use thiserror::Error;

use crate::{ChatId, UserId};

/// Failure reported by a storage collaborator.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Storage backend cannot be reached.
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    /// Write rejected because it would violate a stored invariant.
    #[error("Storage conflict: {0}")]
    Conflict(String),

    /// Read or write failed mid-operation.
    #[error("Storage I/O error: {0}")]
    Io(String),
}

impl StoreError {
    /// Get error code for logs and replies.
    pub fn error_code(&self) -> &'static str {
        match self {
            StoreError::Unavailable(_) => "STORE_UNAVAILABLE",
            StoreError::Conflict(_) => "STORE_CONFLICT",
            StoreError::Io(_) => "STORE_IO",
        }
    }
}

/// Result type alias for storage operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Errors from the user directory.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DirectoryError {
    #[error("Email already registered: {0}")]
    DuplicateEmail(String),

    #[error("Username already registered: {0}")]
    DuplicateUsername(String),

    #[error("Chat already has an account: {0}")]
    DuplicateChatId(ChatId),

    #[error("User not found: {0}")]
    NotFound(UserId),

    #[error("Password hashing failed: {0}")]
    Hashing(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl DirectoryError {
    /// Get error code for logs and replies.
    pub fn error_code(&self) -> &'static str {
        match self {
            DirectoryError::DuplicateEmail(_) => "DUPLICATE_EMAIL",
            DirectoryError::DuplicateUsername(_) => "DUPLICATE_USERNAME",
            DirectoryError::DuplicateChatId(_) => "DUPLICATE_CHAT_ID",
            DirectoryError::NotFound(_) => "USER_NOT_FOUND",
            DirectoryError::Hashing(_) => "HASHING_FAILED",
            DirectoryError::Store(e) => e.error_code(),
        }
    }

    /// Whether the failure is one of the duplicate-registration causes.
    pub fn is_duplicate(&self) -> bool {
        matches!(
            self,
            DirectoryError::DuplicateEmail(_)
                | DirectoryError::DuplicateUsername(_)
                | DirectoryError::DuplicateChatId(_)
        )
    }
}

/// Result type alias for directory operations.
pub type DirectoryResult<T> = std::result::Result<T, DirectoryError>;
