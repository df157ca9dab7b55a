//! Bot error types.

use thiserror::Error;

use crate::reply::{Message, Reply};

/// Failure of one flow step.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FlowError {
    /// Bad input. The flow stays where it is and the user may retry.
    #[error("Rejected input: {0}")]
    Invalid(Message),

    /// The flow cannot continue. Its state is reset before replying.
    #[error("Flow aborted [{code}]: {cause}")]
    Aborted {
        message: Message,
        code: &'static str,
        cause: String,
    },
}

impl FlowError {
    pub fn aborted(message: Message, code: &'static str, cause: impl ToString) -> Self {
        FlowError::Aborted {
            message,
            code,
            cause: cause.to_string(),
        }
    }

    /// Check if the user may retry without restarting the flow.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, FlowError::Invalid(_))
    }

    /// Get error code for logs.
    pub fn error_code(&self) -> &'static str {
        match self {
            FlowError::Invalid(message) => message.key(),
            FlowError::Aborted { code, .. } => *code,
        }
    }

    /// The user-facing reply for this failure.
    pub fn into_reply(self) -> Reply {
        match self {
            FlowError::Invalid(message) | FlowError::Aborted { message, .. } => Reply::new(message),
        }
    }
}

impl From<Message> for FlowError {
    fn from(message: Message) -> Self {
        FlowError::Invalid(message)
    }
}

/// Result of a flow step.
pub type FlowResult = Result<Reply, FlowError>;

/// Verification code could not be delivered.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Failed to deliver verification code to {destination}: {reason}")]
pub struct NotifyError {
    pub destination: String,
    pub reason: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recoverability() {
        assert!(FlowError::from(Message::InvalidEmail).is_recoverable());

        let aborted = FlowError::aborted(Message::GenericError, "STORE_IO", "disk");
        assert!(!aborted.is_recoverable());
        assert_eq!(aborted.error_code(), "STORE_IO");
        assert_eq!(aborted.into_reply().message, Message::GenericError);
    }
}
