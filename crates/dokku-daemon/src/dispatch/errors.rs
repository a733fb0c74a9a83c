//! Error types for request dispatch failures.

use std::io;

use thiserror::Error;

use crate::executor::ExecutionError;

/// Errors surfaced while reading, running, or answering a request.
#[derive(Debug, Error)]
pub(crate) enum DispatchError {
    /// The request line held no command token.
    #[error("empty command")]
    EmptyCommand,

    /// The command token is not on the allow-list.
    #[error("Command Not Found")]
    CommandNotFound { command: String },

    /// The request line exceeds the size limit.
    #[error("request too large: more than {max_size} bytes without a newline")]
    RequestTooLarge { max_size: usize },

    /// The request line is not valid UTF-8.
    #[error("request is not valid UTF-8")]
    InvalidEncoding,

    /// Running the command failed.
    #[error(transparent)]
    Execution(#[from] ExecutionError),

    /// IO error during read or write.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Response serialization failed.
    #[error("failed to serialize response: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl DispatchError {
    /// Creates a command-not-found error.
    pub(crate) fn command_not_found(command: impl Into<String>) -> Self {
        Self::CommandNotFound {
            command: command.into(),
        }
    }

    /// Creates a request-too-large error.
    pub(crate) fn request_too_large(max_size: usize) -> Self {
        Self::RequestTooLarge { max_size }
    }

    /// Text placed in the `output` field of the error response.
    pub(crate) fn client_message(&self) -> String {
        match self {
            Self::Execution(error) => error.client_message(),
            other => other.to_string(),
        }
    }

    /// Whether the connection can keep serving requests after this error.
    pub(crate) fn is_recoverable(&self) -> bool {
        !matches!(
            self,
            Self::RequestTooLarge { .. } | Self::Io(_) | Self::Serialize(_)
        )
    }
}
