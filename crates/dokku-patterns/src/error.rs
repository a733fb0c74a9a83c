//! Error taxonomy for pattern compilation, registry loading, and parsing.

use std::path::PathBuf;

use thiserror::Error;

/// A pattern definition that cannot be compiled into a usable extractor.
#[derive(Debug, Error)]
pub enum PatternError {
    /// The regular expression failed to compile.
    #[error("pattern '{command}' has an invalid regex: {source}")]
    InvalidRegex {
        /// Command the pattern belongs to.
        command: String,
        /// Underlying regex compilation error.
        #[source]
        source: regex::Error,
    },
    /// The capture-group count differs from the key count.
    #[error(
        "pattern '{command}' declares {keys} keys but its regex has {groups} capture groups"
    )]
    Mismatch {
        /// Command the pattern belongs to.
        command: String,
        /// Number of keys declared.
        keys: usize,
        /// Number of capture groups in the regex.
        groups: usize,
    },
}

/// Failure to turn command output into records.
#[derive(Debug, Error)]
pub enum ParseError {
    /// No pattern is registered for the command.
    ///
    /// This is not fatal: it means the command has no structured shape.
    #[error("Command Not Found")]
    CommandNotFound {
        /// Command name that was looked up.
        command: String,
    },
    /// The pattern could not be applied to the output.
    #[error(transparent)]
    Pattern(#[from] PatternError),
}

impl ParseError {
    /// Builds a [`ParseError::CommandNotFound`] for `command`.
    #[must_use]
    pub fn command_not_found(command: impl Into<String>) -> Self {
        Self::CommandNotFound {
            command: command.into(),
        }
    }
}

/// Failure while building a [`PatternRegistry`](crate::PatternRegistry).
#[derive(Debug, Error)]
pub enum RegistryError {
    /// The pattern file could not be read.
    #[error("failed to read pattern file '{}': {source}", path.display())]
    Read {
        /// Path that was read.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },
    /// The pattern file does not decode into the expected schema.
    #[error("failed to decode pattern file: {message}")]
    Decode {
        /// Decoder message.
        message: String,
    },
    /// A command name is empty or contains whitespace.
    #[error("invalid command name '{name}': names must be non-empty and contain no whitespace")]
    InvalidName {
        /// Offending name.
        name: String,
    },
    /// A command is listed both with a pattern and as passthrough.
    #[error("command '{name}' is declared more than once")]
    Duplicate {
        /// Offending name.
        name: String,
    },
    /// A pattern failed validation.
    #[error(transparent)]
    Pattern(#[from] PatternError),
}
