//! Error types for subprocess execution.

use std::io;
use std::time::Duration;

use thiserror::Error;

/// Errors surfaced while running a command through the shell.
#[derive(Debug, Error)]
pub enum ExecutionError {
    /// The shell could not be started.
    #[error("failed to launch '{shell}': {source}")]
    Spawn {
        /// Shell that failed to start.
        shell: String,
        /// Underlying OS error.
        #[source]
        source: io::Error,
    },
    /// The process exited unsuccessfully.
    #[error("'{command}' exited unsuccessfully ({})", describe_exit(.exit_code))]
    Failed {
        /// Command token that failed.
        command: String,
        /// Exit status, or `None` when terminated by a signal.
        exit_code: Option<i32>,
        /// Captured standard error.
        stderr: String,
    },
    /// The process outlived its time budget and was killed.
    #[error("command timed out after {} seconds", .timeout.as_secs())]
    TimedOut {
        /// Command token that timed out.
        command: String,
        /// Budget that was exceeded.
        timeout: Duration,
    },
    /// Waiting for the process or collecting its output failed.
    #[error("failed to collect output of '{command}': {source}")]
    Io {
        /// Command token being run.
        command: String,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}

impl ExecutionError {
    /// Text sent back to the client for this failure.
    ///
    /// A failed process answers with its own standard error so clients see
    /// the tool's message unchanged.
    #[must_use]
    pub fn client_message(&self) -> String {
        match self {
            Self::Failed { stderr, .. } if !stderr.trim().is_empty() => stderr.clone(),
            other => other.to_string(),
        }
    }
}

fn describe_exit(exit_code: &Option<i32>) -> String {
    exit_code.map_or_else(
        || String::from("terminated by signal"),
        |code| format!("status {code}"),
    )
}
