//! Subprocess execution of allow-listed commands.
//!
//! Every accepted request becomes a [`CommandLine`] that [`ShellExecutor`]
//! runs as `<shell> -c 'exec <program> "$@"' <program> <command> <args...>`.
//! Arguments travel as positional parameters, so the shell never
//! re-interprets them. Each run is bounded by a timeout, and the number of
//! runs in flight is capped by an [`ExecutionLimiter`].

mod command_line;
mod errors;
mod limiter;
mod shell;

pub use self::command_line::{CommandLine, strip_command};
pub use self::errors::ExecutionError;
pub use self::limiter::{ExecutionLimiter, ExecutionPermit};
pub use self::shell::ShellExecutor;

pub(crate) const EXECUTOR_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::executor");

/// Runs a [`CommandLine`] and captures what it printed.
///
/// Implementations are shared between connection threads.
pub trait CommandExecutor: Send + Sync {
    /// Runs `line` to completion.
    ///
    /// A process that starts and exits, whatever its status, yields an
    /// [`ExecutionResult`]; launch failures and timeouts are errors.
    fn execute(&self, line: &CommandLine) -> Result<ExecutionResult, ExecutionError>;
}

/// Captured outcome of one subprocess run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionResult {
    command: String,
    stdout: String,
    stderr: String,
    exit_code: Option<i32>,
}

impl ExecutionResult {
    /// Builds a result from its parts. `exit_code` is `None` when the
    /// process was terminated by a signal.
    #[must_use]
    pub fn new(
        command: impl Into<String>,
        stdout: impl Into<String>,
        stderr: impl Into<String>,
        exit_code: Option<i32>,
    ) -> Self {
        Self {
            command: command.into(),
            stdout: stdout.into(),
            stderr: stderr.into(),
            exit_code,
        }
    }

    /// Captured standard output.
    #[must_use]
    pub fn stdout(&self) -> &str {
        &self.stdout
    }

    /// Captured standard error.
    #[must_use]
    pub fn stderr(&self) -> &str {
        &self.stderr
    }

    /// Exit status, if the process exited normally.
    #[must_use]
    pub const fn exit_code(&self) -> Option<i32> {
        self.exit_code
    }

    /// Whether the process exited with status zero.
    #[must_use]
    pub fn succeeded(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// Standard output of a successful run.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutionError::Failed`] carrying the captured standard
    /// error when the process did not exit with status zero.
    pub fn into_stdout(self) -> Result<String, ExecutionError> {
        if self.succeeded() {
            return Ok(self.stdout);
        }
        Err(ExecutionError::Failed {
            command: self.command,
            exit_code: self.exit_code,
            stderr: self.stderr,
        })
    }
}
