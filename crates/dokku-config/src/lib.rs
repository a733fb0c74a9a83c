//! Shared configuration for the Dokku daemon.
//!
//! [`Config`] is layered by `ortho_config`: built-in defaults, an optional
//! TOML file (`--config-path` or `DOKKU_DAEMON_CONFIG_PATH`), environment
//! variables prefixed with `DOKKU_DAEMON_`, and finally command-line flags.
//! Later layers win.
//!
//! ```toml
//! socket_path = "/var/run/dokku-daemon/dokku-daemon.sock"
//! patterns_path = "/etc/dokku-daemon/commands.toml"
//! command_timeout_secs = 120
//! log_format = "compact"
//! ```

mod defaults;
mod logging;
mod socket;

use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use defaults::{
    DEFAULT_ACCEPT_QUEUE_CAPACITY, DEFAULT_COMMAND_TIMEOUT_SECS, DEFAULT_LOG_FILTER,
    DEFAULT_MAX_CONCURRENT_COMMANDS, DEFAULT_PATTERNS_PATH, DEFAULT_PROGRAM, DEFAULT_SHELL,
    DEFAULT_SOCKET_DIRECTORY, DEFAULT_SOCKET_FILE, default_accept_queue_capacity,
    default_command_timeout_secs, default_log_filter, default_log_filter_string,
    default_log_format, default_max_concurrent_commands, default_patterns_path, default_program,
    default_shell, default_socket_path,
};
pub use logging::{LogFormat, LogFormatParseError};
pub use socket::{SOCKET_DIRECTORY_MODE, SocketPreparationError, prepare_socket_directory};

/// Runtime configuration consumed by the daemon.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(prefix = "DOKKU_DAEMON")]
pub struct Config {
    /// Unix socket the daemon listens on.
    #[ortho_config(default = default_socket_path())]
    pub socket_path: Utf8PathBuf,
    /// Declarative pattern file describing command output shapes.
    #[ortho_config(default = default_patterns_path())]
    pub patterns_path: Utf8PathBuf,
    /// Host tool every accepted command is forwarded to.
    #[ortho_config(default = default_program())]
    pub program: String,
    /// Shell used to launch the host tool.
    #[ortho_config(default = default_shell())]
    pub shell: String,
    /// Upper bound on one subprocess execution, in seconds.
    #[ortho_config(default = default_command_timeout_secs())]
    pub command_timeout_secs: u64,
    /// Maximum number of subprocesses running at the same time.
    #[ortho_config(default = default_max_concurrent_commands())]
    pub max_concurrent_commands: usize,
    /// Capacity of the queue between the acceptor and the dispatcher.
    #[ortho_config(default = default_accept_queue_capacity())]
    pub accept_queue_capacity: usize,
    /// `tracing` filter expression.
    #[ortho_config(default = default_log_filter_string())]
    pub log_filter: String,
    /// Output format for daemon logs.
    #[ortho_config(default = default_log_format())]
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            socket_path: default_socket_path(),
            patterns_path: default_patterns_path(),
            program: default_program(),
            shell: default_shell(),
            command_timeout_secs: default_command_timeout_secs(),
            max_concurrent_commands: default_max_concurrent_commands(),
            accept_queue_capacity: default_accept_queue_capacity(),
            log_filter: default_log_filter_string(),
            log_format: default_log_format(),
        }
    }
}

impl Config {
    /// Socket path the daemon binds.
    #[must_use]
    pub fn socket_path(&self) -> &Utf8Path {
        self.socket_path.as_path()
    }

    /// Location of the pattern file.
    #[must_use]
    pub fn patterns_path(&self) -> &Utf8Path {
        self.patterns_path.as_path()
    }

    /// Host tool invoked for every command.
    #[must_use]
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Shell used to launch the host tool.
    #[must_use]
    pub fn shell(&self) -> &str {
        &self.shell
    }

    /// Subprocess timeout as a [`Duration`].
    #[must_use]
    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }

    /// Cap on concurrently running subprocesses.
    #[must_use]
    pub fn max_concurrent_commands(&self) -> usize {
        self.max_concurrent_commands
    }

    /// Capacity of the acceptor hand-off queue.
    #[must_use]
    pub fn accept_queue_capacity(&self) -> usize {
        self.accept_queue_capacity
    }

    /// `tracing` filter expression.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        &self.log_filter
    }

    /// Output format for daemon logs.
    #[must_use]
    pub fn log_format(&self) -> LogFormat {
        self.log_format
    }

    /// Creates the socket's parent directory if it does not exist yet.
    pub fn prepare_socket_directory(&self) -> Result<(), SocketPreparationError> {
        prepare_socket_directory(self.socket_path())
    }

    /// Rejects values that would leave the daemon unable to serve requests.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.program.trim().is_empty() {
            return Err(ConfigError::EmptyValue { field: "program" });
        }
        if self.shell.trim().is_empty() {
            return Err(ConfigError::EmptyValue { field: "shell" });
        }
        if self.command_timeout_secs == 0 {
            return Err(ConfigError::Zero {
                field: "command_timeout_secs",
            });
        }
        if self.max_concurrent_commands == 0 {
            return Err(ConfigError::Zero {
                field: "max_concurrent_commands",
            });
        }
        if self.accept_queue_capacity == 0 {
            return Err(ConfigError::Zero {
                field: "accept_queue_capacity",
            });
        }
        Ok(())
    }
}

/// Semantic errors found in an otherwise well-formed configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A text setting was blank.
    #[error("configuration value '{field}' must not be empty")]
    EmptyValue { field: &'static str },
    /// A numeric setting was zero.
    #[error("configuration value '{field}' must be greater than zero")]
    Zero { field: &'static str },
}
