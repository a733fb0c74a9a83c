use camino::Utf8PathBuf;

use crate::logging::LogFormat;

/// Directory holding the daemon socket on a stock Dokku host.
pub const DEFAULT_SOCKET_DIRECTORY: &str = "/var/run/dokku-daemon";

/// File name of the daemon socket inside [`DEFAULT_SOCKET_DIRECTORY`].
pub const DEFAULT_SOCKET_FILE: &str = "dokku-daemon.sock";

/// Pattern file location, resolved against the daemon's working directory.
pub const DEFAULT_PATTERNS_PATH: &str = "parser/commands.toml";

/// Host tool every accepted command is forwarded to.
pub const DEFAULT_PROGRAM: &str = "dokku";

/// Shell used to launch the host tool.
pub const DEFAULT_SHELL: &str = "bash";

/// Upper bound on a single subprocess execution.
pub const DEFAULT_COMMAND_TIMEOUT_SECS: u64 = 300;

/// Maximum number of subprocesses allowed to run at the same time.
pub const DEFAULT_MAX_CONCURRENT_COMMANDS: usize = 16;

/// Pending connections the acceptor may queue ahead of the dispatcher.
pub const DEFAULT_ACCEPT_QUEUE_CAPACITY: usize = 100;

/// Default log filter expression used by the daemon.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Default Unix socket path for the daemon.
pub fn default_socket_path() -> Utf8PathBuf {
    Utf8PathBuf::from(DEFAULT_SOCKET_DIRECTORY).join(DEFAULT_SOCKET_FILE)
}

/// Default pattern file path.
pub fn default_patterns_path() -> Utf8PathBuf {
    Utf8PathBuf::from(DEFAULT_PATTERNS_PATH)
}

/// Owned program name used where allocation is required (e.g. serde).
pub fn default_program() -> String {
    DEFAULT_PROGRAM.to_owned()
}

/// Owned shell name used where allocation is required.
pub fn default_shell() -> String {
    DEFAULT_SHELL.to_owned()
}

/// Default subprocess timeout in seconds.
pub fn default_command_timeout_secs() -> u64 {
    DEFAULT_COMMAND_TIMEOUT_SECS
}

/// Default cap on concurrent subprocesses.
pub fn default_max_concurrent_commands() -> usize {
    DEFAULT_MAX_CONCURRENT_COMMANDS
}

/// Default hand-off queue capacity.
pub fn default_accept_queue_capacity() -> usize {
    DEFAULT_ACCEPT_QUEUE_CAPACITY
}

/// Default log filter expression used by the daemon.
pub fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Owned log filter value used where allocation is required (e.g. serde).
pub fn default_log_filter_string() -> String {
    DEFAULT_LOG_FILTER.to_owned()
}

/// Default logging format for the daemon.
pub fn default_log_format() -> LogFormat {
    LogFormat::Json
}
