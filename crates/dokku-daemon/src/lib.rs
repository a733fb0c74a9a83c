//! Control-plane daemon exposing the `dokku` tool over a Unix socket.
//!
//! Clients connect to the configured socket and write one command line per
//! request, for example `apps:list` or `ps:report app1`. For each line the
//! daemon:
//!
//! 1. checks the command token against the allow-list held by the
//!    [`PatternRegistry`](dokku_patterns::PatternRegistry);
//! 2. runs `dokku <command> <args...>` through a shell, bounded by a timeout
//!    and a cap on concurrent subprocesses;
//! 3. converts the output into records when the command has a registered
//!    pattern, or returns it verbatim otherwise;
//! 4. writes back exactly one newline-terminated JSON document:
//!
//! ```json
//! {"status":"success","output":[{"name":"app1"},{"name":"app2"}]}
//! {"status":"error","output":"Command Not Found"}
//! ```
//!
//! Connections are persistent: a client may send any number of lines and
//! receives the responses in request order. Each connection is served by its
//! own thread; an acceptor thread hands new connections to a dispatcher
//! through a bounded queue so bursts apply backpressure instead of spawning
//! without limit.
//!
//! The daemon runs until it receives `SIGINT`, `SIGTERM`, `SIGQUIT`, or
//! `SIGHUP`. Shutdown stops the listener; connections already being served
//! finish on their own.

mod bootstrap;
mod dispatch;
mod executor;
mod lifecycle;
mod process;
mod telemetry;
mod transport;

pub use bootstrap::{
    BootstrapError, ConfigLoader, Daemon, StaticConfigLoader, SystemConfigLoader, bootstrap_with,
};
pub use executor::{
    CommandExecutor, CommandLine, ExecutionError, ExecutionLimiter, ExecutionPermit,
    ExecutionResult, ShellExecutor, strip_command,
};
pub use lifecycle::{LifecycleReporter, StructuredLifecycleReporter};
pub use process::{LaunchError, ShutdownError, ShutdownReason, run_daemon};
pub use telemetry::TelemetryError;
pub use transport::ListenerError;

#[cfg(test)]
mod tests;
