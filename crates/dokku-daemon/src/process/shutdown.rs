//! Termination signals and the reasons the daemon stops.

use std::fmt;
use std::io;

use signal_hook::consts::signal::{SIGHUP, SIGINT, SIGQUIT, SIGTERM};
use signal_hook::iterator::Signals;
use thiserror::Error;
use tracing::info;

use super::PROCESS_TARGET;

/// Why the daemon stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownReason {
    /// Interrupted from the terminal (`SIGINT`).
    Interrupted,
    /// Terminated by any other signal.
    Killed,
}

impl ShutdownReason {
    /// Maps a received signal number to a reason.
    #[must_use]
    pub fn from_signal(signal: i32) -> Self {
        if signal == SIGINT {
            Self::Interrupted
        } else {
            Self::Killed
        }
    }
}

impl fmt::Display for ShutdownReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Interrupted => f.write_str("daemon was interrupted by system signal"),
            Self::Killed => f.write_str("daemon was killed"),
        }
    }
}

/// Abstraction over shutdown notification mechanisms.
pub(crate) trait ShutdownSignal: Send {
    /// Blocks until shutdown should proceed.
    fn wait(&mut self) -> Result<ShutdownReason, ShutdownError>;
}

/// Errors reported by shutdown signal listeners.
#[derive(Debug, Error)]
pub enum ShutdownError {
    /// Installing signal handlers failed.
    #[error("failed to install signal handlers: {source}")]
    Install {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}

/// Shutdown listener that waits for termination signals.
///
/// Handlers are registered on construction so a signal arriving while the
/// daemon is still starting up is queued rather than lost.
pub(crate) struct SystemShutdownSignal {
    signals: Signals,
}

impl SystemShutdownSignal {
    pub(crate) fn install() -> Result<Self, ShutdownError> {
        let signals = Signals::new([SIGTERM, SIGINT, SIGQUIT, SIGHUP])
            .map_err(|source| ShutdownError::Install { source })?;
        Ok(Self { signals })
    }
}

impl ShutdownSignal for SystemShutdownSignal {
    fn wait(&mut self) -> Result<ShutdownReason, ShutdownError> {
        let reason = self
            .signals
            .forever()
            .next()
            .map_or(ShutdownReason::Killed, ShutdownReason::from_signal);
        info!(
            target: PROCESS_TARGET,
            %reason,
            "shutdown signal received"
        );
        Ok(reason)
    }
}
