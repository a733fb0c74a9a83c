//! Lifecycle reporter that records events for assertions.

use std::sync::Mutex;

use camino::Utf8Path;

use dokku_config::Config;
use dokku_patterns::PatternRegistry;

use crate::bootstrap::BootstrapError;
use crate::lifecycle::LifecycleReporter;
use crate::process::ShutdownReason;

/// Records lifecycle events for assertions.
#[derive(Default)]
pub struct RecordingLifecycleReporter {
    events: Mutex<Vec<LifecycleEvent>>,
}

impl RecordingLifecycleReporter {
    /// Captures a copy of the recorded events.
    pub fn events(&self) -> Vec<LifecycleEvent> {
        self.events
            .lock()
            .expect("lifecycle reporter mutex poisoned")
            .clone()
    }

    fn record(&self, event: LifecycleEvent) {
        self.events
            .lock()
            .expect("lifecycle reporter mutex poisoned")
            .push(event);
    }
}

impl LifecycleReporter for RecordingLifecycleReporter {
    fn bootstrap_starting(&self) {
        self.record(LifecycleEvent::BootstrapStarting);
    }

    fn bootstrap_succeeded(&self, _config: &Config, registry: &PatternRegistry) {
        self.record(LifecycleEvent::BootstrapSucceeded {
            allowed_commands: registry.len(),
        });
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        self.record(LifecycleEvent::BootstrapFailed(error.to_string()));
    }

    fn listener_ready(&self, _socket: &Utf8Path) {
        self.record(LifecycleEvent::ListenerReady);
    }

    fn shutdown_requested(&self, reason: ShutdownReason) {
        self.record(LifecycleEvent::ShutdownRequested(reason));
    }
}

/// Lifecycle events tracked during scenarios.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// Bootstrap started.
    BootstrapStarting,
    /// Bootstrap completed successfully.
    BootstrapSucceeded {
        /// Commands allowed by the loaded registry.
        allowed_commands: usize,
    },
    /// Bootstrap failed with an error description.
    BootstrapFailed(String),
    /// The listener is accepting connections.
    ListenerReady,
    /// Shutdown began for the given reason.
    ShutdownRequested(ShutdownReason),
}
