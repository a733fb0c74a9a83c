//! Structured reporting for daemon lifecycle events.

use std::sync::Arc;

use camino::Utf8Path;

use dokku_config::Config;
use dokku_patterns::PatternRegistry;

use crate::bootstrap::BootstrapError;
use crate::process::ShutdownReason;

pub(crate) const LIFECYCLE_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::lifecycle");

/// Observer trait used to surface lifecycle events to telemetry sinks.
pub trait LifecycleReporter: Send + Sync {
    /// Invoked before configuration loading begins.
    fn bootstrap_starting(&self);

    /// Invoked after bootstrap completes successfully.
    fn bootstrap_succeeded(&self, config: &Config, registry: &PatternRegistry);

    /// Invoked when bootstrap fails.
    fn bootstrap_failed(&self, error: &BootstrapError);

    /// Invoked once the socket accepts connections.
    fn listener_ready(&self, socket: &Utf8Path);

    /// Invoked when a termination signal starts the shutdown sequence.
    fn shutdown_requested(&self, reason: ShutdownReason);
}

impl<T> LifecycleReporter for Arc<T>
where
    T: LifecycleReporter,
{
    fn bootstrap_starting(&self) {
        (**self).bootstrap_starting();
    }

    fn bootstrap_succeeded(&self, config: &Config, registry: &PatternRegistry) {
        (**self).bootstrap_succeeded(config, registry);
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        (**self).bootstrap_failed(error);
    }

    fn listener_ready(&self, socket: &Utf8Path) {
        (**self).listener_ready(socket);
    }

    fn shutdown_requested(&self, reason: ShutdownReason) {
        (**self).shutdown_requested(reason);
    }
}

/// Default reporter that records lifecycle events using `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuredLifecycleReporter;

impl StructuredLifecycleReporter {
    /// Builds a new reporter.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl LifecycleReporter for StructuredLifecycleReporter {
    fn bootstrap_starting(&self) {
        tracing::info!(
            target: LIFECYCLE_TARGET,
            event = "bootstrap_starting",
            "starting daemon bootstrap"
        );
    }

    fn bootstrap_succeeded(&self, config: &Config, registry: &PatternRegistry) {
        tracing::info!(
            target: LIFECYCLE_TARGET,
            event = "bootstrap_succeeded",
            socket = %config.socket_path(),
            patterns = %config.patterns_path(),
            allowed_commands = registry.len(),
            structured_commands = registry.pattern_count(),
            program = config.program(),
            log_format = %config.log_format(),
            "daemon bootstrap completed"
        );
        tracing::debug!(
            target: LIFECYCLE_TARGET,
            commands = ?registry.command_names(),
            "allow-list loaded"
        );
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        tracing::error!(
            target: LIFECYCLE_TARGET,
            event = "bootstrap_failed",
            error = %error,
            "daemon bootstrap failed"
        );
    }

    fn listener_ready(&self, socket: &Utf8Path) {
        tracing::info!(
            target: LIFECYCLE_TARGET,
            event = "listener_ready",
            socket = %socket,
            "daemon accepting connections"
        );
    }

    fn shutdown_requested(&self, reason: ShutdownReason) {
        tracing::info!(
            target: LIFECYCLE_TARGET,
            event = "shutdown_requested",
            reason = %reason,
            "daemon shutting down"
        );
    }
}
