//! Supervises daemon launch sequencing and runtime orchestration.

use std::sync::Arc;

use tracing::info;

use crate::bootstrap::{ConfigLoader, SystemConfigLoader, bootstrap_with};
use crate::dispatch::DispatchConnectionHandler;
use crate::executor::{CommandExecutor, ExecutionLimiter, ShellExecutor};
use crate::lifecycle::{LifecycleReporter, StructuredLifecycleReporter};
use crate::transport::SocketListener;

use super::PROCESS_TARGET;
use super::errors::LaunchError;
use super::shutdown::{ShutdownReason, ShutdownSignal, SystemShutdownSignal};

/// Collaborators required to launch the daemon runtime.
pub(crate) struct LaunchPlan<L, S> {
    pub(crate) loader: L,
    pub(crate) reporter: Arc<dyn LifecycleReporter>,
    pub(crate) shutdown: S,
    /// Replaces the shell executor built from configuration.
    pub(crate) executor: Option<Arc<dyn CommandExecutor>>,
}

/// Runs the daemon using the production collaborators.
///
/// Blocks until a termination signal arrives and reports which kind it was.
pub fn run_daemon() -> Result<ShutdownReason, LaunchError> {
    let shutdown = SystemShutdownSignal::install()?;
    let plan = LaunchPlan {
        loader: SystemConfigLoader,
        reporter: Arc::new(StructuredLifecycleReporter::new()),
        shutdown,
        executor: None,
    };
    run_daemon_with(plan)
}

/// Runs the daemon with injected collaborators.
pub(crate) fn run_daemon_with<L, S>(plan: LaunchPlan<L, S>) -> Result<ShutdownReason, LaunchError>
where
    L: ConfigLoader,
    S: ShutdownSignal,
{
    let LaunchPlan {
        loader,
        reporter,
        mut shutdown,
        executor,
    } = plan;

    let daemon = bootstrap_with(&loader, reporter)?;
    let reporter = daemon.reporter();
    let config = daemon.config();
    let listener = SocketListener::bind(config.socket_path())?;

    let executor = executor.unwrap_or_else(|| {
        Arc::new(ShellExecutor::from_config(config)) as Arc<dyn CommandExecutor>
    });
    let handler = Arc::new(DispatchConnectionHandler::new(
        daemon.registry(),
        executor,
        ExecutionLimiter::new(config.max_concurrent_commands()),
    ));
    let listener_handle = listener.start(handler, config.accept_queue_capacity())?;
    reporter.listener_ready(config.socket_path());

    let reason = shutdown.wait();
    if let Ok(reason) = &reason {
        reporter.shutdown_requested(*reason);
    }
    listener_handle.shutdown();
    listener_handle.join()?;
    info!(
        target: PROCESS_TARGET,
        "shutdown sequence completed"
    );
    reason.map_err(LaunchError::from)
}
