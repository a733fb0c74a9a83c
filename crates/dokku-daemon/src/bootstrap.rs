//! Daemon bootstrap orchestration.

use std::sync::Arc;

use ortho_config::{OrthoConfig, OrthoError};
use thiserror::Error;

use dokku_config::{Config, ConfigError, SocketPreparationError};
use dokku_patterns::{PatternRegistry, RegistryError};

use crate::lifecycle::LifecycleReporter;
use crate::telemetry::{self, TelemetryError};

/// Trait abstracting configuration loading for testability.
pub trait ConfigLoader: Send + Sync {
    /// Loads the daemon configuration.
    fn load(&self) -> Result<Config, Arc<OrthoError>>;
}

/// Loader that delegates to [`Config::load`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemConfigLoader;

impl ConfigLoader for SystemConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Config::load()
    }
}

/// Loader that hands out a pre-built configuration.
#[derive(Debug, Clone)]
pub struct StaticConfigLoader {
    config: Config,
}

impl StaticConfigLoader {
    /// Wraps `config` so it can be passed where a loader is expected.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self { config }
    }
}

impl ConfigLoader for StaticConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Ok(self.config.clone())
    }
}

/// Errors surfaced during bootstrap.
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// Configuration failed to load.
    #[error("failed to load configuration: {source}")]
    Configuration {
        /// Underlying loader error.
        #[source]
        source: Arc<OrthoError>,
    },
    /// Configuration loaded but holds unusable values.
    #[error("invalid configuration: {source}")]
    InvalidConfiguration {
        /// Validation failure.
        #[source]
        source: ConfigError,
    },
    /// Telemetry initialisation failed.
    #[error("failed to initialise telemetry: {source}")]
    Telemetry {
        /// Underlying telemetry error.
        #[source]
        source: TelemetryError,
    },
    /// The pattern file could not be loaded.
    #[error("failed to load command patterns: {source}")]
    Registry {
        /// Underlying registry error.
        #[source]
        source: RegistryError,
    },
    /// Socket preparation failed.
    #[error("failed to prepare daemon socket: {source}")]
    Socket {
        /// Filesystem error reported while preparing the socket directory.
        #[source]
        source: SocketPreparationError,
    },
}

/// Result of a successful bootstrap invocation.
pub struct Daemon {
    config: Config,
    registry: Arc<PatternRegistry>,
    reporter: Arc<dyn LifecycleReporter>,
}

impl Daemon {
    /// Accessor for the resolved configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Shared handle to the loaded pattern registry.
    #[must_use]
    pub fn registry(&self) -> Arc<PatternRegistry> {
        Arc::clone(&self.registry)
    }

    /// Reporter receiving the remaining lifecycle events.
    #[must_use]
    pub fn reporter(&self) -> Arc<dyn LifecycleReporter> {
        Arc::clone(&self.reporter)
    }
}

/// Bootstraps the daemon using the supplied collaborators.
///
/// The sequence loads and validates configuration, installs telemetry, loads
/// the pattern registry, and creates the socket directory. The first failure
/// is reported to `reporter` and returned.
pub fn bootstrap_with(
    loader: &dyn ConfigLoader,
    reporter: Arc<dyn LifecycleReporter>,
) -> Result<Daemon, BootstrapError> {
    reporter.bootstrap_starting();
    match bootstrap_steps(loader) {
        Ok((config, registry)) => {
            reporter.bootstrap_succeeded(&config, &registry);
            Ok(Daemon {
                config,
                registry: Arc::new(registry),
                reporter,
            })
        }
        Err(error) => {
            reporter.bootstrap_failed(&error);
            Err(error)
        }
    }
}

fn bootstrap_steps(
    loader: &dyn ConfigLoader,
) -> Result<(Config, PatternRegistry), BootstrapError> {
    let config = loader
        .load()
        .map_err(|source| BootstrapError::Configuration { source })?;
    config
        .validate()
        .map_err(|source| BootstrapError::InvalidConfiguration { source })?;

    telemetry::initialise(&config).map_err(|source| BootstrapError::Telemetry { source })?;

    let registry = PatternRegistry::load(config.patterns_path())
        .map_err(|source| BootstrapError::Registry { source })?;

    config
        .prepare_socket_directory()
        .map_err(|source| BootstrapError::Socket { source })?;

    Ok((config, registry))
}
