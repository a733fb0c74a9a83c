//! Bootstrap scenario world.

use std::cell::RefCell;
use std::fs;
use std::sync::Arc;

use crate::bootstrap::{BootstrapError, ConfigLoader, Daemon, bootstrap_with};

use super::config_loader::{FailingConfigLoader, TestConfigLoader};
use super::reporter::RecordingLifecycleReporter;

/// Scenario world shared across bootstrap steps.
pub struct TestWorld {
    sandbox_loader: TestConfigLoader,
    loader: Box<dyn ConfigLoader>,
    pub reporter: Arc<RecordingLifecycleReporter>,
    daemon: Option<Daemon>,
    bootstrap_error: Option<BootstrapError>,
}

impl TestWorld {
    /// Builds a world with a successful configuration loader.
    pub fn new() -> Self {
        let sandbox_loader = TestConfigLoader::new();
        Self {
            loader: Box::new(sandbox_loader.clone()),
            sandbox_loader,
            reporter: Arc::new(RecordingLifecycleReporter::default()),
            daemon: None,
            bootstrap_error: None,
        }
    }

    /// Installs a loader that always fails.
    pub fn use_failing_loader(&mut self) {
        self.loader = Box::new(FailingConfigLoader);
        self.reset_results();
    }

    /// Installs a loader that succeeds.
    pub fn use_successful_loader(&mut self) {
        self.loader = Box::new(self.sandbox_loader.clone());
        self.reset_results();
    }

    /// Overwrites the sandbox pattern file.
    pub fn write_patterns(&self, contents: &str) {
        let path = self.sandbox_loader.sandbox().patterns_path();
        fs::write(path, contents).expect("rewrite pattern file");
    }

    /// Deletes the sandbox pattern file.
    pub fn remove_patterns(&self) {
        let path = self.sandbox_loader.sandbox().patterns_path();
        fs::remove_file(path).expect("remove pattern file");
    }

    /// Runs the bootstrap sequence once.
    pub fn bootstrap(&mut self) {
        if self.daemon.is_some() || self.bootstrap_error.is_some() {
            return;
        }

        match bootstrap_with(&*self.loader, self.reporter.clone()) {
            Ok(daemon) => self.daemon = Some(daemon),
            Err(error) => self.bootstrap_error = Some(error),
        }
    }

    /// Returns the bootstrap error, if any.
    pub fn bootstrap_error(&self) -> Option<&BootstrapError> {
        self.bootstrap_error.as_ref()
    }

    /// Returns the bootstrapped daemon, if any.
    pub fn daemon(&self) -> Option<&Daemon> {
        self.daemon.as_ref()
    }

    /// Whether the socket directory exists on disk.
    pub fn socket_directory_exists(&self) -> bool {
        self.sandbox_loader
            .sandbox()
            .socket_path()
            .parent()
            .is_some_and(|parent| parent.is_dir())
    }

    fn reset_results(&mut self) {
        self.daemon = None;
        self.bootstrap_error = None;
    }
}

impl Default for TestWorld {
    fn default() -> Self {
        Self::new()
    }
}

/// Default test world fixture.
pub fn world() -> RefCell<TestWorld> {
    RefCell::new(TestWorld::new())
}
