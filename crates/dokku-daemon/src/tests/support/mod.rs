//! Test harness utilities shared by the daemon behavioural suites.

mod config_loader;
mod reporter;
mod world;

pub use config_loader::{DaemonSandbox, FailingConfigLoader, TestConfigLoader};
pub use reporter::{LifecycleEvent, RecordingLifecycleReporter};
pub use world::{TestWorld, world};
