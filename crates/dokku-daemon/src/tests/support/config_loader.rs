//! Configuration loaders backed by a throwaway daemon sandbox.

use std::ffi::OsString;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::sync::Arc;

use camino::{Utf8Path, Utf8PathBuf};
use ortho_config::{OrthoConfig, OrthoError};
use tempfile::TempDir;

use dokku_config::Config;

use crate::bootstrap::ConfigLoader;

/// Patterns installed in every sandbox.
pub const SANDBOX_PATTERNS: &str = r#"
passthrough = ["version", "apps:info", "ps:rebuild"]

[command."apps:list"]
skip_lines = 1
keys = ["name"]
regex = '^(\S+)$'

[command."ps:report"]
keys = ["process", "status"]
regex = '^(\S+)\s+(\S+)$'
"#;

/// Stand-in for the host tool, driven by the first positional argument.
const FAKE_PROGRAM: &str = r#"#!/bin/sh
command="$1"
shift
case "$command" in
  apps:list) printf '=====> My Apps\napp1\napp2\n' ;;
  ps:report) printf 'web.1 running\nworker.1 crashed\n' ;;
  version) printf 'dokku version 0.34.4\n' ;;
  apps:info) printf 'App %s does not exist\n' "$1" >&2; exit 1 ;;
  ps:rebuild) exec sleep 30 ;;
  *) printf 'unexpected command %s\n' "$command" >&2; exit 20 ;;
esac
"#;

/// Temporary directory holding a socket path, pattern file, and fake tool.
pub struct DaemonSandbox {
    dir: TempDir,
}

impl DaemonSandbox {
    /// Creates the sandbox and writes its fixtures.
    pub fn new() -> Self {
        let dir = TempDir::new().expect("failed to create sandbox directory");
        let sandbox = Self { dir };
        fs::write(sandbox.patterns_path(), SANDBOX_PATTERNS).expect("write pattern file");
        let program = sandbox.program_path();
        fs::write(&program, FAKE_PROGRAM).expect("write fake program");
        fs::set_permissions(&program, fs::Permissions::from_mode(0o755))
            .expect("make fake program executable");
        sandbox
    }

    fn root(&self) -> &Utf8Path {
        Utf8Path::from_path(self.dir.path()).expect("sandbox path was not valid UTF-8")
    }

    /// Socket path inside a not-yet-created run directory.
    pub fn socket_path(&self) -> Utf8PathBuf {
        self.root().join("run/dokku-daemon.sock")
    }

    /// Location of the sandbox pattern file.
    pub fn patterns_path(&self) -> Utf8PathBuf {
        self.root().join("commands.toml")
    }

    /// Location of the fake host tool.
    pub fn program_path(&self) -> Utf8PathBuf {
        self.root().join("fake-dokku")
    }

    /// Configuration pointing every path into the sandbox.
    pub fn config(&self) -> Config {
        Config {
            socket_path: self.socket_path(),
            patterns_path: self.patterns_path(),
            program: self.program_path().into_string(),
            shell: String::from("sh"),
            command_timeout_secs: 1,
            max_concurrent_commands: 4,
            accept_queue_capacity: 8,
            ..Config::default()
        }
    }
}

/// Loader that provisions a fresh [`DaemonSandbox`].
#[derive(Clone)]
pub struct TestConfigLoader {
    sandbox: Arc<DaemonSandbox>,
}

impl TestConfigLoader {
    #[must_use]
    pub fn new() -> Self {
        Self {
            sandbox: Arc::new(DaemonSandbox::new()),
        }
    }

    /// Sandbox backing this loader.
    pub fn sandbox(&self) -> &DaemonSandbox {
        &self.sandbox
    }
}

impl ConfigLoader for TestConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Ok(self.sandbox.config())
    }
}

/// Loader that intentionally fails by passing invalid CLI arguments.
pub struct FailingConfigLoader;

impl ConfigLoader for FailingConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        let args = vec![
            OsString::from("dokku-daemon"),
            OsString::from("--log-format"),
            OsString::from("yaml"),
        ];
        Config::load_from_iter(args)
    }
}
