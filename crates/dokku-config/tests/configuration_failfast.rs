//! Malformed configuration sources must surface errors rather than defaults.

use std::ffi::{OsStr, OsString};
use std::fs;
use std::sync::{Mutex, MutexGuard, PoisonError};

use once_cell::sync::Lazy;
use ortho_config::OrthoConfig;
use tempfile::TempDir;

use dokku_config::Config;

static ENV_MUTEX: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

struct EnvOverride {
    key: &'static str,
    previous: Option<OsString>,
    guard: Option<MutexGuard<'static, ()>>,
}

impl EnvOverride {
    fn set_var(key: &'static str, value: &OsStr) -> Self {
        let guard = ENV_MUTEX.lock().unwrap_or_else(PoisonError::into_inner);
        let previous = std::env::var_os(key);
        unsafe { std::env::set_var(key, value) };
        Self {
            key,
            previous,
            guard: Some(guard),
        }
    }
}

impl Drop for EnvOverride {
    fn drop(&mut self) {
        match self.previous.take() {
            Some(value) => unsafe { std::env::set_var(self.key, value) },
            None => unsafe { std::env::remove_var(self.key) },
        }
        drop(self.guard.take());
    }
}

#[test]
fn malformed_config_file_is_reported() {
    let temp_dir = TempDir::new().expect("create temp dir");
    let path = temp_dir.path().join("dokku-daemon.toml");
    fs::write(&path, "command_timeout_secs = \"soon\"\n").expect("write malformed config");

    let args = vec![
        OsString::from("dokku-daemon"),
        OsString::from("--config-path"),
        path.into_os_string(),
    ];

    let error = Config::load_from_iter(args).expect_err("loading must fail");
    assert!(
        !error.to_string().is_empty(),
        "error should describe the malformed file"
    );
}

#[test]
fn malformed_environment_value_is_reported() {
    let _env = EnvOverride::set_var(
        "DOKKU_DAEMON_MAX_CONCURRENT_COMMANDS",
        OsStr::new("plenty"),
    );

    let args = vec![OsString::from("dokku-daemon")];
    assert!(
        Config::load_from_iter(args).is_err(),
        "non-numeric concurrency must not fall back to the default"
    );
}

#[test]
fn unknown_log_format_flag_is_rejected() {
    let args = vec![
        OsString::from("dokku-daemon"),
        OsString::from("--log-format"),
        OsString::from("pretty"),
    ];
    assert!(Config::load_from_iter(args).is_err());
}
