//! Entry point for the `dokku-daemon` binary.

use std::io::{self, Write};
use std::process::ExitCode;

fn main() -> ExitCode {
    match dokku_daemon::run_daemon() {
        Ok(reason) => {
            let mut stdout = io::stdout().lock();
            drop(writeln!(stdout, "{reason}"));
            ExitCode::SUCCESS
        }
        Err(error) => {
            tracing::error!(target: "dokku-daemon::process", %error, "daemon failed");
            let mut stderr = io::stderr().lock();
            drop(writeln!(stderr, "dokku-daemon: {error}"));
            ExitCode::FAILURE
        }
    }
}
