//! Shell-backed command execution with a timeout.
//!
//! The child runs in its own process group. The deadline covers both the
//! child's exit and the draining of its output pipes, so a background helper
//! that inherited the pipes cannot hold a request open. When the deadline
//! passes, the whole group is killed.

use std::io::{self, Read};
use std::os::unix::process::CommandExt;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::{Duration, Instant};

use nix::sys::signal::{Signal, killpg};
use nix::unistd::Pid;
use tracing::{debug, warn};

use dokku_config::Config;

use super::{CommandExecutor, CommandLine, EXECUTOR_TARGET, ExecutionError, ExecutionResult};

const POLL_INTERVAL: Duration = Duration::from_millis(20);
// Longer timeouts are clamped so the deadline stays representable.
const MAX_TIMEOUT: Duration = Duration::from_secs(365 * 24 * 60 * 60);

#[derive(Debug, Clone, Copy)]
enum Stream {
    Stdout,
    Stderr,
}

type Chunk = (Stream, io::Result<Vec<u8>>);

#[derive(Debug, Default)]
struct CapturedOutput {
    stdout: Vec<u8>,
    stderr: Vec<u8>,
}

impl CapturedOutput {
    fn store(&mut self, stream: Stream, bytes: Vec<u8>) {
        match stream {
            Stream::Stdout => self.stdout = bytes,
            Stream::Stderr => self.stderr = bytes,
        }
    }
}

/// Runs commands as `<shell> -c 'exec <program> "$@"' <program> <command>
/// <args...>`.
#[derive(Debug, Clone)]
pub struct ShellExecutor {
    shell: String,
    program: String,
    timeout: Duration,
}

impl ShellExecutor {
    /// Creates an executor forwarding every command to `program`.
    #[must_use]
    pub fn new(shell: impl Into<String>, program: impl Into<String>, timeout: Duration) -> Self {
        Self {
            shell: shell.into(),
            program: program.into(),
            timeout,
        }
    }

    /// Creates an executor from the daemon configuration.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.shell(), config.program(), config.command_timeout())
    }

    fn build_command(&self, line: &CommandLine) -> Command {
        let mut command = Command::new(&self.shell);
        command
            .arg("-c")
            .arg(format!("exec {} \"$@\"", shell_quote(&self.program)))
            .arg(&self.program)
            .arg(line.command())
            .args(line.arguments())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .process_group(0);
        command
    }

    fn wait_for_exit(
        &self,
        child: &mut Child,
        deadline: Instant,
        line: &CommandLine,
    ) -> Result<ExitStatus, ExecutionError> {
        loop {
            match child.try_wait() {
                Ok(Some(status)) => return Ok(status),
                Ok(None) if Instant::now() >= deadline => {
                    return Err(self.time_out(child, line));
                }
                Ok(None) => thread::sleep(POLL_INTERVAL),
                Err(source) => {
                    terminate(child);
                    return Err(ExecutionError::Io {
                        command: line.command().to_owned(),
                        source,
                    });
                }
            }
        }
    }

    /// Collects both pipes, giving up once `deadline` passes.
    ///
    /// The pipes close only when every process holding them has exited, so
    /// this also waits for anything the command left running.
    fn drain_output(
        &self,
        child: &mut Child,
        output: &Receiver<Chunk>,
        deadline: Instant,
        line: &CommandLine,
    ) -> Result<CapturedOutput, ExecutionError> {
        let mut captured = CapturedOutput::default();
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match output.recv_timeout(remaining) {
                Ok((stream, Ok(bytes))) => captured.store(stream, bytes),
                Ok((_, Err(source))) => {
                    terminate(child);
                    return Err(ExecutionError::Io {
                        command: line.command().to_owned(),
                        source,
                    });
                }
                Err(RecvTimeoutError::Disconnected) => return Ok(captured),
                Err(RecvTimeoutError::Timeout) => return Err(self.time_out(child, line)),
            }
        }
    }

    fn time_out(&self, child: &mut Child, line: &CommandLine) -> ExecutionError {
        warn!(
            target: EXECUTOR_TARGET,
            command = line.command(),
            timeout_secs = self.timeout.as_secs(),
            "command timed out, killing process group"
        );
        terminate(child);
        ExecutionError::TimedOut {
            command: line.command().to_owned(),
            timeout: self.timeout,
        }
    }
}

impl CommandExecutor for ShellExecutor {
    fn execute(&self, line: &CommandLine) -> Result<ExecutionResult, ExecutionError> {
        debug!(
            target: EXECUTOR_TARGET,
            shell = %self.shell,
            program = %self.program,
            command = line.command(),
            arguments = line.arguments().len(),
            "spawning command"
        );
        let deadline = Instant::now() + self.timeout.min(MAX_TIMEOUT);
        let mut child = self
            .build_command(line)
            .spawn()
            .map_err(|source| ExecutionError::Spawn {
                shell: self.shell.clone(),
                source,
            })?;

        // Both pipes are drained concurrently so a chatty process cannot
        // block on a full pipe while we wait for it.
        let (sender, receiver) = mpsc::channel();
        let readers = spawn_reader(Stream::Stdout, child.stdout.take(), &sender)
            .and_then(|()| spawn_reader(Stream::Stderr, child.stderr.take(), &sender));
        drop(sender);
        if let Err(source) = readers {
            terminate(&mut child);
            return Err(ExecutionError::Io {
                command: line.command().to_owned(),
                source,
            });
        }

        let status = self.wait_for_exit(&mut child, deadline, line)?;
        let output = self.drain_output(&mut child, &receiver, deadline, line)?;

        debug!(
            target: EXECUTOR_TARGET,
            command = line.command(),
            ?status,
            stdout_bytes = output.stdout.len(),
            stderr_bytes = output.stderr.len(),
            "command exited"
        );
        Ok(ExecutionResult::new(
            line.command(),
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr),
            status.code(),
        ))
    }
}

fn spawn_reader<R>(stream: Stream, pipe: Option<R>, sender: &Sender<Chunk>) -> io::Result<()>
where
    R: Read + Send + 'static,
{
    let Some(mut pipe) = pipe else {
        return Ok(());
    };
    let sender = sender.clone();
    thread::Builder::new()
        .name(String::from("dokku-output"))
        .spawn(move || {
            let mut buffer = Vec::new();
            let result = pipe.read_to_end(&mut buffer).map(|_| buffer);
            // The receiver is gone once the run has been abandoned.
            drop(sender.send((stream, result)));
        })
        .map(drop)
}

/// Kills the child's process group and reaps the child.
fn terminate(child: &mut Child) {
    if let Ok(pid) = i32::try_from(child.id())
        && let Err(errno) = killpg(Pid::from_raw(pid), Signal::SIGKILL)
    {
        debug!(
            target: EXECUTOR_TARGET,
            %errno,
            "process group already gone"
        );
    }
    drop(child.kill());
    drop(child.wait());
}

fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}
