//! Connection handler that runs allow-listed commands.

use std::io::{Read, Write};
use std::os::unix::net::UnixStream;
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, warn};

use dokku_patterns::{CommandKind, PatternRegistry};

use crate::executor::{CommandExecutor, CommandLine, ExecutionLimiter};
use crate::transport::ConnectionHandler;

use super::errors::DispatchError;
use super::request::RequestReader;
use super::response::{Response, ResponseOutput, ResponseWriter};
use super::DISPATCH_TARGET;

/// Serves one connection at a time, many requests per connection.
///
/// The registry decides which command tokens may run and how their output is
/// shaped; the executor runs them; the limiter caps how many run at once
/// across all connections.
pub(crate) struct DispatchConnectionHandler {
    registry: Arc<PatternRegistry>,
    executor: Arc<dyn CommandExecutor>,
    limiter: ExecutionLimiter,
}

impl DispatchConnectionHandler {
    pub(crate) fn new(
        registry: Arc<PatternRegistry>,
        executor: Arc<dyn CommandExecutor>,
        limiter: ExecutionLimiter,
    ) -> Self {
        Self {
            registry,
            executor,
            limiter,
        }
    }

    /// Answers requests from `reader` on `writer` until the client leaves.
    pub(crate) fn serve<R, W>(&self, reader: R, writer: W)
    where
        R: Read,
        W: Write,
    {
        let mut requests = RequestReader::new(reader);
        let mut responses = ResponseWriter::new(writer);
        loop {
            let (response, keep_open) = match requests.next_request() {
                Ok(Some(line)) => (self.respond(&line), true),
                Ok(None) => {
                    debug!(target: DISPATCH_TARGET, "client disconnected");
                    return;
                }
                Err(error) => {
                    warn!(target: DISPATCH_TARGET, %error, "failed to read request");
                    (Response::from_error(&error), error.is_recoverable())
                }
            };

            if let Err(error) = responses.write_response(&response) {
                warn!(target: DISPATCH_TARGET, %error, "failed to write response");
                return;
            }
            if !keep_open {
                return;
            }
        }
    }

    /// Builds the single response owed for `line`.
    pub(crate) fn respond(&self, line: &str) -> Response {
        match self.run(line) {
            Ok(output) => Response::success(output),
            Err(error) => {
                debug!(target: DISPATCH_TARGET, %error, "request failed");
                Response::from_error(&error)
            }
        }
    }

    fn run(&self, line: &str) -> Result<ResponseOutput, DispatchError> {
        let command_line = CommandLine::parse(line).ok_or(DispatchError::EmptyCommand)?;
        let command = command_line.command();
        let Some(kind) = self.registry.lookup(command) else {
            info!(
                target: DISPATCH_TARGET,
                command,
                "rejected command outside the allow-list"
            );
            return Err(DispatchError::command_not_found(command));
        };

        let started = Instant::now();
        let outcome = {
            let _permit = self.limiter.acquire();
            self.executor.execute(&command_line)
        };
        let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        match &outcome {
            Ok(result) => info!(
                target: DISPATCH_TARGET,
                command,
                arguments = command_line.arguments().len(),
                elapsed_ms,
                exit_code = ?result.exit_code(),
                stdout_bytes = result.stdout().len(),
                stderr_bytes = result.stderr().len(),
                "command finished"
            ),
            Err(error) => info!(
                target: DISPATCH_TARGET,
                command,
                arguments = command_line.arguments().len(),
                elapsed_ms,
                %error,
                "command did not finish"
            ),
        }

        let stdout = outcome?.into_stdout()?;
        Ok(match kind {
            CommandKind::Structured(pattern) => ResponseOutput::Records(pattern.extract(&stdout)),
            CommandKind::Passthrough => ResponseOutput::Text(stdout),
        })
    }
}

impl ConnectionHandler for DispatchConnectionHandler {
    fn handle(&self, stream: UnixStream) {
        let reader = match stream.try_clone() {
            Ok(reader) => reader,
            Err(error) => {
                warn!(target: DISPATCH_TARGET, %error, "failed to clone connection");
                return;
            }
        };
        self.serve(reader, stream);
    }
}
