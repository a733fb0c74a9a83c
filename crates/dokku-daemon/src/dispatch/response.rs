//! Response serialization for the dispatch loop.

use std::io::Write;

use serde::Serialize;

use dokku_patterns::Record;

use super::errors::DispatchError;

/// Outcome flag of a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum ResponseStatus {
    Success,
    Error,
}

/// Payload of a response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub(crate) enum ResponseOutput {
    /// Raw text: passthrough output or an error message.
    Text(String),
    /// Records extracted by a pattern.
    Records(Vec<Record>),
}

/// One reply, serialized as a single JSON line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct Response {
    status: ResponseStatus,
    output: ResponseOutput,
}

impl Response {
    pub(crate) fn success(output: ResponseOutput) -> Self {
        Self {
            status: ResponseStatus::Success,
            output,
        }
    }

    pub(crate) fn error(message: impl Into<String>) -> Self {
        Self {
            status: ResponseStatus::Error,
            output: ResponseOutput::Text(message.into()),
        }
    }

    pub(crate) fn from_error(error: &DispatchError) -> Self {
        Self::error(error.client_message())
    }

    pub(crate) fn status(&self) -> ResponseStatus {
        self.status
    }
}

/// Writer that frames responses as JSON lines.
pub(crate) struct ResponseWriter<W> {
    writer: W,
}

impl<W: Write> ResponseWriter<W> {
    pub(crate) fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Writes `response` followed by a newline and flushes the stream.
    pub(crate) fn write_response(&mut self, response: &Response) -> Result<(), DispatchError> {
        serde_json::to_writer(&mut self.writer, response)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        Ok(())
    }
}
