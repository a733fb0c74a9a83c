//! Newline-framed request reading.

use std::io::{BufRead, BufReader, Read};

use super::errors::DispatchError;

/// Maximum size of a single request line in bytes, excluding the newline.
pub(crate) const MAX_REQUEST_BYTES: usize = 64 * 1024;

/// Reads newline-terminated request lines from a connection.
pub(crate) struct RequestReader<R> {
    reader: BufReader<R>,
    max_bytes: usize,
}

impl<R: Read> RequestReader<R> {
    pub(crate) fn new(inner: R) -> Self {
        Self::with_limit(inner, MAX_REQUEST_BYTES)
    }

    pub(crate) fn with_limit(inner: R, max_bytes: usize) -> Self {
        Self {
            reader: BufReader::new(inner),
            max_bytes,
        }
    }

    /// Reads the next request line without its terminator.
    ///
    /// Returns `Ok(None)` once the client has closed the connection. A final
    /// line without a trailing newline is still returned.
    pub(crate) fn next_request(&mut self) -> Result<Option<String>, DispatchError> {
        let mut buffer = Vec::new();
        let limit = u64::try_from(self.max_bytes)
            .unwrap_or(u64::MAX)
            .saturating_add(1);
        let read = (&mut self.reader)
            .take(limit)
            .read_until(b'\n', &mut buffer)?;
        if read == 0 {
            return Ok(None);
        }

        if buffer.last() == Some(&b'\n') {
            buffer.pop();
        } else if buffer.len() > self.max_bytes {
            return Err(DispatchError::request_too_large(self.max_bytes));
        }
        if buffer.last() == Some(&b'\r') {
            buffer.pop();
        }

        String::from_utf8(buffer)
            .map(Some)
            .map_err(|_| DispatchError::InvalidEncoding)
    }
}
