//! Test helpers for the transport module.

use std::io::{BufRead, BufReader, Write};
use std::os::unix::net::UnixStream;
use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use super::ConnectionHandler;

pub(crate) struct CountingHandler {
    count: Arc<AtomicUsize>,
}

impl CountingHandler {
    pub(crate) fn new() -> (Arc<AtomicUsize>, Arc<Self>) {
        let count = Arc::new(AtomicUsize::new(0));
        let handler = Arc::new(Self {
            count: Arc::clone(&count),
        });
        (count, handler)
    }
}

impl ConnectionHandler for CountingHandler {
    fn handle(&self, _stream: UnixStream) {
        self.count.fetch_add(1, Ordering::SeqCst);
    }
}

/// Replies to every line with the same line.
pub(crate) struct EchoHandler;

impl ConnectionHandler for EchoHandler {
    fn handle(&self, stream: UnixStream) {
        let Ok(mut writer) = stream.try_clone() else {
            return;
        };
        for line in BufReader::new(stream).lines() {
            let Ok(line) = line else {
                return;
            };
            if writeln!(writer, "{line}").is_err() {
                return;
            }
        }
    }
}
