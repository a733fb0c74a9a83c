//! Connection handling abstraction for the daemon listener.

use std::os::unix::net::UnixStream;

/// Handles accepted socket connections.
pub(crate) trait ConnectionHandler: Send + Sync + 'static {
    /// Serves a single connection until the client disconnects.
    /// Implementations should avoid panicking.
    fn handle(&self, stream: UnixStream);
}
