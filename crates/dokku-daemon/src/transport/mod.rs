//! Unix socket listener for the daemon.
//!
//! An acceptor thread polls the non-blocking listener and pushes each new
//! connection into a bounded queue. A dispatcher thread drains the queue and
//! gives every connection its own handler thread. When the queue is full the
//! acceptor stops accepting until the dispatcher catches up, so clients wait
//! in the kernel backlog instead of piling up in memory.

mod errors;
mod handler;
mod listener;
#[cfg(test)]
mod test_utils;

pub use self::errors::ListenerError;
pub(crate) use self::handler::ConnectionHandler;
pub(crate) use self::listener::{ListenerHandle, SocketListener};
#[cfg(test)]
pub(crate) use self::test_utils::{CountingHandler, EchoHandler};

const LISTENER_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::transport");
