//! Line-oriented request dispatch.
//!
//! Each connection is a sequence of newline-terminated command lines. For
//! every line the handler answers with exactly one JSON document on its own
//! line:
//!
//! ```json
//! {"status":"success","output":[{"name":"app1","status":"running"}]}
//! {"status":"success","output":"dokku version 0.34.4\n"}
//! {"status":"error","output":"Command Not Found"}
//! ```
//!
//! `output` holds records for commands with a registered pattern, the raw
//! standard output for passthrough commands, and a message on failure.

mod errors;
mod handler;
#[cfg(test)]
mod handler_tests;
mod request;
mod response;

pub(crate) use self::handler::DispatchConnectionHandler;
#[cfg(test)]
use self::request::MAX_REQUEST_BYTES;

pub(crate) const DISPATCH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::dispatch");
