//! Test suites for the Dokku daemon.

mod support;
