//! Unit and behavioural tests for `dokku_patterns`.
