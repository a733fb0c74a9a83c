//! Declarative extraction of structured records from command output.
//!
//! Host tools such as `dokku` print tables and reports meant for humans. This
//! crate turns that text into ordered key/value records using one
//! [`ExtractionPattern`] per command: a number of header lines to skip, an
//! ordered key list, and a regular expression whose capture groups line up
//! with the keys.
//!
//! Patterns are loaded once into an immutable [`PatternRegistry`], which also
//! acts as the allow-list of commands a caller may run. Pattern files are
//! TOML by default; a `.yaml` or `.yml` extension selects YAML.
//!
//! # Example
//!
//! ```
//! use dokku_patterns::PatternRegistry;
//!
//! let registry = PatternRegistry::from_toml_str(
//!     r#"
//! [command.apps]
//! skip_lines = 1
//! keys = ["name", "status"]
//! regex = '(\S+)\s+(\S+)'
//! "#,
//! )?;
//!
//! let records = registry.parse("apps", "NAME STATUS\napp1 running\napp2 stopped\n")?;
//! assert_eq!(records.len(), 2);
//! assert_eq!(records[0].get("name"), Some("app1"));
//! assert_eq!(records[1].get("status"), Some("stopped"));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod error;
mod pattern;
mod record;
mod registry;

pub use error::{ParseError, PatternError, RegistryError};
pub use pattern::{ExtractionPattern, PatternDefinition, parse_definition};
pub use record::Record;
pub use registry::{CommandKind, PatternFile, PatternFormat, PatternRegistry};

#[cfg(test)]
mod tests;
