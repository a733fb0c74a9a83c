//! Immutable registry of extraction patterns, doubling as the command
//! allow-list.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ParseError, RegistryError};
use crate::pattern::{ExtractionPattern, PatternDefinition};
use crate::record::Record;

/// On-disk layout of the pattern file.
///
/// ```toml
/// passthrough = ["version"]
///
/// [command."apps:list"]
/// skip_lines = 1
/// keys = ["name"]
/// regex = '^(\S+)$'
/// ```
///
/// The same layout is accepted as YAML, where `commands` may be used in place
/// of `command`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PatternFile {
    /// Commands with a structured output shape.
    #[serde(default, alias = "commands")]
    pub command: BTreeMap<String, PatternDefinition>,
    /// Commands that are allowed but return their raw output.
    #[serde(default)]
    pub passthrough: Vec<String>,
}

/// Serialisation format of a pattern file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternFormat {
    /// TOML, the default.
    Toml,
    /// YAML, chosen by a `.yaml` or `.yml` extension.
    Yaml,
}

impl PatternFormat {
    /// Picks the format from the extension of `path`.
    #[must_use]
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|extension| extension.to_str()) {
            Some("yaml" | "yml") => Self::Yaml,
            _ => Self::Toml,
        }
    }
}

/// How the registry treats an allowed command.
#[derive(Debug, Clone, Copy)]
pub enum CommandKind<'a> {
    /// Output is parsed with the attached pattern.
    Structured(&'a ExtractionPattern),
    /// Output is returned verbatim.
    Passthrough,
}

/// Read-only mapping from command name to [`ExtractionPattern`].
///
/// The registry is built once and never mutated, so it can be shared across
/// threads behind an `Arc` without locking. Every name it knows, with or
/// without a pattern, is an allowed command.
#[derive(Debug, Clone, Default)]
pub struct PatternRegistry {
    patterns: HashMap<String, ExtractionPattern>,
    passthrough: HashSet<String>,
}

impl PatternRegistry {
    /// Loads and validates the pattern file at `path`.
    ///
    /// The format follows [`PatternFormat::from_path`].
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Read`] when the file cannot be read, and any
    /// error produced by the matching `from_*_str` constructor.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, RegistryError> {
        let file_path = path.as_ref();
        let text = fs::read_to_string(file_path).map_err(|source| RegistryError::Read {
            path: file_path.to_path_buf(),
            source,
        })?;
        match PatternFormat::from_path(file_path) {
            PatternFormat::Toml => Self::from_toml_str(&text),
            PatternFormat::Yaml => Self::from_yaml_str(&text),
        }
    }

    /// Decodes and validates a TOML pattern document.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Decode`] for malformed TOML and the errors of
    /// [`PatternRegistry::from_file`] for invalid content.
    pub fn from_toml_str(toml: &str) -> Result<Self, RegistryError> {
        let file: PatternFile = toml::from_str(toml).map_err(|error| RegistryError::Decode {
            message: error.to_string(),
        })?;
        Self::from_file(file)
    }

    /// Decodes and validates a YAML pattern document.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Decode`] for malformed YAML and the errors of
    /// [`PatternRegistry::from_file`] for invalid content.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, RegistryError> {
        let file: PatternFile =
            serde_saphyr::from_str(yaml).map_err(|error| RegistryError::Decode {
                message: error.to_string(),
            })?;
        Self::from_file(file)
    }

    /// Validates a decoded [`PatternFile`].
    ///
    /// # Errors
    ///
    /// Fails fast on the first invalid name, duplicate declaration, invalid
    /// regex, or key/capture-group mismatch.
    pub fn from_file(file: PatternFile) -> Result<Self, RegistryError> {
        let PatternFile {
            command: commands,
            passthrough,
        } = file;

        let mut patterns = HashMap::with_capacity(commands.len());
        for (name, definition) in commands {
            validate_name(&name)?;
            let pattern = ExtractionPattern::compile(name.clone(), &definition)?;
            patterns.insert(name, pattern);
        }

        let mut allowed_raw = HashSet::with_capacity(passthrough.len());
        for name in passthrough {
            validate_name(&name)?;
            if patterns.contains_key(&name) || allowed_raw.contains(&name) {
                return Err(RegistryError::Duplicate { name });
            }
            allowed_raw.insert(name);
        }

        Ok(Self {
            patterns,
            passthrough: allowed_raw,
        })
    }

    /// Looks up the pattern registered for `command`.
    #[must_use]
    pub fn get(&self, command: &str) -> Option<&ExtractionPattern> {
        self.patterns.get(command)
    }

    /// Classifies `command`, or returns `None` when it is not allowed.
    #[must_use]
    pub fn lookup(&self, command: &str) -> Option<CommandKind<'_>> {
        if let Some(pattern) = self.patterns.get(command) {
            return Some(CommandKind::Structured(pattern));
        }
        self.passthrough
            .contains(command)
            .then_some(CommandKind::Passthrough)
    }

    /// Whether `command` may be executed.
    #[must_use]
    pub fn is_allowed(&self, command: &str) -> bool {
        self.lookup(command).is_some()
    }

    /// Parses `output` with the pattern registered for `command`.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::CommandNotFound`] when no pattern is registered,
    /// which includes passthrough commands.
    pub fn parse(&self, command: &str, output: &str) -> Result<Vec<Record>, ParseError> {
        self.get(command)
            .map(|pattern| pattern.extract(output))
            .ok_or_else(|| ParseError::command_not_found(command))
    }

    /// Sorted list of every allowed command name.
    #[must_use]
    pub fn command_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .patterns
            .keys()
            .chain(self.passthrough.iter())
            .map(String::as_str)
            .collect();
        names.sort_unstable();
        names
    }

    /// Number of structured patterns.
    #[must_use]
    pub fn pattern_count(&self) -> usize {
        self.patterns.len()
    }

    /// Number of allowed commands, structured or passthrough.
    #[must_use]
    pub fn len(&self) -> usize {
        self.patterns.len() + self.passthrough.len()
    }

    /// Whether the registry allows no commands at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn validate_name(name: &str) -> Result<(), RegistryError> {
    if name.is_empty() || name.chars().any(char::is_whitespace) {
        return Err(RegistryError::InvalidName {
            name: name.to_owned(),
        });
    }
    Ok(())
}
