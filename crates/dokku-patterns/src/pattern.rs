//! Compiled extraction patterns and the line-matching algorithm.

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{ParseError, PatternError};
use crate::record::Record;

/// Declarative form of a pattern, as written in the pattern file.
///
/// An empty entry in `keys` is a placeholder: the matching capture group is
/// consumed but never surfaced in the records.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct PatternDefinition {
    /// Leading header lines to ignore.
    #[serde(default, alias = "skipLines", alias = "SkipLines")]
    pub skip_lines: usize,
    /// Output keys, paired positionally with the regex capture groups.
    #[serde(alias = "Keys")]
    pub keys: Vec<String>,
    /// Regular expression applied to every candidate line.
    #[serde(alias = "Regex")]
    pub regex: String,
}

impl PatternDefinition {
    /// Builds a definition from its parts.
    #[must_use]
    pub fn new<K, S>(skip_lines: usize, keys: K, regex: impl Into<String>) -> Self
    where
        K: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            skip_lines,
            keys: keys.into_iter().map(Into::into).collect(),
            regex: regex.into(),
        }
    }
}

/// A validated pattern ready to extract records.
///
/// Construction guarantees that the regex compiles and that its capture-group
/// count equals the number of keys, so extraction never indexes out of range.
#[derive(Debug, Clone)]
pub struct ExtractionPattern {
    name: String,
    skip_lines: usize,
    keys: Vec<String>,
    regex: Regex,
}

impl ExtractionPattern {
    /// Compiles and validates `definition` for the command `name`.
    ///
    /// # Errors
    ///
    /// Returns [`PatternError::InvalidRegex`] when the expression does not
    /// compile and [`PatternError::Mismatch`] when the capture-group count
    /// differs from the key count.
    pub fn compile(
        name: impl Into<String>,
        definition: &PatternDefinition,
    ) -> Result<Self, PatternError> {
        let command: String = name.into();
        let regex = match Regex::new(&definition.regex) {
            Ok(regex) => regex,
            Err(source) => return Err(PatternError::InvalidRegex { command, source }),
        };

        // Group 0 is the whole match.
        let groups = regex.captures_len().saturating_sub(1);
        if groups != definition.keys.len() {
            return Err(PatternError::Mismatch {
                command,
                keys: definition.keys.len(),
                groups,
            });
        }

        Ok(Self {
            name: command,
            skip_lines: definition.skip_lines,
            keys: definition.keys.clone(),
            regex,
        })
    }

    /// Command name the pattern is registered under.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of leading lines skipped before extraction.
    #[must_use]
    pub const fn skip_lines(&self) -> usize {
        self.skip_lines
    }

    /// Ordered key list, including empty placeholders.
    #[must_use]
    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    /// Extracts one record per candidate line of `output`.
    ///
    /// The output is split on `\n` and the final piece is treated as the
    /// empty remainder after the trailing terminator, so `L` pieces with
    /// `skip_lines = S` yield `L - S - 1` records (never fewer than zero). A
    /// line the regex does not match yields an empty record in its slot.
    #[must_use]
    pub fn extract(&self, output: &str) -> Vec<Record> {
        let lines: Vec<&str> = output.split('\n').collect();
        let candidates = lines
            .len()
            .saturating_sub(1)
            .saturating_sub(self.skip_lines);

        lines
            .into_iter()
            .skip(self.skip_lines)
            .take(candidates)
            .map(|line| self.extract_line(line.strip_suffix('\r').unwrap_or(line)))
            .collect()
    }

    fn extract_line(&self, line: &str) -> Record {
        let values = self.regex.captures_iter(line).flat_map(|captures| {
            captures
                .iter()
                .skip(1)
                .map(|group| group.map_or("", |matched| matched.as_str()))
                .collect::<Vec<_>>()
        });

        self.keys
            .iter()
            .zip(values)
            .filter(|(key, value)| !key.is_empty() && !value.is_empty())
            .map(|(key, value)| (key.clone(), value.to_owned()))
            .collect()
    }
}

/// Applies an unregistered definition to `output`.
///
/// The definition is compiled on the spot, so malformed definitions surface
/// as a [`ParseError::Pattern`] rather than a panic.
///
/// # Errors
///
/// Returns [`ParseError::Pattern`] when the definition does not compile or
/// its keys and capture groups disagree.
pub fn parse_definition(
    name: &str,
    definition: &PatternDefinition,
    output: &str,
) -> Result<Vec<Record>, ParseError> {
    let pattern = ExtractionPattern::compile(name, definition)?;
    Ok(pattern.extract(output))
}
