//! Splitting a request line into a command token and its arguments.

use std::fmt;

/// A request line split into the command token and its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    command: String,
    arguments: Vec<String>,
}

impl CommandLine {
    /// Builds a command line from already separated parts.
    #[must_use]
    pub fn new<I, S>(command: &str, arguments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            command: strip_command(command).to_owned(),
            arguments: arguments.into_iter().map(Into::into).collect(),
        }
    }

    /// Splits `line` on whitespace.
    ///
    /// Returns `None` for a line with no command token. Arguments are taken
    /// verbatim; no shell quoting is interpreted.
    #[must_use]
    pub fn parse(line: &str) -> Option<Self> {
        let mut tokens = line.split_whitespace();
        let command = tokens.next()?;
        Some(Self::new(command, tokens))
    }

    /// The command token, e.g. `apps:list`.
    #[must_use]
    pub fn command(&self) -> &str {
        &self.command
    }

    /// Arguments following the command token.
    #[must_use]
    pub fn arguments(&self) -> &[String] {
        &self.arguments
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.command)?;
        for argument in &self.arguments {
            write!(f, " {argument}")?;
        }
        Ok(())
    }
}

/// Removes surrounding whitespace and line terminators from a command token.
///
/// Stripping is idempotent: `strip_command(strip_command(t)) ==
/// strip_command(t)`.
#[must_use]
pub fn strip_command(token: &str) -> &str {
    token.trim()
}
