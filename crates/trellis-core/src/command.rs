//! Compiled commands and the dialects they are written in.

use crate::error::CommandError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Native query language a [`Command`] is written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Dialect {
    #[serde(rename = "cypher")]
    Cypher,
    #[serde(rename = "gremlin")]
    Gremlin,
    #[serde(rename = "orientdb-sql")]
    OrientSql,
}

impl Dialect {
    /// Every dialect this crate can compile to
    pub const ALL: [Dialect; 3] = [Dialect::Cypher, Dialect::Gremlin, Dialect::OrientSql];

    /// Stable identifier used to tag commands
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Cypher => "cypher",
            Self::Gremlin => "gremlin",
            Self::OrientSql => "orientdb-sql",
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Dialect {
    type Err = CommandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|d| d.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| CommandError::not_supported(format!("unknown dialect '{}'", s)))
    }
}

/// A compiled script together with the dialect it targets.
///
/// Commands are produced once by a processor and never mutated; the driver
/// only inspects the dialect tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Command {
    script: String,
    dialect: Dialect,
}

impl Command {
    pub fn new(script: impl Into<String>, dialect: Dialect) -> Self {
        Self {
            script: script.into(),
            dialect,
        }
    }

    pub fn script(&self) -> &str {
        &self.script
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Consume the command, returning the script text
    pub fn into_script(self) -> String {
        self.script
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.script)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dialect_from_str() {
        assert_eq!("cypher".parse::<Dialect>().unwrap(), Dialect::Cypher);
        assert_eq!(" Gremlin ".parse::<Dialect>().unwrap(), Dialect::Gremlin);
        assert_eq!(
            "orientdb-sql".parse::<Dialect>().unwrap(),
            Dialect::OrientSql
        );
    }

    #[test]
    fn test_dialect_from_str_unknown() {
        let err = "sparql".parse::<Dialect>().unwrap_err();
        assert!(err.is_not_supported());
    }

    #[test]
    fn test_command_accessors() {
        let command = Command::new("MATCH (a) RETURN a", Dialect::Cypher);

        assert_eq!(command.script(), "MATCH (a) RETURN a");
        assert_eq!(command.dialect(), Dialect::Cypher);
        assert_eq!(command.to_string(), "MATCH (a) RETURN a");
    }
}
