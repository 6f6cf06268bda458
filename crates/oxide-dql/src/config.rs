//! Parser configuration.

use serde::{Deserialize, Serialize};

use crate::dialect::DialectMode;

/// Default limit on nested query expressions.
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Settings for one [`Parser`](crate::parser::Parser).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    /// Vendor compatibility mode.
    pub dialect: DialectMode,
    /// Maximum subquery nesting depth. Deeper input is rejected with a
    /// syntax error.
    pub max_depth: usize,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            dialect: DialectMode::Standard,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl ParserConfig {
    /// Returns the configuration with a different dialect.
    #[must_use]
    pub const fn with_dialect(mut self, dialect: DialectMode) -> Self {
        self.dialect = dialect;
        self
    }

    /// Returns the configuration with a different depth limit.
    #[must_use]
    pub const fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ParserConfig::default();
        assert_eq!(config.dialect, DialectMode::Standard);
        assert_eq!(config.max_depth, 64);
    }

    #[test]
    fn test_deserialize_partial() {
        let config: ParserConfig = serde_json::from_str(r#"{"dialect": "oracle"}"#).unwrap();
        assert_eq!(config.dialect, DialectMode::Oracle);
        assert_eq!(config.max_depth, DEFAULT_MAX_DEPTH);
    }

    #[test]
    fn test_builders() {
        let config = ParserConfig::default()
            .with_dialect(DialectMode::MySql)
            .with_max_depth(4);
        assert_eq!(config.dialect, DialectMode::MySql);
        assert_eq!(config.max_depth, 4);
    }
}
