//! The dialect modes a parser can run in.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

use super::Dialect;

/// Vendor compatibility mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DialectMode {
    /// ANSI SQL plus the common extensions (TOP, LIMIT, NVL, GROUP_CONCAT).
    #[default]
    Standard,
    /// MySQL compatibility.
    MySql,
    /// PostgreSQL compatibility.
    Postgres,
    /// Oracle compatibility.
    Oracle,
    /// DB2 compatibility.
    Db2,
}

impl Dialect for DialectMode {
    fn name(&self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::MySql => "mysql",
            Self::Postgres => "postgres",
            Self::Oracle => "oracle",
            Self::Db2 => "db2",
        }
    }

    fn identifier_quote(&self) -> char {
        match self {
            Self::MySql => '`',
            _ => '"',
        }
    }

    fn supports_limit(&self) -> bool {
        !matches!(self, Self::Oracle)
    }

    fn limit_comma_offset_first(&self) -> bool {
        matches!(self, Self::Standard | Self::MySql)
    }

    fn supports_top(&self) -> bool {
        matches!(self, Self::Standard)
    }

    fn supports_oracle_functions(&self) -> bool {
        matches!(self, Self::Standard | Self::Oracle | Self::Db2)
    }

    fn supports_group_concat(&self) -> bool {
        matches!(self, Self::Standard | Self::MySql)
    }

    fn supports_double_colon_cast(&self) -> bool {
        matches!(self, Self::Postgres)
    }
}

impl fmt::Display for DialectMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DialectMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "standard" => Ok(Self::Standard),
            "mysql" => Ok(Self::MySql),
            "postgres" | "postgresql" => Ok(Self::Postgres),
            "oracle" => Ok(Self::Oracle),
            "db2" => Ok(Self::Db2),
            other => Err(format!("Unknown dialect: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_dialect() {
        let dialect = DialectMode::default();
        assert_eq!(dialect.name(), "standard");
        assert!(dialect.supports_limit());
        assert!(dialect.supports_top());
        assert!(dialect.limit_comma_offset_first());
        assert!(!dialect.supports_double_colon_cast());
    }

    #[test]
    fn test_capabilities_by_mode() {
        assert!(!DialectMode::Oracle.supports_limit());
        assert!(DialectMode::Oracle.supports_oracle_functions());
        assert!(!DialectMode::Postgres.supports_oracle_functions());
        assert!(!DialectMode::Postgres.limit_comma_offset_first());
        assert!(DialectMode::MySql.supports_group_concat());
        assert!(DialectMode::Postgres.supports_double_colon_cast());
    }

    #[test]
    fn test_from_str() {
        assert_eq!("MySQL".parse::<DialectMode>(), Ok(DialectMode::MySql));
        assert_eq!("postgresql".parse::<DialectMode>(), Ok(DialectMode::Postgres));
        assert!("sybase".parse::<DialectMode>().is_err());
    }

    #[test]
    fn test_quote_identifier() {
        assert_eq!(DialectMode::Standard.quote_identifier("ORDERS"), "ORDERS");
        assert_eq!(DialectMode::Standard.quote_identifier("Mixed"), "\"Mixed\"");
        assert_eq!(DialectMode::MySql.quote_identifier("a b"), "`a b`");
        assert_eq!(DialectMode::Standard.quote_identifier("x\"y"), "\"x\"\"y\"");
        assert_eq!(DialectMode::Standard.quote_identifier("SELECT"), "\"SELECT\"");
    }
}
