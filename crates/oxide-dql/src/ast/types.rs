//! SQL data type definitions.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Datetime fields used by interval types and literals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum IntervalField {
    /// YEAR
    Year,
    /// MONTH
    Month,
    /// DAY
    Day,
    /// HOUR
    Hour,
    /// MINUTE
    Minute,
    /// SECOND
    Second,
}

impl IntervalField {
    /// Returns the SQL spelling.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Year => "YEAR",
            Self::Month => "MONTH",
            Self::Day => "DAY",
            Self::Hour => "HOUR",
            Self::Minute => "MINUTE",
            Self::Second => "SECOND",
        }
    }
}

/// An interval qualifier such as `DAY` or `YEAR TO MONTH`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntervalQualifier {
    /// Leading field.
    pub start: IntervalField,
    /// Trailing field for ranges (`YEAR TO MONTH`).
    pub end: Option<IntervalField>,
}

impl fmt::Display for IntervalQualifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.end {
            Some(end) => write!(f, "{} TO {}", self.start.as_str(), end.as_str()),
            None => f.write_str(self.start.as_str()),
        }
    }
}

/// SQL data types.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataType {
    /// Small integer (2 bytes).
    Smallint,
    /// Integer (4 bytes).
    Integer,
    /// Big integer (8 bytes).
    Bigint,
    /// Real (4-byte float).
    Real,
    /// Double precision (8-byte float).
    Double,
    /// Exact numeric with optional precision and scale.
    Decimal {
        /// Total number of digits.
        precision: Option<u16>,
        /// Number of digits after decimal point.
        scale: Option<u16>,
    },
    /// Fixed-length character string.
    Char(Option<u32>),
    /// Variable-length character string.
    Varchar(Option<u32>),
    /// Character large object.
    Clob,
    /// Binary large object.
    Blob,
    /// Boolean.
    Boolean,
    /// Date.
    Date,
    /// Time, optionally with time zone.
    Time {
        /// WITH TIME ZONE was specified.
        with_time_zone: bool,
    },
    /// Timestamp, optionally with time zone.
    Timestamp {
        /// WITH TIME ZONE was specified.
        with_time_zone: bool,
    },
    /// Interval with its qualifier.
    Interval(IntervalQualifier),
    /// Array of an element type.
    Array(Box<DataType>),
    /// A domain or user-defined type found in the catalog.
    Domain {
        /// Qualified name of the domain.
        name: String,
        /// The type the domain is based on.
        base: Box<DataType>,
    },
    /// Type of a NULL literal before resolution.
    Null,
}

impl DataType {
    /// Returns true for exact and approximate numeric types.
    #[must_use]
    pub fn is_numeric(&self) -> bool {
        match self {
            Self::Smallint
            | Self::Integer
            | Self::Bigint
            | Self::Real
            | Self::Double
            | Self::Decimal { .. } => true,
            Self::Domain { base, .. } => base.is_numeric(),
            _ => false,
        }
    }

    /// Returns the SQL representation of the data type.
    #[must_use]
    pub fn to_sql(&self) -> String {
        match self {
            Self::Smallint => String::from("SMALLINT"),
            Self::Integer => String::from("INTEGER"),
            Self::Bigint => String::from("BIGINT"),
            Self::Real => String::from("REAL"),
            Self::Double => String::from("DOUBLE"),
            Self::Decimal { precision, scale } => match (precision, scale) {
                (Some(p), Some(s)) => format!("DECIMAL({p}, {s})"),
                (Some(p), None) => format!("DECIMAL({p})"),
                _ => String::from("DECIMAL"),
            },
            Self::Char(len) => match len {
                Some(n) => format!("CHAR({n})"),
                None => String::from("CHAR"),
            },
            Self::Varchar(len) => match len {
                Some(n) => format!("VARCHAR({n})"),
                None => String::from("VARCHAR"),
            },
            Self::Clob => String::from("CLOB"),
            Self::Blob => String::from("BLOB"),
            Self::Boolean => String::from("BOOLEAN"),
            Self::Date => String::from("DATE"),
            Self::Time { with_time_zone } => {
                if *with_time_zone {
                    String::from("TIME WITH TIME ZONE")
                } else {
                    String::from("TIME")
                }
            }
            Self::Timestamp { with_time_zone } => {
                if *with_time_zone {
                    String::from("TIMESTAMP WITH TIME ZONE")
                } else {
                    String::from("TIMESTAMP")
                }
            }
            Self::Interval(q) => format!("INTERVAL {q}"),
            Self::Array(element) => format!("{} ARRAY", element.to_sql()),
            Self::Domain { name, .. } => name.clone(),
            Self::Null => String::from("NULL"),
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_sql())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_type_to_sql() {
        assert_eq!(DataType::Integer.to_sql(), "INTEGER");
        assert_eq!(DataType::Varchar(Some(255)).to_sql(), "VARCHAR(255)");
        assert_eq!(
            DataType::Decimal {
                precision: Some(10),
                scale: Some(2)
            }
            .to_sql(),
            "DECIMAL(10, 2)"
        );
        assert_eq!(
            DataType::Array(Box::new(DataType::Integer)).to_sql(),
            "INTEGER ARRAY"
        );
    }

    #[test]
    fn test_interval_qualifier_display() {
        let q = IntervalQualifier {
            start: IntervalField::Year,
            end: Some(IntervalField::Month),
        };
        assert_eq!(DataType::Interval(q).to_string(), "INTERVAL YEAR TO MONTH");
    }

    #[test]
    fn test_domain_numeric_follows_base() {
        let domain = DataType::Domain {
            name: String::from("PUBLIC.MONEY"),
            base: Box::new(DataType::Decimal {
                precision: Some(12),
                scale: Some(2),
            }),
        };
        assert!(domain.is_numeric());
        assert!(!DataType::Date.is_numeric());
    }
}
