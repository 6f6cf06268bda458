//! SQL Dialect support.
//!
//! Vendor syntax flavours are configuration points, not separate grammars.
//! The parser asks a [`Dialect`] whether a construct is available and the
//! answer comes from a [`DialectMode`].

mod mode;

pub use mode::DialectMode;

use crate::lexer::Keyword;

/// Trait for SQL dialect-specific behavior.
pub trait Dialect {
    /// Returns the name of the dialect.
    fn name(&self) -> &'static str;

    /// Returns the identifier quote character.
    fn identifier_quote(&self) -> char {
        '"'
    }

    /// Whether `LIMIT n [OFFSET m]` is accepted.
    fn supports_limit(&self) -> bool {
        true
    }

    /// Whether `LIMIT m, n` is accepted, reading the first number as the
    /// offset.
    fn limit_comma_offset_first(&self) -> bool {
        false
    }

    /// Whether the `SELECT TOP n` prefix is accepted.
    fn supports_top(&self) -> bool {
        false
    }

    /// Whether `NVL`, `NVL2` and `DECODE` are recognized.
    fn supports_oracle_functions(&self) -> bool {
        false
    }

    /// Whether `GROUP_CONCAT` is recognized.
    fn supports_group_concat(&self) -> bool {
        false
    }

    /// Whether `expr::type` casts are accepted.
    fn supports_double_colon_cast(&self) -> bool {
        false
    }

    /// Quotes an identifier if necessary.
    fn quote_identifier(&self, name: &str) -> String {
        let plain = name
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_uppercase() || c == '_')
            && name
                .chars()
                .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_' || c == '$')
            && !Keyword::from_str(name).is_some_and(|kw| kw.is_reserved());
        if plain {
            name.to_string()
        } else {
            let quote = self.identifier_quote();
            let doubled = format!("{quote}{quote}");
            format!("{quote}{}{quote}", name.replace(quote, &doubled))
        }
    }
}
