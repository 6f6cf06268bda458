//! Token types for the SQL lexer.

use serde::{Deserialize, Serialize};

use super::Span;

/// SQL keywords.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Keyword {
    // Query structure
    Select,
    From,
    Where,
    Group,
    By,
    Having,
    Order,
    Asc,
    Desc,
    Nulls,
    First,
    Last,
    Limit,
    Offset,
    Fetch,
    Next,
    Only,
    Row,
    Rows,
    Top,
    Ties,
    Distinct,
    All,
    As,

    // Joins
    Join,
    Inner,
    Left,
    Right,
    Full,
    Outer,
    Cross,
    Natural,
    On,
    Using,

    // Set operations and named subqueries
    Union,
    Intersect,
    Except,
    Corresponding,
    With,
    Recursive,
    Cycle,
    Search,
    Values,
    Table,

    // Predicates
    And,
    Or,
    Not,
    Is,
    Null,
    True,
    False,
    Unknown,
    Like,
    Escape,
    Between,
    Symmetric,
    Asymmetric,
    In,
    Exists,
    Unique,
    Match,
    Simple,
    Partial,
    Overlaps,
    Any,
    Some,

    // Conditional expressions
    Case,
    When,
    Then,
    Else,
    End,
    Cast,
    Coalesce,
    Nullif,

    // Aggregates and constructors
    Count,
    Sum,
    Avg,
    Min,
    Max,
    Every,
    Array,

    // Datetime
    Interval,
    Year,
    Month,
    Day,
    Hour,
    Minute,
    Second,
    To,
    At,
    Time,
    Zone,
    Local,
    Collate,
    Date,
    Timestamp,

    // Sequences and misc
    Value,
    For,
    Current,
    Separator,
    Default,

    // Data types
    Int,
    Integer,
    Smallint,
    Bigint,
    Real,
    Double,
    Precision,
    Float,
    Decimal,
    Numeric,
    Char,
    Character,
    Varchar,
    Varying,
    Text,
    Clob,
    Blob,
    Boolean,
}

impl Keyword {
    /// Attempts to parse a keyword from a string (case-insensitive).
    #[must_use]
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "SELECT" => Some(Self::Select),
            "FROM" => Some(Self::From),
            "WHERE" => Some(Self::Where),
            "GROUP" => Some(Self::Group),
            "BY" => Some(Self::By),
            "HAVING" => Some(Self::Having),
            "ORDER" => Some(Self::Order),
            "ASC" => Some(Self::Asc),
            "DESC" => Some(Self::Desc),
            "NULLS" => Some(Self::Nulls),
            "FIRST" => Some(Self::First),
            "LAST" => Some(Self::Last),
            "LIMIT" => Some(Self::Limit),
            "OFFSET" => Some(Self::Offset),
            "FETCH" => Some(Self::Fetch),
            "NEXT" => Some(Self::Next),
            "ONLY" => Some(Self::Only),
            "ROW" => Some(Self::Row),
            "ROWS" => Some(Self::Rows),
            "TOP" => Some(Self::Top),
            "TIES" => Some(Self::Ties),
            "DISTINCT" => Some(Self::Distinct),
            "ALL" => Some(Self::All),
            "AS" => Some(Self::As),
            "JOIN" => Some(Self::Join),
            "INNER" => Some(Self::Inner),
            "LEFT" => Some(Self::Left),
            "RIGHT" => Some(Self::Right),
            "FULL" => Some(Self::Full),
            "OUTER" => Some(Self::Outer),
            "CROSS" => Some(Self::Cross),
            "NATURAL" => Some(Self::Natural),
            "ON" => Some(Self::On),
            "USING" => Some(Self::Using),
            "UNION" => Some(Self::Union),
            "INTERSECT" => Some(Self::Intersect),
            "EXCEPT" => Some(Self::Except),
            "CORRESPONDING" => Some(Self::Corresponding),
            "WITH" => Some(Self::With),
            "RECURSIVE" => Some(Self::Recursive),
            "CYCLE" => Some(Self::Cycle),
            "SEARCH" => Some(Self::Search),
            "VALUES" => Some(Self::Values),
            "TABLE" => Some(Self::Table),
            "AND" => Some(Self::And),
            "OR" => Some(Self::Or),
            "NOT" => Some(Self::Not),
            "IS" => Some(Self::Is),
            "NULL" => Some(Self::Null),
            "TRUE" => Some(Self::True),
            "FALSE" => Some(Self::False),
            "UNKNOWN" => Some(Self::Unknown),
            "LIKE" => Some(Self::Like),
            "ESCAPE" => Some(Self::Escape),
            "BETWEEN" => Some(Self::Between),
            "SYMMETRIC" => Some(Self::Symmetric),
            "ASYMMETRIC" => Some(Self::Asymmetric),
            "IN" => Some(Self::In),
            "EXISTS" => Some(Self::Exists),
            "UNIQUE" => Some(Self::Unique),
            "MATCH" => Some(Self::Match),
            "SIMPLE" => Some(Self::Simple),
            "PARTIAL" => Some(Self::Partial),
            "OVERLAPS" => Some(Self::Overlaps),
            "ANY" => Some(Self::Any),
            "SOME" => Some(Self::Some),
            "CASE" => Some(Self::Case),
            "WHEN" => Some(Self::When),
            "THEN" => Some(Self::Then),
            "ELSE" => Some(Self::Else),
            "END" => Some(Self::End),
            "CAST" => Some(Self::Cast),
            "COALESCE" => Some(Self::Coalesce),
            "NULLIF" => Some(Self::Nullif),
            "COUNT" => Some(Self::Count),
            "SUM" => Some(Self::Sum),
            "AVG" => Some(Self::Avg),
            "MIN" => Some(Self::Min),
            "MAX" => Some(Self::Max),
            "EVERY" => Some(Self::Every),
            "ARRAY" => Some(Self::Array),
            "INTERVAL" => Some(Self::Interval),
            "YEAR" => Some(Self::Year),
            "MONTH" => Some(Self::Month),
            "DAY" => Some(Self::Day),
            "HOUR" => Some(Self::Hour),
            "MINUTE" => Some(Self::Minute),
            "SECOND" => Some(Self::Second),
            "TO" => Some(Self::To),
            "AT" => Some(Self::At),
            "TIME" => Some(Self::Time),
            "ZONE" => Some(Self::Zone),
            "LOCAL" => Some(Self::Local),
            "COLLATE" => Some(Self::Collate),
            "VALUE" => Some(Self::Value),
            "FOR" => Some(Self::For),
            "CURRENT" => Some(Self::Current),
            "DATE" => Some(Self::Date),
            "TIMESTAMP" => Some(Self::Timestamp),
            "SEPARATOR" => Some(Self::Separator),
            "DEFAULT" => Some(Self::Default),
            "INT" => Some(Self::Int),
            "INTEGER" => Some(Self::Integer),
            "SMALLINT" => Some(Self::Smallint),
            "BIGINT" => Some(Self::Bigint),
            "REAL" => Some(Self::Real),
            "DOUBLE" => Some(Self::Double),
            "PRECISION" => Some(Self::Precision),
            "FLOAT" => Some(Self::Float),
            "DECIMAL" => Some(Self::Decimal),
            "NUMERIC" => Some(Self::Numeric),
            "CHAR" => Some(Self::Char),
            "CHARACTER" => Some(Self::Character),
            "VARCHAR" => Some(Self::Varchar),
            "VARYING" => Some(Self::Varying),
            "TEXT" => Some(Self::Text),
            "CLOB" => Some(Self::Clob),
            "BLOB" => Some(Self::Blob),
            "BOOLEAN" => Some(Self::Boolean),
            _ => None,
        }
    }

    /// Returns the canonical upper-case spelling of the keyword.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Select => "SELECT",
            Self::From => "FROM",
            Self::Where => "WHERE",
            Self::Group => "GROUP",
            Self::By => "BY",
            Self::Having => "HAVING",
            Self::Order => "ORDER",
            Self::Asc => "ASC",
            Self::Desc => "DESC",
            Self::Nulls => "NULLS",
            Self::First => "FIRST",
            Self::Last => "LAST",
            Self::Limit => "LIMIT",
            Self::Offset => "OFFSET",
            Self::Fetch => "FETCH",
            Self::Next => "NEXT",
            Self::Only => "ONLY",
            Self::Row => "ROW",
            Self::Rows => "ROWS",
            Self::Top => "TOP",
            Self::Ties => "TIES",
            Self::Distinct => "DISTINCT",
            Self::All => "ALL",
            Self::As => "AS",
            Self::Join => "JOIN",
            Self::Inner => "INNER",
            Self::Left => "LEFT",
            Self::Right => "RIGHT",
            Self::Full => "FULL",
            Self::Outer => "OUTER",
            Self::Cross => "CROSS",
            Self::Natural => "NATURAL",
            Self::On => "ON",
            Self::Using => "USING",
            Self::Union => "UNION",
            Self::Intersect => "INTERSECT",
            Self::Except => "EXCEPT",
            Self::Corresponding => "CORRESPONDING",
            Self::With => "WITH",
            Self::Recursive => "RECURSIVE",
            Self::Cycle => "CYCLE",
            Self::Search => "SEARCH",
            Self::Values => "VALUES",
            Self::Table => "TABLE",
            Self::And => "AND",
            Self::Or => "OR",
            Self::Not => "NOT",
            Self::Is => "IS",
            Self::Null => "NULL",
            Self::True => "TRUE",
            Self::False => "FALSE",
            Self::Unknown => "UNKNOWN",
            Self::Like => "LIKE",
            Self::Escape => "ESCAPE",
            Self::Between => "BETWEEN",
            Self::Symmetric => "SYMMETRIC",
            Self::Asymmetric => "ASYMMETRIC",
            Self::In => "IN",
            Self::Exists => "EXISTS",
            Self::Unique => "UNIQUE",
            Self::Match => "MATCH",
            Self::Simple => "SIMPLE",
            Self::Partial => "PARTIAL",
            Self::Overlaps => "OVERLAPS",
            Self::Any => "ANY",
            Self::Some => "SOME",
            Self::Case => "CASE",
            Self::When => "WHEN",
            Self::Then => "THEN",
            Self::Else => "ELSE",
            Self::End => "END",
            Self::Cast => "CAST",
            Self::Coalesce => "COALESCE",
            Self::Nullif => "NULLIF",
            Self::Count => "COUNT",
            Self::Sum => "SUM",
            Self::Avg => "AVG",
            Self::Min => "MIN",
            Self::Max => "MAX",
            Self::Every => "EVERY",
            Self::Array => "ARRAY",
            Self::Interval => "INTERVAL",
            Self::Year => "YEAR",
            Self::Month => "MONTH",
            Self::Day => "DAY",
            Self::Hour => "HOUR",
            Self::Minute => "MINUTE",
            Self::Second => "SECOND",
            Self::To => "TO",
            Self::At => "AT",
            Self::Time => "TIME",
            Self::Zone => "ZONE",
            Self::Local => "LOCAL",
            Self::Collate => "COLLATE",
            Self::Value => "VALUE",
            Self::For => "FOR",
            Self::Current => "CURRENT",
            Self::Date => "DATE",
            Self::Timestamp => "TIMESTAMP",
            Self::Separator => "SEPARATOR",
            Self::Default => "DEFAULT",
            Self::Int => "INT",
            Self::Integer => "INTEGER",
            Self::Smallint => "SMALLINT",
            Self::Bigint => "BIGINT",
            Self::Real => "REAL",
            Self::Double => "DOUBLE",
            Self::Precision => "PRECISION",
            Self::Float => "FLOAT",
            Self::Decimal => "DECIMAL",
            Self::Numeric => "NUMERIC",
            Self::Char => "CHAR",
            Self::Character => "CHARACTER",
            Self::Varchar => "VARCHAR",
            Self::Varying => "VARYING",
            Self::Text => "TEXT",
            Self::Clob => "CLOB",
            Self::Blob => "BLOB",
            Self::Boolean => "BOOLEAN",
        }
    }

    /// Returns true if the keyword can never be used as an identifier.
    ///
    /// Non-reserved keywords (aggregate names, data type names, datetime
    /// fields and the like) double as column or table names.
    #[must_use]
    pub const fn is_reserved(&self) -> bool {
        matches!(
            self,
            Self::Select
                | Self::From
                | Self::Where
                | Self::Group
                | Self::By
                | Self::Having
                | Self::Order
                | Self::Limit
                | Self::Offset
                | Self::Fetch
                | Self::Distinct
                | Self::All
                | Self::As
                | Self::Join
                | Self::Inner
                | Self::Left
                | Self::Right
                | Self::Full
                | Self::Outer
                | Self::Cross
                | Self::Natural
                | Self::On
                | Self::Using
                | Self::Union
                | Self::Intersect
                | Self::Except
                | Self::Corresponding
                | Self::With
                | Self::Recursive
                | Self::Values
                | Self::Table
                | Self::And
                | Self::Or
                | Self::Not
                | Self::Is
                | Self::Null
                | Self::True
                | Self::False
                | Self::Unknown
                | Self::Like
                | Self::Escape
                | Self::Between
                | Self::In
                | Self::Exists
                | Self::Unique
                | Self::Match
                | Self::Overlaps
                | Self::Any
                | Self::Some
                | Self::Case
                | Self::When
                | Self::Then
                | Self::Else
                | Self::End
                | Self::Cast
                | Self::Array
                | Self::Interval
                | Self::To
                | Self::At
                | Self::Collate
                | Self::For
                | Self::Current
                | Self::Default
        )
    }
}
/// The kind of token.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // Literals
    /// Integer literal (e.g., 42)
    Integer(i64),
    /// Approximate numeric literal (e.g., 3.14 or 1e10)
    Float(f64),
    /// Character string literal (e.g., 'hello')
    String(String),
    /// Binary string literal (e.g., X'1234')
    Blob(Vec<u8>),

    // Identifiers and keywords
    /// Regular identifier (e.g., column_name)
    Identifier(String),
    /// Delimited identifier (e.g., "Column Name"); never matched as a keyword
    QuotedIdentifier(String),
    /// SQL keyword
    Keyword(Keyword),

    // Operators
    /// +
    Plus,
    /// -
    Minus,
    /// *
    Star,
    /// /
    Slash,
    /// %
    Percent,
    /// =
    Eq,
    /// != or <>
    NotEq,
    /// <
    Lt,
    /// <=
    LtEq,
    /// >
    Gt,
    /// >=
    GtEq,
    /// ||
    Concat,

    // Delimiters
    /// (
    LeftParen,
    /// )
    RightParen,
    /// [
    LeftBracket,
    /// ]
    RightBracket,
    /// ,
    Comma,
    /// ;
    Semicolon,
    /// .
    Dot,
    /// :
    Colon,
    /// ::
    DoubleColon,
    /// ?
    Question,

    // Special
    /// End of input
    Eof,
    /// Invalid/unknown token
    Error(String),
}

impl TokenKind {
    /// Returns true for tokens that carry a literal value.
    #[must_use]
    pub const fn is_literal(&self) -> bool {
        matches!(
            self,
            Self::Integer(_) | Self::Float(_) | Self::String(_) | Self::Blob(_)
        )
    }

    /// Returns true for tokens usable as a name: identifiers, delimited
    /// identifiers and non-reserved keywords.
    #[must_use]
    pub const fn is_name(&self) -> bool {
        match self {
            Self::Identifier(_) | Self::QuotedIdentifier(_) => true,
            Self::Keyword(kw) => !kw.is_reserved(),
            _ => false,
        }
    }

    /// Returns the name text if the token can be used as a name.
    #[must_use]
    pub fn name_text(&self) -> Option<String> {
        match self {
            Self::Identifier(s) | Self::QuotedIdentifier(s) => Some(s.clone()),
            Self::Keyword(kw) if !kw.is_reserved() => Some(kw.as_str().to_string()),
            _ => None,
        }
    }
}

/// A token with its span in the source code.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    /// The kind of token.
    pub kind: TokenKind,
    /// The location in the source code.
    pub span: Span,
}

impl Token {
    /// Creates a new token.
    #[must_use]
    pub const fn new(kind: TokenKind, span: Span) -> Self {
        Self { kind, span }
    }

    /// Returns true if this is an EOF token.
    #[must_use]
    pub const fn is_eof(&self) -> bool {
        matches!(self.kind, TokenKind::Eof)
    }

    /// Returns the keyword if this is a keyword token.
    #[must_use]
    pub const fn as_keyword(&self) -> Option<Keyword> {
        match &self.kind {
            TokenKind::Keyword(kw) => Some(*kw),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_from_str() {
        assert_eq!(Keyword::from_str("SELECT"), Some(Keyword::Select));
        assert_eq!(Keyword::from_str("corresponding"), Some(Keyword::Corresponding));
        assert_eq!(Keyword::from_str("SeLeCt"), Some(Keyword::Select));
        assert_eq!(Keyword::from_str("not_a_keyword"), None);
    }

    #[test]
    fn test_keyword_round_trip_spelling() {
        for kw in [Keyword::Overlaps, Keyword::Asymmetric, Keyword::Separator] {
            assert_eq!(Keyword::from_str(kw.as_str()), Some(kw));
        }
    }

    #[test]
    fn test_reserved_keywords() {
        assert!(Keyword::Select.is_reserved());
        assert!(Keyword::Union.is_reserved());
        assert!(!Keyword::Count.is_reserved());
        assert!(!Keyword::Date.is_reserved());
        assert!(!Keyword::Top.is_reserved());
    }

    #[test]
    fn test_name_tokens() {
        assert!(TokenKind::Identifier("a".into()).is_name());
        assert!(TokenKind::Keyword(Keyword::Value).is_name());
        assert!(!TokenKind::Keyword(Keyword::From).is_name());
        assert_eq!(
            TokenKind::Keyword(Keyword::Year).name_text().as_deref(),
            Some("YEAR")
        );
    }

    #[test]
    fn test_token_as_keyword() {
        let select = Token::new(TokenKind::Keyword(Keyword::Select), Span::new(0, 6));
        let plus = Token::new(TokenKind::Plus, Span::new(0, 1));
        assert_eq!(select.as_keyword(), Some(Keyword::Select));
        assert_eq!(plus.as_keyword(), None);
        assert!(Token::new(TokenKind::Eof, Span::ZERO).is_eof());
    }
}
