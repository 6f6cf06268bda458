//! Parser error types.

use core::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::lexer::{Span, Token, TokenKind};

/// Broad category of a compile failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorKind {
    /// Malformed token in the input.
    Lexical,
    /// Unexpected token where the grammar requires something else.
    Syntax,
    /// Well-formed input that breaks a naming or degree rule.
    Semantic,
    /// A table, sequence, routine or type that the catalog does not know.
    Catalog,
    /// Syntax that is recognized but deliberately not implemented.
    Unsupported,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Lexical => "lexical",
            Self::Syntax => "syntax",
            Self::Semantic => "semantic",
            Self::Catalog => "catalog",
            Self::Unsupported => "unsupported",
        })
    }
}

/// A parse error.
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
#[error("{kind} error: {message} at position {}..{}", .span.start, .span.end)]
pub struct ParseError {
    /// The error category.
    pub kind: ErrorKind,
    /// The error message.
    pub message: String,
    /// The location of the error.
    pub span: Span,
    /// Subquery depth at which the error was raised.
    pub depth: usize,
    /// Expected tokens (if applicable).
    pub expected: Option<String>,
    /// The actual token found.
    pub found: Option<String>,
}

/// Result type used throughout the parser.
pub type ParseResult<T> = Result<T, ParseError>;

impl ParseError {
    /// Creates a new error of the given kind.
    #[must_use]
    pub fn new(kind: ErrorKind, message: impl Into<String>, span: Span) -> Self {
        Self {
            kind,
            message: message.into(),
            span,
            depth: 0,
            expected: None,
            found: None,
        }
    }

    /// Creates a syntax error.
    #[must_use]
    pub fn syntax(message: impl Into<String>, span: Span) -> Self {
        Self::new(ErrorKind::Syntax, message, span)
    }

    /// Creates a semantic error.
    #[must_use]
    pub fn semantic(message: impl Into<String>, span: Span) -> Self {
        Self::new(ErrorKind::Semantic, message, span)
    }

    /// Creates a catalog lookup error.
    #[must_use]
    pub fn catalog(message: impl Into<String>, span: Span) -> Self {
        Self::new(ErrorKind::Catalog, message, span)
    }

    /// Creates an error for recognized but unsupported syntax.
    #[must_use]
    pub fn unsupported(message: impl Into<String>, span: Span) -> Self {
        Self::new(ErrorKind::Unsupported, message, span)
    }

    /// Creates an "unexpected token" error.
    #[must_use]
    pub fn unexpected(expected: impl Into<String>, found: &Token) -> Self {
        let expected: String = expected.into();
        let (kind, message) = match &found.kind {
            TokenKind::Error(msg) => (ErrorKind::Lexical, msg.clone()),
            TokenKind::Eof => (
                ErrorKind::Syntax,
                format!("Unexpected end of input: expected {expected}"),
            ),
            other => (
                ErrorKind::Syntax,
                format!(
                    "Unexpected token: expected {expected}, found {}",
                    describe(other)
                ),
            ),
        };
        Self {
            kind,
            message,
            span: found.span,
            depth: 0,
            expected: Some(expected),
            found: Some(describe(&found.kind)),
        }
    }

    /// Stamps the subquery depth the error was raised at.
    #[must_use]
    pub const fn at_depth(mut self, depth: usize) -> Self {
        self.depth = depth;
        self
    }

    /// Picks the more specific of two failures: the deeper one, or the one
    /// further into the input when both are at the same depth.
    #[must_use]
    pub fn deeper(a: Self, b: Self) -> Self {
        if (b.depth, b.span.start) > (a.depth, a.span.start) {
            b
        } else {
            a
        }
    }
}

/// Human-readable token text for messages.
pub(crate) fn describe(kind: &TokenKind) -> String {
    match kind {
        TokenKind::Integer(n) => n.to_string(),
        TokenKind::Float(f) => f.to_string(),
        TokenKind::String(s) => format!("'{s}'"),
        TokenKind::Blob(_) => String::from("binary literal"),
        TokenKind::Identifier(s) => s.clone(),
        TokenKind::QuotedIdentifier(s) => format!("\"{s}\""),
        TokenKind::Keyword(kw) => kw.as_str().to_string(),
        TokenKind::Eof => String::from("end of input"),
        TokenKind::Error(msg) => msg.clone(),
        other => String::from(symbol(other)),
    }
}

const fn symbol(kind: &TokenKind) -> &'static str {
    match kind {
        TokenKind::Plus => "+",
        TokenKind::Minus => "-",
        TokenKind::Star => "*",
        TokenKind::Slash => "/",
        TokenKind::Percent => "%",
        TokenKind::Eq => "=",
        TokenKind::NotEq => "<>",
        TokenKind::Lt => "<",
        TokenKind::LtEq => "<=",
        TokenKind::Gt => ">",
        TokenKind::GtEq => ">=",
        TokenKind::Concat => "||",
        TokenKind::LeftParen => "(",
        TokenKind::RightParen => ")",
        TokenKind::LeftBracket => "[",
        TokenKind::RightBracket => "]",
        TokenKind::Comma => ",",
        TokenKind::Semicolon => ";",
        TokenKind::Dot => ".",
        TokenKind::Colon => ":",
        TokenKind::DoubleColon => "::",
        TokenKind::Question => "?",
        _ => "token",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Keyword;

    #[test]
    fn test_unexpected_message() {
        let token = Token::new(TokenKind::Keyword(Keyword::From), Span::new(7, 11));
        let err = ParseError::unexpected("expression", &token);
        assert_eq!(err.kind, ErrorKind::Syntax);
        assert_eq!(
            err.message,
            "Unexpected token: expected expression, found FROM"
        );
        assert_eq!(err.found.as_deref(), Some("FROM"));
        assert_eq!(
            err.to_string(),
            "syntax error: Unexpected token: expected expression, found FROM at position 7..11"
        );
    }

    #[test]
    fn test_unexpected_error_token_is_lexical() {
        let token = Token::new(
            TokenKind::Error(String::from("Unterminated string literal")),
            Span::new(0, 4),
        );
        let err = ParseError::unexpected("expression", &token);
        assert_eq!(err.kind, ErrorKind::Lexical);
        assert_eq!(err.message, "Unterminated string literal");
    }

    #[test]
    fn test_deeper_prefers_depth_then_position() {
        let shallow = ParseError::syntax("shallow", Span::new(30, 31)).at_depth(0);
        let deep = ParseError::syntax("deep", Span::new(5, 6)).at_depth(2);
        assert_eq!(ParseError::deeper(shallow.clone(), deep.clone()).message, "deep");
        assert_eq!(ParseError::deeper(deep, shallow).message, "deep");

        let early = ParseError::syntax("early", Span::new(1, 2));
        let late = ParseError::syntax("late", Span::new(9, 10));
        assert_eq!(ParseError::deeper(early, late).message, "late");
    }
}
