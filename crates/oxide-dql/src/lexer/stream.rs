//! Rewindable token cursor.

use super::{Lexer, Span, Token, TokenKind};

/// The fully tokenized statement plus a cursor into it.
///
/// Tokens are immutable once produced. The cursor can be reset to any
/// position previously returned by [`TokenStream::position`], which is what
/// makes speculative parsing non-destructive.
#[derive(Debug, Clone)]
pub struct TokenStream {
    tokens: Vec<Token>,
    pos: usize,
}

impl TokenStream {
    /// Tokenizes `input` and positions the cursor on the first token.
    #[must_use]
    pub fn new(input: &str) -> Self {
        Self::from_tokens(Lexer::new(input).tokenize())
    }

    /// Wraps an already tokenized statement. A trailing `Eof` is appended
    /// when missing.
    #[must_use]
    pub fn from_tokens(mut tokens: Vec<Token>) -> Self {
        if !tokens.last().is_some_and(Token::is_eof) {
            let end = tokens.last().map_or(0, |t| t.span.end);
            tokens.push(Token::new(TokenKind::Eof, Span::new(end, end)));
        }
        Self { tokens, pos: 0 }
    }

    /// Returns the current cursor position.
    #[must_use]
    pub const fn position(&self) -> usize {
        self.pos
    }

    /// Moves the cursor back (or forward) to `position`.
    ///
    /// Positions past the end are clamped to the `Eof` token.
    pub fn reset(&mut self, position: usize) {
        self.pos = position.min(self.tokens.len() - 1);
    }

    /// Returns the current token.
    #[must_use]
    pub fn current(&self) -> &Token {
        &self.tokens[self.pos]
    }

    /// Returns the kind of the current token.
    #[must_use]
    pub fn peek(&self) -> &TokenKind {
        &self.current().kind
    }

    /// Returns the kind of the token `n` positions ahead of the cursor.
    #[must_use]
    pub fn peek_nth(&self, n: usize) -> &TokenKind {
        self.tokens
            .get(self.pos + n)
            .map_or(&TokenKind::Eof, |t| &t.kind)
    }

    /// Returns the token just before the cursor.
    #[must_use]
    pub fn previous(&self) -> Option<&Token> {
        self.pos.checked_sub(1).and_then(|p| self.tokens.get(p))
    }

    /// Consumes the current token and returns it. The cursor never moves
    /// past `Eof`.
    pub fn advance(&mut self) -> Token {
        let token = self.tokens[self.pos].clone();
        if !token.is_eof() {
            self.pos += 1;
        }
        token
    }

    /// Returns the first lexical error token, if any.
    #[must_use]
    pub fn first_error(&self) -> Option<&Token> {
        self.tokens
            .iter()
            .find(|t| matches!(t.kind, TokenKind::Error(_)))
    }

    /// Returns the number of tokens, including the final `Eof`.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// Returns true if the statement holds nothing but `Eof`.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tokens.len() == 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Keyword;

    #[test]
    fn test_advance_and_reset() {
        let mut stream = TokenStream::new("SELECT a FROM t");
        let mark = stream.position();
        assert_eq!(stream.advance().as_keyword(), Some(Keyword::Select));
        assert!(matches!(stream.peek(), TokenKind::Identifier(n) if n == "A"));
        stream.reset(mark);
        assert_eq!(stream.position(), 0);
        assert_eq!(stream.current().as_keyword(), Some(Keyword::Select));
    }

    #[test]
    fn test_advance_stops_at_eof() {
        let mut stream = TokenStream::new("a");
        stream.advance();
        stream.advance();
        stream.advance();
        assert!(stream.current().is_eof());
        assert_eq!(stream.position(), 1);
    }

    #[test]
    fn test_peek_nth_past_end() {
        let stream = TokenStream::new("(");
        assert_eq!(stream.peek_nth(0), &TokenKind::LeftParen);
        assert_eq!(stream.peek_nth(5), &TokenKind::Eof);
    }

    #[test]
    fn test_first_error() {
        let stream = TokenStream::new("SELECT 'open");
        assert!(stream.first_error().is_some());
        assert!(TokenStream::new("SELECT 1").first_error().is_none());
    }

    #[test]
    fn test_from_tokens_appends_eof() {
        let stream = TokenStream::from_tokens(vec![Token::new(TokenKind::Comma, Span::new(0, 1))]);
        assert_eq!(stream.len(), 2);
        assert!(!stream.is_empty());
    }
}
