//! SQL Tokenizer implementation.

use super::{Keyword, Span, Token, TokenKind};

/// A lexer that tokenizes SQL input.
pub struct Lexer<'a> {
    /// The input source code.
    input: &'a str,
    /// The current byte position.
    pos: usize,
    /// The byte position of the start of the current token.
    start: usize,
}

impl<'a> Lexer<'a> {
    /// Creates a new lexer for the given input.
    #[must_use]
    pub const fn new(input: &'a str) -> Self {
        Self {
            input,
            pos: 0,
            start: 0,
        }
    }

    /// Returns the current character without advancing.
    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    /// Returns the next character without advancing.
    fn peek_next(&self) -> Option<char> {
        let mut chars = self.input[self.pos..].chars();
        chars.next();
        chars.next()
    }

    /// Advances to the next character and returns it.
    fn advance(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    /// Skips whitespace and comments.
    fn skip_whitespace_and_comments(&mut self) {
        loop {
            while self.peek().is_some_and(char::is_whitespace) {
                self.advance();
            }

            if self.peek() == Some('-') && self.peek_next() == Some('-') {
                while self.peek().is_some_and(|c| c != '\n') {
                    self.advance();
                }
                continue;
            }

            if self.peek() == Some('/') && self.peek_next() == Some('*') {
                self.advance();
                self.advance();
                loop {
                    match self.advance() {
                        Some('*') if self.peek() == Some('/') => {
                            self.advance();
                            break;
                        }
                        None => break,
                        _ => {}
                    }
                }
                continue;
            }

            break;
        }
    }

    fn make_token(&self, kind: TokenKind) -> Token {
        Token::new(kind, Span::new(self.start, self.pos))
    }

    fn error(&self, message: impl Into<String>) -> Token {
        self.make_token(TokenKind::Error(message.into()))
    }

    /// Scans an identifier or keyword. Regular identifiers are folded to
    /// upper case; delimited identifiers keep their spelling.
    fn scan_identifier(&mut self) -> Token {
        while self.peek().is_some_and(|c| c.is_alphanumeric() || c == '_' || c == '$') {
            self.advance();
        }

        let text = &self.input[self.start..self.pos];
        match Keyword::from_str(text) {
            Some(keyword) => self.make_token(TokenKind::Keyword(keyword)),
            None => self.make_token(TokenKind::Identifier(text.to_ascii_uppercase())),
        }
    }

    /// Scans a delimited identifier (`"column name"` or `` `column name` ``).
    fn scan_quoted_identifier(&mut self, quote: char) -> Token {
        self.advance();
        let mut value = String::new();

        loop {
            match self.advance() {
                Some(c) if c == quote => {
                    if self.peek() == Some(quote) {
                        value.push(quote);
                        self.advance();
                    } else {
                        break;
                    }
                }
                Some(c) => value.push(c),
                None => return self.error("Unterminated quoted identifier"),
            }
        }

        if value.is_empty() {
            return self.error("Zero-length delimited identifier");
        }
        self.make_token(TokenKind::QuotedIdentifier(value))
    }

    /// Scans a number (integer or approximate).
    fn scan_number(&mut self) -> Token {
        let mut is_float = false;

        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
        }

        if self.peek() == Some('.') && self.peek_next().is_some_and(|c| c.is_ascii_digit()) {
            is_float = true;
            self.advance();
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.advance();
            }
        }

        if self.peek().is_some_and(|c| c == 'e' || c == 'E') {
            is_float = true;
            self.advance();
            if self.peek().is_some_and(|c| c == '+' || c == '-') {
                self.advance();
            }
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.advance();
            }
        }

        let text = &self.input[self.start..self.pos];
        if is_float {
            match text.parse::<f64>() {
                Ok(f) => self.make_token(TokenKind::Float(f)),
                Err(e) => self.error(format!("Invalid number: {e}")),
            }
        } else {
            match text.parse::<i64>() {
                Ok(i) => self.make_token(TokenKind::Integer(i)),
                Err(e) => self.error(format!("Invalid integer: {e}")),
            }
        }
    }

    /// Scans a character string literal.
    fn scan_string(&mut self) -> Token {
        self.advance();
        let mut value = String::new();

        loop {
            match self.advance() {
                Some('\'') => {
                    if self.peek() == Some('\'') {
                        value.push('\'');
                        self.advance();
                    } else {
                        break;
                    }
                }
                Some(c) => value.push(c),
                None => return self.error("Unterminated string literal"),
            }
        }

        self.make_token(TokenKind::String(value))
    }

    /// Scans a binary string literal (X'...' or x'...').
    fn scan_blob(&mut self) -> Token {
        self.advance();
        self.advance();

        let mut bytes = Vec::new();
        let mut pending: Option<u32> = None;

        loop {
            match self.advance() {
                Some('\'') => break,
                Some(c) if c.is_ascii_hexdigit() => {
                    let digit = c.to_digit(16).unwrap_or_default();
                    match pending.take() {
                        // two hex digits always fit in a byte
                        Some(high) => bytes.push(u8::try_from(high * 16 + digit).unwrap_or(0)),
                        None => pending = Some(digit),
                    }
                }
                Some(c) if c.is_whitespace() => {}
                Some(_) => return self.error("Invalid character in binary literal"),
                None => return self.error("Unterminated binary literal"),
            }
        }

        if pending.is_some() {
            return self.error("Odd number of hex digits in binary literal");
        }
        self.make_token(TokenKind::Blob(bytes))
    }

    /// Scans the next token.
    #[must_use]
    pub fn next_token(&mut self) -> Token {
        self.skip_whitespace_and_comments();
        self.start = self.pos;

        let Some(c) = self.advance() else {
            return self.make_token(TokenKind::Eof);
        };

        match c {
            '(' => self.make_token(TokenKind::LeftParen),
            ')' => self.make_token(TokenKind::RightParen),
            '[' => self.make_token(TokenKind::LeftBracket),
            ']' => self.make_token(TokenKind::RightBracket),
            ',' => self.make_token(TokenKind::Comma),
            ';' => self.make_token(TokenKind::Semicolon),
            '+' => self.make_token(TokenKind::Plus),
            '-' => self.make_token(TokenKind::Minus),
            '*' => self.make_token(TokenKind::Star),
            '/' => self.make_token(TokenKind::Slash),
            '%' => self.make_token(TokenKind::Percent),
            '?' => self.make_token(TokenKind::Question),
            '=' => self.make_token(TokenKind::Eq),
            '.' => self.make_token(TokenKind::Dot),
            ':' => {
                if self.peek() == Some(':') {
                    self.advance();
                    self.make_token(TokenKind::DoubleColon)
                } else {
                    self.make_token(TokenKind::Colon)
                }
            }
            '<' => match self.peek() {
                Some('=') => {
                    self.advance();
                    self.make_token(TokenKind::LtEq)
                }
                Some('>') => {
                    self.advance();
                    self.make_token(TokenKind::NotEq)
                }
                _ => self.make_token(TokenKind::Lt),
            },
            '>' => {
                if self.peek() == Some('=') {
                    self.advance();
                    self.make_token(TokenKind::GtEq)
                } else {
                    self.make_token(TokenKind::Gt)
                }
            }
            '!' => {
                if self.peek() == Some('=') {
                    self.advance();
                    self.make_token(TokenKind::NotEq)
                } else {
                    self.error("Unexpected character: !")
                }
            }
            '|' => {
                if self.peek() == Some('|') {
                    self.advance();
                    self.make_token(TokenKind::Concat)
                } else {
                    self.error("Unexpected character: |")
                }
            }
            '\'' => {
                self.pos = self.start;
                self.scan_string()
            }
            '"' | '`' => {
                self.pos = self.start;
                self.scan_quoted_identifier(c)
            }
            'X' | 'x' if self.peek() == Some('\'') => {
                self.pos = self.start;
                self.scan_blob()
            }
            c if c.is_ascii_digit() => {
                self.pos = self.start;
                self.scan_number()
            }
            c if c.is_alphabetic() || c == '_' => {
                self.pos = self.start;
                self.scan_identifier()
            }
            _ => self.error(format!("Unexpected character: {c}")),
        }
    }

    /// Tokenizes the entire input and returns all tokens, ending with `Eof`.
    #[must_use]
    pub fn tokenize(&mut self) -> Vec<Token> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token();
            let is_eof = token.is_eof();
            tokens.push(token);
            if is_eof {
                break;
            }
        }
        tokens
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token_kinds(input: &str) -> Vec<TokenKind> {
        Lexer::new(input)
            .tokenize()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(token_kinds("   \n\t  "), vec![TokenKind::Eof]);
    }

    #[test]
    fn test_comments_are_skipped() {
        assert_eq!(
            token_kinds("SELECT -- comment\n/* block */ FROM"),
            vec![
                TokenKind::Keyword(Keyword::Select),
                TokenKind::Keyword(Keyword::From),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_keywords_case_insensitive() {
        assert_eq!(
            token_kinds("select Union wHeRe"),
            vec![
                TokenKind::Keyword(Keyword::Select),
                TokenKind::Keyword(Keyword::Union),
                TokenKind::Keyword(Keyword::Where),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_regular_identifiers_fold_to_upper_case() {
        assert_eq!(
            token_kinds("orders o_$1 \"Mixed\""),
            vec![
                TokenKind::Identifier(String::from("ORDERS")),
                TokenKind::Identifier(String::from("O_$1")),
                TokenKind::QuotedIdentifier(String::from("Mixed")),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_delimited_identifiers_are_not_keywords() {
        assert_eq!(
            token_kinds("\"select\" `a``b` \"x\"\"y\""),
            vec![
                TokenKind::QuotedIdentifier(String::from("select")),
                TokenKind::QuotedIdentifier(String::from("a`b")),
                TokenKind::QuotedIdentifier(String::from("x\"y")),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_numbers() {
        assert_eq!(
            token_kinds("42 2.5 1e3"),
            vec![
                TokenKind::Integer(42),
                TokenKind::Float(2.5),
                TokenKind::Float(1e3),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_integer_overflow_is_error_token() {
        let kinds = token_kinds("99999999999999999999");
        assert!(matches!(&kinds[0], TokenKind::Error(m) if m.starts_with("Invalid integer")));
    }

    #[test]
    fn test_strings_and_blobs() {
        assert_eq!(
            token_kinds("'it''s' X'0aFF'"),
            vec![
                TokenKind::String(String::from("it's")),
                TokenKind::Blob(vec![0x0a, 0xff]),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_unterminated_string() {
        let kinds = token_kinds("'abc");
        assert!(matches!(&kinds[0], TokenKind::Error(_)));
    }

    #[test]
    fn test_operators() {
        assert_eq!(
            token_kinds("+ - * / % = != <> < <= > >= || :: : ? [ ]"),
            vec![
                TokenKind::Plus,
                TokenKind::Minus,
                TokenKind::Star,
                TokenKind::Slash,
                TokenKind::Percent,
                TokenKind::Eq,
                TokenKind::NotEq,
                TokenKind::NotEq,
                TokenKind::Lt,
                TokenKind::LtEq,
                TokenKind::Gt,
                TokenKind::GtEq,
                TokenKind::Concat,
                TokenKind::DoubleColon,
                TokenKind::Colon,
                TokenKind::Question,
                TokenKind::LeftBracket,
                TokenKind::RightBracket,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_span_tracking() {
        let tokens = Lexer::new("SELECT id").tokenize();
        assert_eq!(tokens[0].span, Span::new(0, 6));
        assert_eq!(tokens[1].span, Span::new(7, 9));
    }
}
