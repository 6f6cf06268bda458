//! SQL Lexer/Tokenizer
//!
//! This module provides a hand-written lexer for SQL that produces a stream of
//! tokens, plus a [`TokenStream`] cursor that the parser can rewind to any
//! position it has already visited.

mod span;
mod stream;
mod token;
mod tokenizer;

pub use span::Span;
pub use stream::TokenStream;
pub use token::{Keyword, Token, TokenKind};
pub use tokenizer::Lexer;
