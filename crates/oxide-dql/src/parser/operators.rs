//! Token classification for the expression precedence ladder.
//!
//! Each rung of the ladder asks one of these functions whether the current
//! token continues its level. Tokens that belong to no rung end the
//! expression.

use crate::ast::{BinaryOp, UnaryOp};
use crate::lexer::{Keyword, TokenKind};

/// Comparison operators (`=`, `<>`, `<`, `<=`, `>`, `>=`).
#[must_use]
pub const fn comparison_op(kind: &TokenKind) -> Option<BinaryOp> {
    match kind {
        TokenKind::Eq => Some(BinaryOp::Eq),
        TokenKind::NotEq => Some(BinaryOp::NotEq),
        TokenKind::Lt => Some(BinaryOp::Lt),
        TokenKind::LtEq => Some(BinaryOp::LtEq),
        TokenKind::Gt => Some(BinaryOp::Gt),
        TokenKind::GtEq => Some(BinaryOp::GtEq),
        _ => None,
    }
}

/// Additive operators. String concatenation shares their precedence.
#[must_use]
pub const fn additive_op(kind: &TokenKind) -> Option<BinaryOp> {
    match kind {
        TokenKind::Plus => Some(BinaryOp::Add),
        TokenKind::Minus => Some(BinaryOp::Sub),
        TokenKind::Concat => Some(BinaryOp::Concat),
        _ => None,
    }
}

/// Multiplicative operators.
#[must_use]
pub const fn multiplicative_op(kind: &TokenKind) -> Option<BinaryOp> {
    match kind {
        TokenKind::Star => Some(BinaryOp::Mul),
        TokenKind::Slash => Some(BinaryOp::Div),
        TokenKind::Percent => Some(BinaryOp::Mod),
        _ => None,
    }
}

/// Sign operators.
#[must_use]
pub const fn sign_op(kind: &TokenKind) -> Option<UnaryOp> {
    match kind {
        TokenKind::Minus => Some(UnaryOp::Neg),
        TokenKind::Plus => Some(UnaryOp::Plus),
        _ => None,
    }
}

/// Keywords that begin a query expression.
#[must_use]
pub const fn starts_query(kind: &TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::Keyword(Keyword::Select | Keyword::Values | Keyword::Table | Keyword::With)
    )
}

/// Tokens that begin a predicate suffix when they follow a value
/// expression. `NOT` only counts when `next` is a negatable predicate.
#[must_use]
pub const fn starts_predicate_suffix(kind: &TokenKind, next: &TokenKind) -> bool {
    if comparison_op(kind).is_some() {
        return true;
    }
    match kind {
        TokenKind::Keyword(
            Keyword::Is
            | Keyword::Like
            | Keyword::Between
            | Keyword::In
            | Keyword::Overlaps
            | Keyword::Match,
        ) => true,
        TokenKind::Keyword(Keyword::Not) => matches!(
            next,
            TokenKind::Keyword(Keyword::Like | Keyword::Between | Keyword::In)
        ),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_precedence_ordering() {
        let add = additive_op(&TokenKind::Plus).unwrap();
        let mul = multiplicative_op(&TokenKind::Star).unwrap();
        let eq = comparison_op(&TokenKind::Eq).unwrap();
        assert!(mul.precedence() > add.precedence());
        assert!(add.precedence() > eq.precedence());
        assert!(eq.precedence() > BinaryOp::And.precedence());
        assert!(BinaryOp::And.precedence() > BinaryOp::Or.precedence());
    }

    #[test]
    fn test_concat_is_additive() {
        assert_eq!(additive_op(&TokenKind::Concat), Some(BinaryOp::Concat));
        assert_eq!(multiplicative_op(&TokenKind::Concat), None);
    }

    #[test]
    fn test_not_only_starts_negatable_suffix() {
        let not = TokenKind::Keyword(Keyword::Not);
        assert!(starts_predicate_suffix(&not, &TokenKind::Keyword(Keyword::In)));
        assert!(!starts_predicate_suffix(&not, &TokenKind::Keyword(Keyword::Null)));
        assert!(starts_predicate_suffix(&TokenKind::GtEq, &TokenKind::Eof));
        assert!(!starts_predicate_suffix(&TokenKind::Plus, &TokenKind::Eof));
    }

    #[test]
    fn test_query_start_keywords() {
        assert!(starts_query(&TokenKind::Keyword(Keyword::With)));
        assert!(!starts_query(&TokenKind::Keyword(Keyword::From)));
        assert_eq!(sign_op(&TokenKind::Minus), Some(UnaryOp::Neg));
    }
}
