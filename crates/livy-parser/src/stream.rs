//! A buffered token stream with peek/consume primitives.
//!
//! The parser works against this thin reader rather than the raw token
//! vector. Reading past the end yields a single synthetic `Eof` token;
//! consuming with an expectation that is not met raises
//! `UnexpectedToken`, or `UnexpectedEof` when the stream is exhausted.

use livy_common::span::Span;
use livy_common::token::{Token, TokenKind};

use crate::error::ParseError;

pub struct TokenStream {
    tokens: Vec<Token>,
    pos: usize,
}

impl TokenStream {
    pub fn new(tokens: Vec<Token>) -> Self {
        TokenStream { tokens, pos: 0 }
    }

    /// Whether all real tokens have been consumed.
    pub fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    /// The token at the head of the stream, or a synthetic `Eof`.
    pub fn preview(&self) -> Token {
        match self.tokens.get(self.pos) {
            Some(token) => token.clone(),
            None => Token::new(TokenKind::Eof, Span::point(self.end_offset())),
        }
    }

    /// The kind at the head of the stream (`Eof` when exhausted).
    pub fn preview_kind(&self) -> TokenKind {
        self.tokens
            .get(self.pos)
            .map(|token| token.kind)
            .unwrap_or(TokenKind::Eof)
    }

    /// Whether the head token has one of the given kinds.
    pub fn peek(&self, expected: &[TokenKind]) -> bool {
        expected.contains(&self.preview_kind())
    }

    /// Advance one token unconditionally, returning it (`Eof` at the end).
    pub fn next(&mut self) -> Token {
        let token = self.preview();
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        token
    }

    /// Consume the head token if its kind is in `expected`, or fail.
    pub fn consume(&mut self, expected: &[TokenKind]) -> Result<Token, ParseError> {
        let head = self.preview();
        if expected.contains(&head.kind) {
            self.pos += 1;
            return Ok(head);
        }
        if head.kind == TokenKind::Eof {
            Err(ParseError::unexpected_eof(head.span, expected.to_vec()))
        } else {
            Err(ParseError::unexpected_token(
                head.kind,
                head.span,
                expected.to_vec(),
            ))
        }
    }

    /// Consume the head token if its kind matches; report whether it did.
    pub fn consume_if(&mut self, expected: &[TokenKind]) -> bool {
        if self.peek(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn end_offset(&self) -> u32 {
        self.tokens.last().map(|token| token.span.end).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ParseErrorKind;

    fn stream(kinds: &[TokenKind]) -> TokenStream {
        let tokens = kinds
            .iter()
            .enumerate()
            .map(|(i, &kind)| Token::new(kind, Span::new(i as u32, i as u32 + 1)))
            .collect();
        TokenStream::new(tokens)
    }

    #[test]
    fn consume_advances_on_match() {
        let mut s = stream(&[TokenKind::Let, TokenKind::Name]);
        assert_eq!(s.consume(&[TokenKind::Let]).unwrap().kind, TokenKind::Let);
        assert_eq!(s.preview_kind(), TokenKind::Name);
    }

    #[test]
    fn consume_rejects_mismatch_without_advancing() {
        let mut s = stream(&[TokenKind::Plus]);
        let err = s.consume(&[TokenKind::Name]).unwrap_err();
        assert!(matches!(
            err.kind,
            ParseErrorKind::UnexpectedToken {
                found: TokenKind::Plus,
                ..
            }
        ));
        assert_eq!(s.preview_kind(), TokenKind::Plus);
    }

    #[test]
    fn exhausted_stream_previews_eof_and_errors_with_unexpected_eof() {
        let mut s = stream(&[TokenKind::Name]);
        s.next();
        assert!(s.at_end());
        assert_eq!(s.preview_kind(), TokenKind::Eof);
        let err = s.consume(&[TokenKind::Eol]).unwrap_err();
        assert!(matches!(err.kind, ParseErrorKind::UnexpectedEof { .. }));
    }

    #[test]
    fn consume_if_leaves_stream_on_mismatch() {
        let mut s = stream(&[TokenKind::Comma]);
        assert!(!s.consume_if(&[TokenKind::Pipe]));
        assert!(s.consume_if(&[TokenKind::Comma]));
        assert!(s.at_end());
    }
}
