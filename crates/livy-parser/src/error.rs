use std::fmt;

use livy_common::diag::Diagnostic;
use livy_common::span::Span;
use livy_common::token::TokenKind;

/// An error raised while parsing a token stream.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub span: Span,
}

/// The specific kind of parse error.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseErrorKind {
    /// A token that does not fit the grammar at this position.
    UnexpectedToken {
        found: TokenKind,
        expected: Vec<TokenKind>,
    },
    /// The input ended where more tokens were required.
    UnexpectedEof { expected: Vec<TokenKind> },
    /// A numeric literal too large for the compiler's integer range.
    NumberOverflow,
}

impl ParseError {
    pub fn new(kind: ParseErrorKind, span: Span) -> Self {
        Self { kind, span }
    }

    pub fn unexpected_token(found: TokenKind, span: Span, expected: Vec<TokenKind>) -> Self {
        Self::new(ParseErrorKind::UnexpectedToken { found, expected }, span)
    }

    pub fn unexpected_eof(span: Span, expected: Vec<TokenKind>) -> Self {
        Self::new(ParseErrorKind::UnexpectedEof { expected }, span)
    }

    pub fn to_diagnostic(&self) -> Diagnostic {
        match &self.kind {
            ParseErrorKind::UnexpectedToken { found, expected } => {
                let mut diag = Diagnostic::new(
                    "unexpected_token",
                    format!("unexpected `{found}` here"),
                )
                .with_span(self.span);
                if !expected.is_empty() {
                    diag = diag.with_note(format!("expected {}", expected_list(expected)));
                }
                diag
            }
            ParseErrorKind::UnexpectedEof { expected } => {
                let mut diag = Diagnostic::new(
                    "unexpected_eof",
                    "the file ended before the expression was complete",
                )
                .with_span(self.span);
                if !expected.is_empty() {
                    diag = diag.with_note(format!("expected {}", expected_list(expected)));
                }
                diag
            }
            ParseErrorKind::NumberOverflow => Diagnostic::new(
                "number_overflow",
                "this number is too large for the compiler to represent",
            )
            .with_span(self.span),
        }
    }
}

fn expected_list(expected: &[TokenKind]) -> String {
    expected
        .iter()
        .map(|kind| format!("`{kind}`"))
        .collect::<Vec<_>>()
        .join(" or ")
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ParseErrorKind::UnexpectedToken { found, .. } => {
                write!(f, "unexpected `{found}`")
            }
            ParseErrorKind::UnexpectedEof { .. } => write!(f, "unexpected end of input"),
            ParseErrorKind::NumberOverflow => write!(f, "number literal out of range"),
        }
    }
}

impl std::error::Error for ParseError {}
