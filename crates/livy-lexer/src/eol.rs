//! End-of-line inference.
//!
//! The grammar separates statements with `Eol` tokens, but the lexer only
//! produces raw whitespace. This pass decides which whitespace runs act
//! as statement terminators: a newline-bearing run at bracket depth zero,
//! sitting between a token that can end a statement and a token that can
//! start one, becomes an `Eol`. Every other whitespace run -- and every
//! comment -- is dropped.

use livy_common::span::Span;
use livy_common::token::{Token, TokenKind};

/// Token kinds that may legally end a statement.
const VALID_ENDS: [TokenKind; 9] = [
    TokenKind::End,
    TokenKind::False,
    TokenKind::Float,
    TokenKind::Int,
    TokenKind::Name,
    TokenKind::Rbracket,
    TokenKind::Rparen,
    TokenKind::String,
    TokenKind::True,
];

/// Token kinds that may legally start a statement.
const VALID_STARTS: [TokenKind; 14] = [
    TokenKind::Bslash,
    TokenKind::Dash,
    TokenKind::End,
    TokenKind::False,
    TokenKind::Float,
    TokenKind::If,
    TokenKind::Int,
    TokenKind::Lbracket,
    TokenKind::Let,
    TokenKind::Lparen,
    TokenKind::Match,
    TokenKind::Name,
    TokenKind::String,
    TokenKind::True,
];

/// Check whether an `Eol` belongs at the current whitespace token.
fn can_add_eol(
    prev: TokenKind,
    current: &Token,
    next: Option<TokenKind>,
    depth: i32,
) -> bool {
    depth == 0
        && current
            .lexeme
            .as_deref()
            .is_some_and(|text| text.contains('\n'))
        && VALID_ENDS.contains(&prev)
        && next.map_or(true, |kind| VALID_STARTS.contains(&kind))
}

/// Replace qualifying whitespace tokens with `Eol`, dropping the rest of
/// the whitespace and all comments.
///
/// If the input is non-empty, the output is guaranteed to end with an
/// `Eol` -- one is synthesised at the end of the stream when the source
/// does not finish on a newline.
pub fn infer_eols(tokens: Vec<Token>) -> Vec<Token> {
    let mut out: Vec<Token> = Vec::with_capacity(tokens.len());
    let mut depth: i32 = 0;
    let mut prev_kind = TokenKind::Eol;

    for (index, token) in tokens.iter().enumerate() {
        match token.kind {
            TokenKind::Comment => continue,
            TokenKind::Whitespace => {
                let next = next_significant(&tokens, index + 1);
                if can_add_eol(prev_kind, token, next, depth) {
                    out.push(Token::new(TokenKind::Eol, token.span));
                    prev_kind = TokenKind::Eol;
                }
            }
            kind => {
                if kind.is_opener() {
                    depth += 1;
                } else if kind.is_closer() {
                    depth -= 1;
                }
                out.push(token.clone());
                prev_kind = kind;
            }
        }
    }

    if let Some(last) = out.last() {
        if last.kind != TokenKind::Eol {
            out.push(Token::new(TokenKind::Eol, Span::point(last.span.end)));
        }
    }
    out
}

/// The kind of the next token that is neither whitespace nor a comment.
fn next_significant(tokens: &[Token], from: usize) -> Option<TokenKind> {
    tokens[from..]
        .iter()
        .map(|token| token.kind)
        .find(|kind| !matches!(kind, TokenKind::Whitespace | TokenKind::Comment))
}

/// Pretty print a token stream, one token per line, for the `--lex` dump.
pub fn show_tokens(tokens: &[Token]) -> String {
    tokens
        .iter()
        .map(|token| match &token.lexeme {
            Some(lexeme) => format!(
                "[ #{}-{} {} {:?} ]",
                token.span.start, token.span.end, token.kind, lexeme
            ),
            None => format!("[ #{}-{} {} ]", token.span.start, token.span.end, token.kind),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Lexer;

    fn infer(source: &str) -> Vec<TokenKind> {
        infer_eols(Lexer::tokenize(source).unwrap())
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn newline_between_statements_becomes_eol() {
        assert_eq!(
            infer("let x = 1\nlet y = 2"),
            vec![
                TokenKind::Let,
                TokenKind::Name,
                TokenKind::Equal,
                TokenKind::Int,
                TokenKind::Eol,
                TokenKind::Let,
                TokenKind::Name,
                TokenKind::Equal,
                TokenKind::Int,
                TokenKind::Eol,
            ]
        );
    }

    #[test]
    fn newline_inside_brackets_is_dropped() {
        assert_eq!(
            infer("[1,\n2]"),
            vec![
                TokenKind::Lbracket,
                TokenKind::Int,
                TokenKind::Comma,
                TokenKind::Int,
                TokenKind::Rbracket,
                TokenKind::Eol,
            ]
        );
    }

    #[test]
    fn newline_after_operator_is_dropped() {
        // `+` cannot end a statement, so the expression continues.
        assert_eq!(
            infer("1 +\n2"),
            vec![
                TokenKind::Int,
                TokenKind::Plus,
                TokenKind::Int,
                TokenKind::Eol,
            ]
        );
    }

    #[test]
    fn newline_before_infix_continuation_is_dropped() {
        // `then` cannot start a statement, so no terminator before it.
        assert_eq!(
            infer("if x\nthen 1 else 2"),
            vec![
                TokenKind::If,
                TokenKind::Name,
                TokenKind::Then,
                TokenKind::Int,
                TokenKind::Else,
                TokenKind::Int,
                TokenKind::Eol,
            ]
        );
    }

    #[test]
    fn final_eol_is_synthesised_when_missing() {
        let tokens = infer_eols(Lexer::tokenize("x").unwrap());
        assert_eq!(tokens.last().unwrap().kind, TokenKind::Eol);
        // the synthetic terminator sits just past the last real token
        assert_eq!(tokens.last().unwrap().span, Span::point(1));
    }

    #[test]
    fn last_token_is_always_eol_for_nonempty_input() {
        for source in ["x", "x\n", "let x = 1", "[1, 2]\n\n", "f a b # c"] {
            let tokens = infer_eols(Lexer::tokenize(source).unwrap());
            assert_eq!(
                tokens.last().map(|t| t.kind),
                Some(TokenKind::Eol),
                "source: {source:?}"
            );
        }
    }

    #[test]
    fn empty_input_stays_empty() {
        assert!(infer_eols(Vec::new()).is_empty());
        assert!(infer_eols(Lexer::tokenize("   \n\t").unwrap()).is_empty());
    }

    #[test]
    fn comments_are_dropped_but_do_not_block_eols() {
        assert_eq!(
            infer("x # trailing\ny"),
            vec![
                TokenKind::Name,
                TokenKind::Eol,
                TokenKind::Name,
                TokenKind::Eol,
            ]
        );
    }

    #[test]
    fn show_tokens_formats_lexemes() {
        let tokens = infer_eols(Lexer::tokenize("let x = 1").unwrap());
        let dump = show_tokens(&tokens);
        assert!(dump.contains("[ #0-3 let ]"));
        assert!(dump.contains("[ #4-5 name \"x\" ]"));
        assert!(dump.lines().count() == tokens.len());
    }
}
