// Livy lexer -- tokenizer for the Livy language.

mod decode;
mod eol;

use std::fmt;

use livy_common::diag::Diagnostic;
use livy_common::span::Span;
use livy_common::token::{keyword_from_str, one_char_from_char, two_char_from_str, Token, TokenKind};

pub use decode::{decode_source, normalise_newlines, ALL_NEWLINE_FORMS};
pub use eol::{infer_eols, show_tokens};

/// An error raised while turning bytes into tokens.
#[derive(Debug, Clone, PartialEq)]
pub struct LexError {
    pub kind: LexErrorKind,
    pub span: Span,
}

impl LexError {
    pub fn new(kind: LexErrorKind, span: Span) -> Self {
        Self { kind, span }
    }

    pub fn to_diagnostic(&self) -> Diagnostic {
        match &self.kind {
            LexErrorKind::IllegalChar(c) => {
                Diagnostic::new("illegal_char", format!("illegal character {c:?}"))
                    .with_span(self.span)
            }
            LexErrorKind::BadEncoding(encoding) => Diagnostic::new(
                "bad_encoding",
                format!("the file could not be decoded as {encoding}"),
            ),
        }
    }
}

/// The specific kind of lexer error.
#[derive(Debug, Clone, PartialEq)]
pub enum LexErrorKind {
    /// A character that cannot start any token was encountered.
    IllegalChar(char),
    /// The source bytes could not be decoded with the given encoding.
    BadEncoding(String),
}

impl fmt::Display for LexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            LexErrorKind::IllegalChar(c) => write!(f, "illegal character {c:?}"),
            LexErrorKind::BadEncoding(enc) => write!(f, "cannot decode the file as {enc}"),
        }
    }
}

impl std::error::Error for LexError {}

/// The Livy lexer. Converts source text into a stream of tokens.
///
/// The lexer walks the source directly: it keeps the byte offset of the
/// next unread character and opens a [`Span`] at the start of every
/// token, so each recogniser ends by closing that span over whatever it
/// consumed. Dispatch is by the first character of the remaining input:
/// digits start numbers, letters and `_` start names or keywords, `"`
/// starts a string, then the two-character operator table is consulted
/// before the one-character table, then whitespace runs and `#`
/// comments. Anything else is an `IllegalChar` error -- lexing aborts on
/// the first bad byte.
pub struct Lexer<'src> {
    source: &'src str,
    /// Byte offset of the next unread character.
    pos: u32,
}

impl<'src> Lexer<'src> {
    /// Create a new lexer for the given source text.
    ///
    /// The source is expected to have gone through
    /// [`normalise_newlines`] already, so `\r` never appears.
    pub fn new(source: &'src str) -> Self {
        Self { source, pos: 0 }
    }

    /// Convenience: tokenize the entire source into a `Vec<Token>`.
    ///
    /// The returned vector still contains `Whitespace` and `Comment`
    /// tokens; [`infer_eols`] strips them and inserts `Eol` terminators.
    pub fn tokenize(source: &str) -> Result<Vec<Token>, LexError> {
        let mut lexer = Lexer::new(source);
        let mut tokens = Vec::new();
        while let Some(token) = lexer.next_token()? {
            tokens.push(token);
        }
        Ok(tokens)
    }

    /// Produce the next token, or `None` at end of input.
    pub fn next_token(&mut self) -> Result<Option<Token>, LexError> {
        let start = self.pos;
        let Some(c) = self.peek() else {
            return Ok(None);
        };

        let token = match c {
            '0'..='9' => self.lex_number(start),
            c if c.is_ascii_alphabetic() || c == '_' => self.lex_name(start),
            '"' => self.lex_string(start)?,
            '#' => self.lex_comment(start),
            c if c.is_ascii_whitespace() => self.lex_whitespace(start),
            _ => self.lex_operator(start)?,
        };
        Ok(Some(token))
    }

    // ── Character primitives ───────────────────────────────────────────

    /// The unread remainder of the source.
    fn rest(&self) -> &'src str {
        &self.source[self.pos as usize..]
    }

    /// The next unread character, if any.
    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    /// The character after the next one.
    fn peek_second(&self) -> Option<char> {
        let mut chars = self.rest().chars();
        chars.next();
        chars.next()
    }

    /// Consume one character, advancing the offset by its UTF-8 width.
    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8() as u32;
        Some(c)
    }

    /// Consume characters while the predicate holds.
    fn eat_while(&mut self, predicate: impl Fn(char) -> bool) {
        while self.peek().is_some_and(&predicate) {
            self.bump();
        }
    }

    // ── Span and token builders ────────────────────────────────────────

    /// Close the span opened at `start` over everything consumed since.
    fn span_from(&self, start: u32) -> Span {
        Span::new(start, self.pos)
    }

    /// The source text a span covers.
    fn text(&self, span: Span) -> &'src str {
        &self.source[span.start as usize..span.end as usize]
    }

    /// Finish a punctuation or keyword token; such tokens carry no
    /// lexeme.
    fn close_token(&self, kind: TokenKind, start: u32) -> Token {
        Token::new(kind, self.span_from(start))
    }

    /// Finish a token that carries the text it was lexed from.
    fn close_lexeme(&self, kind: TokenKind, start: u32) -> Token {
        let span = self.span_from(start);
        Token::with_lexeme(kind, span, self.text(span))
    }

    // ── Token recognisers ──────────────────────────────────────────────

    /// Lex an integer, upgrading to a float when a `.` is followed by a
    /// decimal digit.
    fn lex_number(&mut self, start: u32) -> Token {
        self.eat_while(|c| c.is_ascii_digit());
        if self.peek() == Some('.') && self.peek_second().is_some_and(|c| c.is_ascii_digit()) {
            self.bump(); // .
            self.eat_while(|c| c.is_ascii_digit());
            return self.close_lexeme(TokenKind::Float, start);
        }
        self.close_lexeme(TokenKind::Int, start)
    }

    /// Lex a name or keyword of `[A-Za-z0-9_]` characters.
    fn lex_name(&mut self, start: u32) -> Token {
        self.eat_while(|c| c.is_ascii_alphanumeric() || c == '_');
        let span = self.span_from(start);
        match keyword_from_str(self.text(span)) {
            Some(kind) => Token::new(kind, span),
            None => Token::with_lexeme(TokenKind::Name, span, self.text(span)),
        }
    }

    /// Lex a string literal. The lexeme includes both quotes. A backslash
    /// escapes exactly the next character; reaching end of input inside
    /// the string is an `IllegalChar` on the opening quote.
    fn lex_string(&mut self, start: u32) -> Result<Token, LexError> {
        self.bump(); // opening "
        let mut in_escape = false;
        loop {
            match self.bump() {
                None => {
                    return Err(LexError::new(
                        LexErrorKind::IllegalChar('"'),
                        Span::new(start, start + 1),
                    ))
                }
                Some('"') if !in_escape => break,
                Some(c) => in_escape = !in_escape && c == '\\',
            }
        }
        Ok(self.close_lexeme(TokenKind::String, start))
    }

    /// Lex a `#` line comment. The trailing newline is left for the
    /// whitespace recogniser so EOL inference still sees it.
    fn lex_comment(&mut self, start: u32) -> Token {
        self.eat_while(|c| c != '\n');
        self.close_lexeme(TokenKind::Comment, start)
    }

    /// Lex a run of ASCII whitespace as a single token. The lexeme keeps
    /// the newline content for EOL inference.
    fn lex_whitespace(&mut self, start: u32) -> Token {
        self.eat_while(|c| c.is_ascii_whitespace());
        self.close_lexeme(TokenKind::Whitespace, start)
    }

    /// Lex an operator, trying the two-character table first.
    fn lex_operator(&mut self, start: u32) -> Result<Token, LexError> {
        let first = self.peek().expect("caller checked non-eof");
        if let Some(second) = self.peek_second() {
            let mut pair = String::with_capacity(2);
            pair.push(first);
            pair.push(second);
            if let Some(kind) = two_char_from_str(&pair) {
                self.bump();
                self.bump();
                return Ok(self.close_token(kind, start));
            }
        }
        if let Some(kind) = one_char_from_char(first) {
            self.bump();
            return Ok(self.close_token(kind, start));
        }
        Err(LexError::new(
            LexErrorKind::IllegalChar(first),
            Span::new(start, start + first.len_utf8() as u32),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        Lexer::tokenize(source)
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn lexes_integers_and_floats() {
        let tokens = Lexer::tokenize("42 3.14").unwrap();
        assert_eq!(tokens[0].kind, TokenKind::Int);
        assert_eq!(tokens[0].lexeme.as_deref(), Some("42"));
        assert_eq!(tokens[2].kind, TokenKind::Float);
        assert_eq!(tokens[2].lexeme.as_deref(), Some("3.14"));
    }

    #[test]
    fn dot_without_decimals_does_not_make_a_float() {
        // `1..2` is an integer, a range operator, and an integer.
        assert_eq!(
            kinds("1..2"),
            vec![TokenKind::Int, TokenKind::DotDot, TokenKind::Int]
        );
    }

    #[test]
    fn lexes_keywords_and_names() {
        assert_eq!(
            kinds("let foo _bar True"),
            vec![
                TokenKind::Let,
                TokenKind::Whitespace,
                TokenKind::Name,
                TokenKind::Whitespace,
                TokenKind::Name,
                TokenKind::Whitespace,
                TokenKind::True,
            ]
        );
    }

    #[test]
    fn string_lexeme_includes_quotes() {
        let tokens = Lexer::tokenize("\"hi there\"").unwrap();
        assert_eq!(tokens[0].kind, TokenKind::String);
        assert_eq!(tokens[0].lexeme.as_deref(), Some("\"hi there\""));
        assert_eq!(tokens[0].span, Span::new(0, 10));
    }

    #[test]
    fn spans_count_bytes_not_chars() {
        // `é` is two bytes in UTF-8, so the string token ends at 7 and
        // the following name starts there.
        let tokens = Lexer::tokenize("\"caf\u{e9}\"x").unwrap();
        assert_eq!(tokens[0].kind, TokenKind::String);
        assert_eq!(tokens[0].span, Span::new(0, 7));
        assert_eq!(tokens[1].kind, TokenKind::Name);
        assert_eq!(tokens[1].span, Span::new(7, 8));
    }

    #[test]
    fn escaped_quote_does_not_close_the_string() {
        let tokens = Lexer::tokenize(r#""a\"b""#).unwrap();
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].lexeme.as_deref(), Some(r#""a\"b""#));
    }

    #[test]
    fn escaped_backslash_can_end_the_string() {
        let tokens = Lexer::tokenize(r#""a\\""#).unwrap();
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].kind, TokenKind::String);
    }

    #[test]
    fn unterminated_string_is_an_illegal_char() {
        let err = Lexer::tokenize("\"oops").unwrap_err();
        assert_eq!(err.kind, LexErrorKind::IllegalChar('"'));
        assert_eq!(err.span, Span::new(0, 1));
    }

    #[test]
    fn two_char_operators_win_over_one_char() {
        assert_eq!(
            kinds("-> >= <> /= := ::"),
            vec![
                TokenKind::Arrow,
                TokenKind::Whitespace,
                TokenKind::GreaterEqual,
                TokenKind::Whitespace,
                TokenKind::Diamond,
                TokenKind::Whitespace,
                TokenKind::SlashEqual,
                TokenKind::Whitespace,
                TokenKind::ColonEqual,
                TokenKind::Whitespace,
                TokenKind::ColonColon,
            ]
        );
    }

    #[test]
    fn comment_runs_to_end_of_line_but_leaves_newline() {
        let tokens = Lexer::tokenize("# note\nx").unwrap();
        assert_eq!(tokens[0].kind, TokenKind::Comment);
        assert_eq!(tokens[0].lexeme.as_deref(), Some("# note"));
        assert_eq!(tokens[1].kind, TokenKind::Whitespace);
        assert_eq!(tokens[2].kind, TokenKind::Name);
    }

    #[test]
    fn whitespace_run_is_one_token_preserving_newlines() {
        let tokens = Lexer::tokenize("a \n\t b").unwrap();
        assert_eq!(tokens.len(), 3);
        assert_eq!(tokens[1].kind, TokenKind::Whitespace);
        assert_eq!(tokens[1].lexeme.as_deref(), Some(" \n\t "));
    }

    #[test]
    fn illegal_char_reports_the_offending_byte() {
        let err = Lexer::tokenize("let @").unwrap_err();
        assert_eq!(err.kind, LexErrorKind::IllegalChar('@'));
        assert_eq!(err.span, Span::new(4, 5));
    }

    #[test]
    fn multibyte_illegal_chars_span_their_full_width() {
        let err = Lexer::tokenize("let \u{3bb}").unwrap_err();
        assert_eq!(err.kind, LexErrorKind::IllegalChar('\u{3bb}'));
        assert_eq!(err.span, Span::new(4, 6));
    }
}
