//! Source decoding and newline normalisation.
//!
//! The compiler proper works on UTF-8 text with `\n` line endings. This
//! module is the boundary that gets it there: `decode_source` turns the
//! raw file bytes into a string (full codec support lives outside the
//! compiler; only the UTF-8 family is handled here, with a plain UTF-8
//! retry as the fallback), and `normalise_newlines` collapses `\r\n` and
//! `\r` to `\n`, rejecting any newline form the caller disallows.

use livy_common::span::Span;

use crate::{LexError, LexErrorKind};

/// Every newline form the normaliser knows about, longest first so that
/// `\r\n` is never seen as `\r` followed by `\n`.
pub const ALL_NEWLINE_FORMS: [&str; 3] = ["\r\n", "\r", "\n"];

/// Decode raw source bytes into a string.
///
/// `encoding` is the encoding declared on the command line, if any. The
/// UTF-8 family (and its ASCII subset) is decoded directly. Any other
/// declared encoding is retried as plain UTF-8 -- the host fallback -- and
/// if that also fails the result is a `BadEncoding` error naming the
/// declared encoding.
pub fn decode_source(bytes: &[u8], encoding: Option<&str>) -> Result<String, LexError> {
    let declared = encoding.unwrap_or("utf-8");
    // The UTF-8 family (including ASCII) decodes directly. Any other
    // declared encoding falls through to the same UTF-8 attempt -- the
    // host fallback -- so a mislabelled UTF-8 file still compiles, and a
    // genuinely foreign one reports the encoding the user declared.
    decode_utf8(bytes, declared)
}

fn decode_utf8(bytes: &[u8], declared: &str) -> Result<String, LexError> {
    std::str::from_utf8(bytes)
        .map(str::to_owned)
        .map_err(|_| {
            LexError::new(
                LexErrorKind::BadEncoding(declared.to_owned()),
                Span::zero(),
            )
        })
}

/// Normalise the newlines in the source so that only `\n` remains.
///
/// `accepted` lists the newline forms that may appear in the input;
/// `\n` is always accepted. Finding a form outside `accepted` is an
/// `IllegalChar` at its position.
pub fn normalise_newlines(source: &str, accepted: &[&str]) -> Result<String, LexError> {
    let mut result = source.to_owned();
    for form in ALL_NEWLINE_FORMS {
        if form == "\n" {
            continue;
        }
        if accepted.contains(&form) {
            result = result.replace(form, "\n");
        } else if let Some(pos) = result.find(form) {
            return Err(LexError::new(
                LexErrorKind::IllegalChar('\r'),
                Span::new(pos as u32, pos as u32 + 1),
            ));
        }
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_plain_utf8() {
        assert_eq!(decode_source(b"let x = 1", None).unwrap(), "let x = 1");
        assert_eq!(
            decode_source("caf\u{e9}".as_bytes(), Some("utf-8")).unwrap(),
            "caf\u{e9}"
        );
    }

    #[test]
    fn unknown_encoding_falls_back_to_utf8() {
        assert_eq!(
            decode_source(b"let x = 1", Some("latin-1")).unwrap(),
            "let x = 1"
        );
    }

    #[test]
    fn undecodable_bytes_report_the_declared_encoding() {
        let err = decode_source(&[0xFF, 0xFE, 0x41], Some("utf-16")).unwrap_err();
        assert_eq!(err.kind, LexErrorKind::BadEncoding("utf-16".to_owned()));
    }

    #[test]
    fn normalises_crlf_and_cr() {
        let forms: Vec<&str> = ALL_NEWLINE_FORMS.to_vec();
        assert_eq!(
            normalise_newlines("a\r\nb\rc\nd", &forms).unwrap(),
            "a\nb\nc\nd"
        );
    }

    #[test]
    fn rejects_disallowed_newline_forms() {
        let err = normalise_newlines("a\rb", &["\n"]).unwrap_err();
        assert_eq!(err.kind, LexErrorKind::IllegalChar('\r'));
        assert_eq!(err.span, Span::new(1, 2));
    }
}
