//! Source text decoding and Unicode classification (C1).
//!
//! The lexer/parser is an external collaborator (§1 non-goals); this module
//! provides the primitives it is built on: UTF-8 decoding with the exact
//! rejection rules §4.1 requires, BOM handling, CR/CRLF normalization, and
//! the codepoint classifiers used by identifier scanning and the
//! prohibited-codepoint policy.

use unicode_ident::{is_xid_continue, is_xid_start};

/// Outcome of decoding a byte buffer as Cursive0 source text.
#[derive(Debug, Clone)]
pub struct DecodeResult {
    pub ok: bool,
    /// Decoded, BOM-stripped, CR/CRLF-normalized text. Empty when `!ok`.
    pub text: String,
    /// Non-fatal notices (leading BOM stripped, etc).
    pub warnings: Vec<DecodeWarning>,
    pub error: Option<DecodeError>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeWarning {
    LeadingBomStripped,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// Invalid UTF-8 byte sequence (overlong, surrogate half, or
    /// out-of-range codepoint) at the given byte offset.
    InvalidUtf8 { offset: usize },
    /// A byte-order mark appeared after the start of the file.
    EmbeddedBom { offset: usize },
}

const BOM_BYTES: [u8; 3] = [0xEF, 0xBB, 0xBF];
const BOM_CHAR: char = '\u{feff}';

/// Decodes `bytes` per §4.1: strips a leading BOM (warning), rejects an
/// embedded BOM (error, stop), validates UTF-8 (rejecting overlongs,
/// surrogate halves, and out-of-range scalars — `std::str::from_utf8` only
/// ever accepts canonical encodings, so this check is exact), and
/// normalizes CRLF/CR to LF.
pub fn decode(bytes: &[u8]) -> DecodeResult {
    let mut warnings = Vec::new();
    let (body, had_leading_bom) = if bytes.starts_with(&BOM_BYTES) {
        (&bytes[BOM_BYTES.len()..], true)
    } else {
        (bytes, false)
    };
    if had_leading_bom {
        warnings.push(DecodeWarning::LeadingBomStripped);
    }

    let decoded = match std::str::from_utf8(body) {
        Ok(s) => s,
        Err(e) => {
            let offset = e.valid_up_to() + if had_leading_bom { BOM_BYTES.len() } else { 0 };
            return DecodeResult {
                ok: false,
                text: String::new(),
                warnings,
                error: Some(DecodeError::InvalidUtf8 { offset }),
            };
        }
    };

    if let Some(rel) = decoded.find(BOM_CHAR) {
        let offset = rel + if had_leading_bom { BOM_BYTES.len() } else { 0 };
        return DecodeResult {
            ok: false,
            text: String::new(),
            warnings,
            error: Some(DecodeError::EmbeddedBom { offset }),
        };
    }

    DecodeResult {
        ok: true,
        text: normalize_newlines(decoded),
        warnings,
        error: None,
    }
}

/// Normalizes `\r\n` and bare `\r` to `\n`.
pub fn normalize_newlines(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\r' {
            if chars.peek() == Some(&'\n') {
                chars.next();
            }
            out.push('\n');
        } else {
            out.push(c);
        }
    }
    out
}

/// §4.1(a): identifier-start codepoint, `XID_Start ∪ {'_'}`.
pub fn is_id_start(c: char) -> bool {
    c == '_' || is_xid_start(c)
}

/// §4.1(b): identifier-continue codepoint, `XID_Continue ∪ {'_'}`.
pub fn is_id_continue(c: char) -> bool {
    c == '_' || is_xid_continue(c)
}

/// §4.1(c): noncharacter codepoints (FDD0–FDEF, and the final two code
/// points of every plane: `xxFFFE`/`xxFFFF`).
pub fn is_noncharacter(c: char) -> bool {
    let cp = c as u32;
    (0xFDD0..=0xFDEF).contains(&cp) || (cp & 0xFFFE) == 0xFFFE
}

/// §4.1(d): sensitive codepoints — bidi controls and zero-width joiners.
pub fn is_sensitive(c: char) -> bool {
    matches!(
        c as u32,
        0x200B..=0x200F | 0x202A..=0x202E | 0x2066..=0x2069 | 0x061C
    )
}

/// §4.1(e): prohibited codepoints — C0/C1 controls except TAB/LF/FF/CR.
pub fn is_prohibited(c: char) -> bool {
    let cp = c as u32;
    let is_c0_or_c1 = cp <= 0x1F || (0x80..=0x9F).contains(&cp);
    if !is_c0_or_c1 {
        return false;
    }
    !matches!(c, '\t' | '\n' | '\u{0c}' | '\r')
}

/// A half-open byte-offset range identifying a string or character literal,
/// within which the prohibited-codepoint scan does not apply.
#[derive(Debug, Clone, Copy)]
pub struct LiteralSpan {
    pub start: usize,
    pub end: usize,
}

/// §4.1: scans `text` for prohibited codepoints outside every span in
/// `literal_spans`, returning each violation's byte offset and codepoint.
///
/// §8 testable property: for any scalar `IsProhibited` outside every
/// literal span, the result is non-empty (`NoProhibited = false`).
pub fn scan_prohibited(text: &str, literal_spans: &[LiteralSpan]) -> Vec<(usize, char)> {
    let mut violations = Vec::new();
    for (offset, c) in text.char_indices() {
        if !is_prohibited(c) {
            continue;
        }
        let inside_literal = literal_spans.iter().any(|s| offset >= s.start && offset < s.end);
        if !inside_literal {
            violations.push((offset, c));
        }
    }
    violations
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_strips_leading_bom_with_warning() {
        let mut bytes = BOM_BYTES.to_vec();
        bytes.extend_from_slice(b"hello");
        let result = decode(&bytes);
        assert!(result.ok);
        assert_eq!(result.text, "hello");
        assert_eq!(result.warnings, vec![DecodeWarning::LeadingBomStripped]);
    }

    #[test]
    fn decode_rejects_embedded_bom() {
        let bytes = "ab\u{feff}cd".as_bytes();
        let result = decode(bytes);
        assert!(!result.ok);
        assert!(matches!(result.error, Some(DecodeError::EmbeddedBom { .. })));
    }

    #[test]
    fn decode_rejects_invalid_utf8() {
        let bytes = [0x68, 0x65, 0xff, 0x6c, 0x6f];
        let result = decode(&bytes);
        assert!(!result.ok);
        assert!(matches!(result.error, Some(DecodeError::InvalidUtf8 { offset: 2 })));
    }

    #[test]
    fn decode_normalizes_crlf_and_cr() {
        let result = decode(b"a\r\nb\rc\nd");
        assert!(result.ok);
        assert_eq!(result.text, "a\nb\nc\nd");
    }

    #[test]
    fn round_trip_utf8_when_ok() {
        let bytes = "hello \u{1F600}".as_bytes();
        let result = decode(bytes);
        assert!(result.ok);
        assert_eq!(result.text.as_bytes(), bytes);
    }

    #[test]
    fn id_start_accepts_underscore_and_letters() {
        assert!(is_id_start('_'));
        assert!(is_id_start('a'));
        assert!(!is_id_start('1'));
    }

    #[test]
    fn id_continue_accepts_digits() {
        assert!(is_id_continue('1'));
        assert!(is_id_continue('_'));
    }

    #[test]
    fn noncharacter_detects_fdd0_range_and_plane_final() {
        assert!(is_noncharacter('\u{FDD0}'));
        assert!(is_noncharacter('\u{FDEF}'));
        assert!(is_noncharacter('\u{FFFE}'));
        assert!(is_noncharacter('\u{1FFFF}'));
        assert!(!is_noncharacter('\u{FDCF}'));
    }

    #[test]
    fn prohibited_excludes_tab_lf_ff_cr() {
        assert!(!is_prohibited('\t'));
        assert!(!is_prohibited('\n'));
        assert!(!is_prohibited('\u{0c}'));
        assert!(!is_prohibited('\r'));
        assert!(is_prohibited('\u{01}'));
        assert!(is_prohibited('\u{85}'));
    }

    #[test]
    fn scan_prohibited_ignores_codepoints_inside_literal_spans() {
        let text = "x\u{01}y";
        let spans = [LiteralSpan { start: 1, end: 3 }];
        assert!(scan_prohibited(text, &spans).is_empty());
        assert_eq!(scan_prohibited(text, &[]).len(), 1);
    }
}
