//! Grapheme-aware string helpers.
//!
//! Strings and characters are immutable and shared as `Rc<str>`. Lengths and
//! indices count extended grapheme clusters, never bytes or code points.

use unicode_segmentation::UnicodeSegmentation;

pub fn grapheme_count(text: &str) -> usize {
    text.graphemes(true).count()
}

pub fn graphemes(text: &str) -> impl Iterator<Item = &str> {
    text.graphemes(true)
}

pub fn grapheme_at(text: &str, index: usize) -> Option<&str> {
    text.graphemes(true).nth(index)
}

/// Whether `text` is exactly one grapheme cluster.
pub fn is_single_grapheme(text: &str) -> bool {
    let mut graphemes = text.graphemes(true);
    graphemes.next().is_some() && graphemes.next().is_none()
}

/// Decode a hex string into bytes. Odd lengths and non-hex digits fail.
pub fn decode_hex(text: &str) -> Option<Vec<u8>> {
    let bytes = text.as_bytes();
    if bytes.len() % 2 != 0 {
        return None;
    }
    bytes
        .chunks(2)
        .map(|pair| {
            let high = (pair[0] as char).to_digit(16)?;
            let low = (pair[1] as char).to_digit(16)?;
            Some((high * 16 + low) as u8)
        })
        .collect()
}

/// Escape a string for display inside double quotes.
pub fn quote(text: &str) -> String {
    let mut quoted = String::with_capacity(text.len() + 2);
    quoted.push('"');
    for c in text.chars() {
        match c {
            '"' => quoted.push_str("\\\""),
            '\\' => quoted.push_str("\\\\"),
            '\n' => quoted.push_str("\\n"),
            '\r' => quoted.push_str("\\r"),
            '\t' => quoted.push_str("\\t"),
            '\0' => quoted.push_str("\\0"),
            c => quoted.push(c),
        }
    }
    quoted.push('"');
    quoted
}
