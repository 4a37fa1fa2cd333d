//! JSON redaction.
//!
//! A string literal followed by `:` is an object key and survives; every
//! other string literal becomes `"<placeholder>"`. Numbers, booleans, nulls
//! and all structure pass through unchanged. Works on malformed input too.

use crate::core::constants::PLACEHOLDER;

pub(super) fn redact(content: &str) -> String {
    let chars: Vec<char> = content.chars().collect();
    let mut out = String::with_capacity(content.len());
    let mut i = 0;

    while i < chars.len() {
        if chars[i] != '"' {
            out.push(chars[i]);
            i += 1;
            continue;
        }

        let end = string_end(&chars, i);
        if is_key(&chars, end) {
            out.extend(&chars[i..end]);
        } else {
            out.push('"');
            out.push_str(PLACEHOLDER);
            out.push('"');
        }
        i = end;
    }

    out
}

/// Index just past the string literal opening at `start`.
///
/// An unterminated literal runs to the end of input.
fn string_end(chars: &[char], start: usize) -> usize {
    let mut i = start + 1;
    while i < chars.len() {
        match chars[i] {
            '\\' => i += 2,
            '"' => return i + 1,
            _ => i += 1,
        }
    }
    chars.len()
}

fn is_key(chars: &[char], end: usize) -> bool {
    chars[end.min(chars.len())..]
        .iter()
        .find(|c| !c.is_whitespace())
        == Some(&':')
}
