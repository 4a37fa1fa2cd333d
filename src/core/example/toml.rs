//! TOML redaction.
//!
//! Every string literal on the value side of an assignment is replaced in its
//! own quote style (`"…"`, `'…'`, `"""…"""`, `'''…'''`). Keys, table headers,
//! comments and non-string values are kept. Values may span lines inside
//! arrays, inline tables and multi-line strings.

use crate::core::constants::PLACEHOLDER;

struct Scanner<'a> {
    chars: &'a [char],
    pos: usize,
    out: String,
}

impl<'a> Scanner<'a> {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn starts_with(&self, pattern: &str) -> bool {
        pattern
            .chars()
            .enumerate()
            .all(|(i, c)| self.chars.get(self.pos + i) == Some(&c))
    }

    /// Copy input up to (not including) the next newline.
    fn copy_line(&mut self) {
        while let Some(c) = self.peek() {
            if c == '\n' {
                break;
            }
            self.out.push(c);
            self.pos += 1;
        }
    }

    /// Copy one character.
    fn copy(&mut self) {
        if let Some(c) = self.peek() {
            self.out.push(c);
            self.pos += 1;
        }
    }

    /// Copy a key up to and including `=`. Returns false if the line ended first.
    fn copy_key(&mut self) -> bool {
        while let Some(c) = self.peek() {
            match c {
                '\n' => return false,
                '=' => {
                    self.copy();
                    return true;
                }
                '"' | '\'' => {
                    let end = self.string_end(c, false);
                    self.out.extend(&self.chars[self.pos..end]);
                    self.pos = end;
                }
                _ => self.copy(),
            }
        }
        false
    }

    /// Index just past the string opening at the cursor.
    fn string_end(&self, quote: char, multiline: bool) -> usize {
        let escapes = quote == '"';
        let mut i = self.pos + if multiline { 3 } else { 1 };
        while i < self.chars.len() {
            let c = self.chars[i];
            if escapes && c == '\\' {
                i += 2;
                continue;
            }
            if !multiline && c == '\n' {
                return i;
            }
            if c == quote {
                if !multiline {
                    return i + 1;
                }
                if self.chars.get(i + 1) == Some(&quote) && self.chars.get(i + 2) == Some(&quote) {
                    // up to two quotes may belong to the content
                    let mut end = i + 3;
                    while end < self.chars.len() && self.chars[end] == quote && end < i + 5 {
                        end += 1;
                    }
                    return end;
                }
            }
            i += 1;
        }
        self.chars.len()
    }

    /// Whether the next non-blank character after `end` makes the string a key.
    fn is_key(&self, end: usize) -> bool {
        matches!(
            self.chars[end.min(self.chars.len())..]
                .iter()
                .find(|c| **c != ' ' && **c != '\t')
                .copied(),
            Some('=') | Some('.')
        )
    }

    /// Copy an assignment's value, redacting its strings.
    fn value(&mut self) {
        let mut depth = 0usize;
        while let Some(c) = self.peek() {
            match c {
                '\n' if depth == 0 => return,
                '#' => self.copy_line(),
                '[' | '{' => {
                    depth += 1;
                    self.copy();
                }
                ']' | '}' => {
                    depth = depth.saturating_sub(1);
                    self.copy();
                }
                '"' | '\'' => self.string(c),
                _ => self.copy(),
            }
        }
    }

    fn string(&mut self, quote: char) {
        let delimiter: String = std::iter::repeat(quote).take(3).collect();
        let multiline = self.starts_with(&delimiter);
        let end = self.string_end(quote, multiline);

        if !multiline && self.is_key(end) {
            self.out.extend(&self.chars[self.pos..end]);
        } else {
            let fence = if multiline { delimiter.as_str() } else { &delimiter[..1] };
            self.out.push_str(fence);
            self.out.push_str(PLACEHOLDER);
            self.out.push_str(fence);
        }
        self.pos = end;
    }
}

pub(super) fn redact(content: &str) -> String {
    let chars: Vec<char> = content.chars().collect();
    let mut scanner = Scanner {
        chars: &chars,
        pos: 0,
        out: String::with_capacity(content.len()),
    };

    while let Some(c) = scanner.peek() {
        match c {
            ' ' | '\t' | '\r' | '\n' => scanner.copy(),
            '#' | '[' => scanner.copy_line(),
            _ => {
                if scanner.copy_key() {
                    scanner.value();
                }
            }
        }
    }

    scanner.out
}
