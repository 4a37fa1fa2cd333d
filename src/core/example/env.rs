//! `KEY=value` redaction for dotenv and ini files.

use std::sync::OnceLock;

use regex::Regex;

use super::split_eol;
use crate::core::constants::PLACEHOLDER;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Dialect {
    /// `export KEY=value`, `#` comments
    Env,
    /// `key = value` or `key: value`, `#` and `;` comments
    Ini,
}

impl Dialect {
    fn assignment(self) -> &'static Regex {
        static ENV: OnceLock<Regex> = OnceLock::new();
        static INI: OnceLock<Regex> = OnceLock::new();
        match self {
            Self::Env => ENV.get_or_init(|| {
                Regex::new(r"^(\s*(?:export\s+)?[\w.-]+\s*=[ \t]*)(.*)$")
                    .expect("env assignment pattern")
            }),
            Self::Ini => INI.get_or_init(|| {
                Regex::new(r"^(\s*[\w.-]+(?:[ \t]+[\w.-]+)*[ \t]*[=:][ \t]*)(.*)$")
                    .expect("ini assignment pattern")
            }),
        }
    }

    fn is_comment(self, c: char) -> bool {
        c == '#' || (self == Self::Ini && c == ';')
    }
}

/// Replace every assigned value, keeping its quoting and trailing comment.
///
/// Quoted values may span lines; the whole value is consumed. Empty values
/// are left alone.
pub(super) fn redact(content: &str, dialect: Dialect) -> String {
    let assignment = dialect.assignment();
    let mut out = String::with_capacity(content.len());
    let mut lines = content.split_inclusive('\n');

    while let Some(raw) = lines.next() {
        let (line, eol) = split_eol(raw);
        let Some(caps) = assignment.captures(line) else {
            out.push_str(raw);
            continue;
        };
        let prefix = caps.get(1).map_or("", |m| m.as_str());
        let value = caps.get(2).map_or("", |m| m.as_str());

        match value.chars().next() {
            None => out.push_str(raw),
            // only a comment when whitespace separates it from the `=`
            Some(c) if dialect.is_comment(c) && prefix.ends_with(char::is_whitespace) => {
                out.push_str(raw)
            }
            Some(quote @ ('"' | '\'')) => {
                let (rest, end) = match closing(&value[1..], quote) {
                    Some(idx) => (&value[idx + 2..], eol),
                    None => consume_multiline(&mut lines, quote),
                };
                out.push_str(prefix);
                out.push(quote);
                out.push_str(PLACEHOLDER);
                out.push(quote);
                out.push_str(trailing_comment(rest, dialect));
                out.push_str(end);
            }
            Some(_) => {
                out.push_str(prefix);
                out.push_str(PLACEHOLDER);
                out.push_str(inline_comment(value, dialect));
                out.push_str(eol);
            }
        }
    }

    out
}

/// Skip lines up to the one closing a quoted value; returns what follows it.
fn consume_multiline<'a>(
    lines: &mut impl Iterator<Item = &'a str>,
    quote: char,
) -> (&'a str, &'a str) {
    for raw in lines.by_ref() {
        let (line, eol) = split_eol(raw);
        if let Some(idx) = closing(line, quote) {
            return (&line[idx + 1..], eol);
        }
    }
    // unterminated: the rest of the file was the value
    ("", "")
}

/// Byte index of the quote closing a value that started just before `s`.
fn closing(s: &str, quote: char) -> Option<usize> {
    let mut escaped = false;
    for (idx, c) in s.char_indices() {
        if escaped {
            escaped = false;
        } else if c == '\\' && quote == '"' {
            escaped = true;
        } else if c == quote {
            return Some(idx);
        }
    }
    None
}

/// Text after a closing quote, kept only if it is a separated comment.
fn trailing_comment(rest: &str, dialect: Dialect) -> &str {
    let trimmed = rest.trim_start();
    match trimmed.chars().next() {
        Some(c) if dialect.is_comment(c) && trimmed.len() < rest.len() => rest,
        _ => "",
    }
}

/// Comment following a bare value, with its leading whitespace.
fn inline_comment(value: &str, dialect: Dialect) -> &str {
    let mut prev_space = false;
    for (idx, c) in value.char_indices() {
        if prev_space && dialect.is_comment(c) {
            let start = value[..idx].trim_end().len();
            return &value[start..];
        }
        prev_space = c.is_whitespace();
    }
    ""
}
