//! YAML redaction.
//!
//! Line based. A `key:` with a value on the same line has that value
//! replaced, whatever its style: plain, quoted, block (`|`, `>`) or flow.
//! Lines belonging to the replaced value (block bodies, continuations,
//! unfinished quotes and flow collections) are dropped. Mapping parents,
//! comments and document markers are kept.

use std::sync::OnceLock;

use regex::Regex;

use super::split_eol;
use crate::core::constants::PLACEHOLDER;

/// What the lines after a redacted value belong to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Skip {
    None,
    /// Lines indented past this column
    Deeper(usize),
    /// An open quoted scalar
    Quoted(char),
    /// An open flow collection, by nesting depth
    Flow(usize),
}

fn key_line() -> &'static Regex {
    static KEY: OnceLock<Regex> = OnceLock::new();
    KEY.get_or_init(|| {
        Regex::new(
            r#"^(?P<head>(?P<lead>[ \t]*(?:-[ \t]+)*)(?:"(?:[^"\\]|\\.)*"|'(?:[^']|'')*'|[^\s#'"\[\]{},:&*!|>%@`-][^#:]*?|-[^\s#:][^#:]*?)[ \t]*:)(?P<rest>(?:[ \t].*)?)$"#,
        )
        .expect("yaml key pattern")
    })
}

fn sequence_item() -> &'static Regex {
    static ITEM: OnceLock<Regex> = OnceLock::new();
    ITEM.get_or_init(|| {
        Regex::new(r"^(?P<lead>[ \t]*(?:-[ \t]+)+)(?P<value>.*)$").expect("yaml item pattern")
    })
}

pub(super) fn redact(content: &str) -> String {
    let mut out = String::with_capacity(content.len());
    let mut skip = Skip::None;
    let mut blanks: Vec<&str> = Vec::new();

    for raw in content.split_inclusive('\n') {
        let (line, eol) = split_eol(raw);

        match skip {
            Skip::Quoted(quote) => {
                if quote_end(line, quote).is_some() {
                    skip = Skip::None;
                }
                continue;
            }
            Skip::Flow(depth) => {
                skip = match flow_depth(line, depth) {
                    0 => Skip::None,
                    d => Skip::Flow(d),
                };
                continue;
            }
            Skip::Deeper(column) => {
                if line.trim().is_empty() {
                    blanks.push(raw);
                    continue;
                }
                if indent(line) > column {
                    blanks.clear();
                    continue;
                }
                out.extend(blanks.drain(..));
            }
            Skip::None => {}
        }

        let (text, next) = redact_line(line);
        out.push_str(&text);
        out.push_str(eol);
        skip = next;
    }

    out.extend(blanks);
    out
}

fn redact_line(line: &str) -> (String, Skip) {
    let trimmed = line.trim_start();
    if trimmed.is_empty() || trimmed.starts_with('#') || trimmed == "-" || is_marker(trimmed) {
        return (line.to_string(), Skip::None);
    }

    if let Some(caps) = key_line().captures(line) {
        let head = caps.name("head").map_or("", |m| m.as_str());
        let lead = caps.name("lead").map_or("", |m| m.as_str());
        let rest = caps.name("rest").map_or("", |m| m.as_str());
        let value = rest.trim_start();
        let gap = &rest[..rest.len() - value.len()];
        return redact_value(line, &format!("{}{}", head, gap), value, lead.chars().count());
    }

    if let Some(caps) = sequence_item().captures(line) {
        let lead = caps.name("lead").map_or("", |m| m.as_str());
        let value = caps.name("value").map_or("", |m| m.as_str());
        return redact_value(line, lead, value, indent(line));
    }

    // a bare scalar line, e.g. the continuation of a multi-line value
    let margin = &line[..line.len() - trimmed.len()];
    (format!("{}{}", margin, PLACEHOLDER), Skip::Deeper(indent(line)))
}

/// Replace `value`, which follows `prefix` on `line` and belongs to an
/// entry at `column`.
fn redact_value(line: &str, prefix: &str, value: &str, column: usize) -> (String, Skip) {
    let value = strip_properties(value);
    if value.is_empty() || value.starts_with('#') {
        // mapping or sequence parent
        return (line.to_string(), Skip::None);
    }

    let skip = match value.chars().next() {
        Some(quote @ ('"' | '\'')) => match quote_end(&value[1..], quote) {
            Some(_) => Skip::Deeper(column),
            None => Skip::Quoted(quote),
        },
        Some('[' | '{') => match flow_depth(value, 0) {
            0 => Skip::Deeper(column),
            d => Skip::Flow(d),
        },
        _ => Skip::Deeper(column),
    };

    (format!("{}{}", prefix, PLACEHOLDER), skip)
}

/// Drop leading `&anchor` and `!tag` properties.
fn strip_properties(mut value: &str) -> &str {
    while value.starts_with('&') || value.starts_with('!') {
        let end = value.find(char::is_whitespace).unwrap_or(value.len());
        value = value[end..].trim_start();
    }
    value
}

fn is_marker(trimmed: &str) -> bool {
    trimmed == "---" || trimmed == "..." || trimmed.starts_with("--- #") || trimmed.starts_with('%')
}

fn indent(line: &str) -> usize {
    line.chars().take_while(|c| c.is_whitespace()).count()
}

/// Byte index of the closing quote in `s`, which follows an opening quote.
fn quote_end(s: &str, quote: char) -> Option<usize> {
    let mut chars = s.char_indices().peekable();
    while let Some((idx, c)) = chars.next() {
        match c {
            '\\' if quote == '"' => {
                chars.next();
            }
            c if c == quote => {
                if quote == '\'' && chars.peek().map(|(_, n)| *n) == Some('\'') {
                    chars.next();
                } else {
                    return Some(idx);
                }
            }
            _ => {}
        }
    }
    None
}

/// Flow nesting depth after scanning `s`, starting from `depth`.
fn flow_depth(s: &str, mut depth: usize) -> usize {
    let mut quote: Option<char> = None;
    let mut prev = ' ';
    let mut chars = s.chars();

    while let Some(c) = chars.next() {
        match quote {
            Some('"') if c == '\\' => {
                chars.next();
            }
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None => match c {
                '"' | '\'' => quote = Some(c),
                '[' | '{' => depth += 1,
                ']' | '}' => depth = depth.saturating_sub(1),
                '#' if prev.is_whitespace() => break,
                _ => {}
            },
        }
        prev = c;
    }
    depth
}
