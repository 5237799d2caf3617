//! Lexical helpers shared by the definition and schema parsers
//!
//! All helpers are aware of double-quoted strings: brackets, commas and comment markers inside a
//! string are never treated as syntax.
use crate::value::{is_name_char, Map, Scalar};

/// Removes a trailing `#` or `//` comment and surrounding whitespace
pub(crate) fn strip_comment(line: &str) -> &str {
    let mut quotes = Quotes::default();
    let bytes = line.as_bytes();

    for (index, c) in line.char_indices() {
        if quotes.advance(c) {
            continue;
        }

        let starts_comment = c == '#' || (c == '/' && bytes.get(index + 1) == Some(&b'/'));
        if starts_comment {
            return line[..index].trim();
        }
    }

    line.trim()
}

/// Tracks whether the scanner is inside a double-quoted string
#[derive(Debug, Default, Clone, Copy)]
struct Quotes {
    quoted: bool,
    escaped: bool,
}

impl Quotes {
    /// Consumes `c` and returns true when it belongs to a string literal
    fn advance(&mut self, c: char) -> bool {
        if self.quoted {
            if self.escaped {
                self.escaped = false;
            } else if c == '\\' {
                self.escaped = true;
            } else if c == '"' {
                self.quoted = false;
            }
            return true;
        }

        if c == '"' {
            self.quoted = true;
            return true;
        }

        false
    }
}

/// Bracket balance across lines
///
/// `{`, `[` and `(` open a level, `}`, `]` and `)` close one. The balance starts just inside some
/// enclosing scope; the bracket that would take it below zero closes that scope.
#[derive(Debug, Default, Clone)]
pub(crate) struct Balance {
    depth: usize,
}

impl Balance {
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Feeds `text` and returns the byte offset of the bracket closing the enclosing scope
    ///
    /// Scanning stops at that bracket, the remainder of `text` is not consumed.
    pub fn close_in(&mut self, text: &str) -> Option<usize> {
        let mut quotes = Quotes::default();
        for (index, c) in text.char_indices() {
            if quotes.advance(c) {
                continue;
            }

            match c {
                '{' | '[' | '(' => self.depth += 1,
                '}' | ']' | ')' => {
                    if self.depth == 0 {
                        return Some(index);
                    }
                    self.depth -= 1;
                }
                _ => {}
            }
        }

        None
    }
}

/// Finds an unquoted `<<EOT` or `<<-EOT` heredoc opener ending `line`
///
/// Returns the byte offset of `<<` and the terminator. Every line up to the terminator belongs to
/// the string and must not be scanned.
pub(crate) fn heredoc_start(line: &str) -> Option<(usize, &str)> {
    let mut quotes = Quotes::default();

    for (index, c) in line.char_indices() {
        if quotes.advance(c) || c != '<' {
            continue;
        }

        let Some(rest) = line[index..].strip_prefix("<<") else {
            continue;
        };
        let rest = rest.strip_prefix('-').unwrap_or(rest);
        let end = rest.find(|c: char| !is_name_char(c)).unwrap_or(rest.len());
        if end > 0 && rest[end..].trim().is_empty() {
            return Some((index, &rest[..end]));
        }
    }

    None
}

/// Splits `text` at commas and newlines that are neither nested in brackets nor quoted
pub(crate) fn split_top_level(text: &str) -> Vec<&str> {
    let mut parts = vec![];
    let mut quotes = Quotes::default();
    let mut depth = 0usize;
    let mut start = 0;

    for (index, c) in text.char_indices() {
        if quotes.advance(c) {
            continue;
        }

        match c {
            '{' | '[' | '(' => depth += 1,
            '}' | ']' | ')' => depth = depth.saturating_sub(1),
            ',' | '\n' if depth == 0 => {
                parts.push(text[start..index].trim());
                start = index + c.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(text[start..].trim());

    parts.retain(|part| !part.is_empty());
    parts
}

/// Byte offset of the first `needle` that is neither nested in brackets nor quoted
pub(crate) fn find_top_level(text: &str, needle: char) -> Option<usize> {
    let mut quotes = Quotes::default();
    let mut depth = 0usize;

    for (index, c) in text.char_indices() {
        if quotes.advance(c) {
            continue;
        }

        match c {
            c if c == needle && depth == 0 => return Some(index),
            '{' | '[' | '(' => depth += 1,
            '}' | ']' | ')' => depth = depth.saturating_sub(1),
            _ => {}
        }
    }

    None
}

/// Splits `key = value` into key and (trimmed) value
///
/// The key is either a bare name or a double-quoted string.
pub(crate) fn split_assignment(text: &str) -> Option<(String, &str)> {
    let text = text.trim_start();

    let (key, rest) = if text.starts_with('"') {
        read_quoted(text)?
    } else {
        let end = text
            .char_indices()
            .find(|(_, c)| !is_name_char(*c))
            .map_or(text.len(), |(index, _)| index);
        if end == 0 {
            return None;
        }
        (text[..end].to_string(), &text[end..])
    };

    let rest = rest.trim_start().strip_prefix('=')?;
    if rest.starts_with('=') {
        // comparison, not an assignment
        return None;
    }

    Some((key, rest.trim()))
}

/// Reads a double-quoted string at the start of `text`
///
/// Returns the unescaped content and the text after the closing quote.
pub(crate) fn read_quoted(text: &str) -> Option<(String, &str)> {
    let inner = text.strip_prefix('"')?;

    let mut value = String::new();
    let mut chars = inner.char_indices();
    while let Some((index, c)) = chars.next() {
        match c {
            '"' => return Some((value, &inner[index + 1..])),
            '\\' => match chars.next() {
                Some((_, 'n')) => value.push('\n'),
                Some((_, 'r')) => value.push('\r'),
                Some((_, 't')) => value.push('\t'),
                Some((_, '"')) => value.push('"'),
                Some((_, '\\')) => value.push('\\'),
                Some((_, other)) => {
                    value.push('\\');
                    value.push(other);
                }
                None => return None,
            },
            c => value.push(c),
        }
    }

    // unterminated
    None
}

/// Reads `-?\d+(\.\d+)?` at the start of `text`
pub(crate) fn read_number(text: &str) -> Option<(f64, &str)> {
    let digits = |s: &str| s.bytes().take_while(u8::is_ascii_digit).count();

    let mut end = usize::from(text.starts_with('-'));
    let integral = digits(&text[end..]);
    if integral == 0 {
        return None;
    }
    end += integral;

    if let Some(fraction) = text[end..].strip_prefix('.') {
        let fractional = digits(fraction);
        if fractional > 0 {
            end += 1 + fractional;
        }
    }

    let rest = &text[end..];
    if rest.starts_with(is_name_char) {
        return None;
    }

    text[..end].parse().ok().map(|number| (number, rest))
}

/// Reads `true` or `false` at the start of `text`
pub(crate) fn read_bool(text: &str) -> Option<(bool, &str)> {
    let (value, rest) = if let Some(rest) = text.strip_prefix("true") {
        (true, rest)
    } else if let Some(rest) = text.strip_prefix("false") {
        (false, rest)
    } else {
        return None;
    };

    if rest.starts_with(is_name_char) {
        return None;
    }

    Some((value, rest))
}

/// Parses a complete scalar literal: a quoted string, a number or a bool
///
/// Anything but whitespace after the literal makes it unrecognized.
pub(crate) fn parse_scalar(text: &str) -> Option<Scalar> {
    let text = text.trim();

    let (scalar, rest) = if text.starts_with('"') {
        read_quoted(text).map(|(s, rest)| (Scalar::String(s), rest))?
    } else if let Some((b, rest)) = read_bool(text) {
        (Scalar::Bool(b), rest)
    } else {
        read_number(text).map(|(n, rest)| (Scalar::Number(n), rest))?
    };

    rest.trim().is_empty().then_some(scalar)
}

/// Parses the inside of a list literal
///
/// Items are trimmed of whitespace and quotes, empty items are dropped. Unquoted numbers and bools
/// keep their type, every other unquoted item is taken as a string.
pub(crate) fn parse_list(content: &str) -> Vec<Scalar> {
    split_top_level(content)
        .into_iter()
        .filter_map(|item| {
            if let Some(scalar) = parse_scalar(item) {
                return match scalar {
                    Scalar::String(s) if s.is_empty() => None,
                    scalar => Some(scalar),
                };
            }

            let item = item.trim_matches('"').trim();
            (!item.is_empty()).then(|| Scalar::String(item.to_string()))
        })
        .collect()
}

/// Parses the inside of a map literal
///
/// Every entry must be `key = value`. Entries whose value is a nested list or map, or that `typed`
/// does not recognize, are skipped.
pub(crate) fn parse_map(content: &str, typed: impl Fn(&str) -> Option<Scalar>) -> Map {
    let mut map = Map::new();

    for entry in split_top_level(content) {
        let entry = strip_comment(entry);
        if entry.is_empty() {
            continue;
        }

        let Some((key, value)) = split_assignment(entry) else {
            tracing::debug!(entry, "skipping map entry that is not an assignment");
            continue;
        };

        if value.starts_with(['{', '[']) {
            tracing::debug!(%key, "skipping nested map entry");
            continue;
        }

        match typed(value) {
            Some(scalar) => {
                map.insert(key, scalar);
            }
            None => tracing::debug!(%key, value, "skipping unrecognized map value"),
        }
    }

    map
}
