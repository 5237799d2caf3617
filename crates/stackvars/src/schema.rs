//! Schema files (`variables.tf`)
//!
//! Only defaults are extracted from variable declarations. Two forms are understood:
//!
//! ```hcl
//! variable "tags" {
//!   type = map(string)
//!   default = {
//!     team = "core"
//!   }
//! }
//!
//! variable "scaling" {
//!   type = object({
//!     replicas = optional(number, 3)
//!     policy   = optional(string, "cpu")
//!     name     = string
//!   })
//! }
//! ```
//!
//! The first yields `tags = { team = "core" }`, the second `scaling = { replicas = 3, policy = "cpu" }`.
//! An explicit `default` always wins over defaults collected from `optional(..)` fields.
//!
//! Every scope (variable block, default literal, object type) is closed by bracket balance, see
//! [Balance]. Lines in nested blocks such as `validation { .. }` are not inspected.
use crate::scan::{self, Balance};
use crate::sources::{self, LoadError};
use crate::value::{is_name_char, Map, Name, Scalar, Value, Variables};
use std::path::Path;

#[derive(Debug)]
enum State {
    TopLevel(Balance),
    /// `variable "name"` with the opening brace still to come
    VariableHeader(Name),
    InVariableBlock(VariableBlock),
    InDefaultBlock(VariableBlock, OpenLiteral),
    InTypeBlock(VariableBlock, OpenLiteral),
}

#[derive(Debug)]
struct VariableBlock {
    name: Name,
    balance: Balance,
    /// set once an explicit `default` was seen
    has_default: bool,
}

#[derive(Debug)]
struct OpenLiteral {
    kind: LiteralKind,
    buffer: String,
    balance: Balance,
}

#[derive(Debug, Clone, Copy)]
enum LiteralKind {
    List,
    Map,
    Object,
}

/// Scanner for schema files
#[derive(Debug, Default)]
pub struct SchemaParser {}

impl SchemaParser {
    pub fn new() -> Self {
        Self {}
    }

    /// Parses a schema file
    ///
    /// A missing file is not an error, it contributes no defaults.
    #[tracing::instrument(level = "debug", skip_all, fields(path = %path.display()))]
    pub fn parse_file(&self, path: &Path) -> Result<Variables, LoadError> {
        match sources::read_source(path)? {
            Some(text) => Ok(self.parse_str(&text)),
            None => Ok(Variables::new()),
        }
    }

    #[tracing::instrument(level = "debug", skip_all)]
    pub fn parse_str(&self, text: &str) -> Variables {
        let mut defaults = Variables::new();
        let mut state = State::TopLevel(Balance::default());
        let mut heredoc: Option<&str> = None;

        for line in text.lines() {
            if let Some(terminator) = heredoc {
                if line.trim() == terminator {
                    heredoc = None;
                }
                continue;
            }

            let mut line = scan::strip_comment(line);
            if let Some((start, terminator)) = scan::heredoc_start(line) {
                tracing::trace!(terminator, "skipping heredoc");
                heredoc = Some(terminator);
                line = line[..start].trim_end();
            }
            if line.is_empty() {
                continue;
            }

            // a new variable always starts at the top level, even if the previous block is broken
            if !matches!(state, State::TopLevel(_)) && variable_header(line).is_some() {
                state.warn_unterminated();
                state = State::TopLevel(Balance::default());
            }

            state = match state {
                State::TopLevel(balance) => top_level(balance, line, &mut defaults),
                State::VariableHeader(name) => match line.strip_prefix('{') {
                    Some(body) => open_block(name, body.trim(), &mut defaults),
                    None => {
                        tracing::debug!(%name, line, "skipping variable without body");
                        top_level(Balance::default(), line, &mut defaults)
                    }
                },
                State::InVariableBlock(block) => variable_body(block, line, &mut defaults),
                State::InDefaultBlock(block, literal) => {
                    continue_literal(block, literal, line, &mut defaults, State::InDefaultBlock)
                }
                State::InTypeBlock(block, literal) => {
                    continue_literal(block, literal, line, &mut defaults, State::InTypeBlock)
                }
            };
        }

        state.warn_unterminated();
        defaults
    }
}

impl State {
    fn warn_unterminated(&self) {
        let name = match self {
            State::TopLevel(_) => return,
            State::VariableHeader(name) => name,
            State::InVariableBlock(block)
            | State::InDefaultBlock(block, _)
            | State::InTypeBlock(block, _) => &block.name,
        };
        tracing::warn!(%name, "unterminated variable block");
    }
}

fn top_level(mut balance: Balance, line: &str, defaults: &mut Variables) -> State {
    if balance.depth() == 0 {
        if let Some((name, rest)) = variable_header(line) {
            if rest.is_empty() {
                tracing::trace!(%name, "variable header, body on next line");
                return State::VariableHeader(name);
            }
            match rest.strip_prefix('{') {
                Some(body) => return open_block(name, body.trim(), defaults),
                None => tracing::debug!(%name, line, "skipping variable without body"),
            }
        }
    }

    // other top level blocks (locals, outputs, ...) are skipped as a whole
    let _ = balance.close_in(line);
    State::TopLevel(balance)
}

fn open_block(name: Name, body: &str, defaults: &mut Variables) -> State {
    tracing::trace!(%name, "variable block");
    let block = VariableBlock {
        name,
        balance: Balance::default(),
        has_default: false,
    };

    if body.is_empty() {
        State::InVariableBlock(block)
    } else {
        variable_body(block, body, defaults)
    }
}

/// Parses `variable "name"` and returns the name and the (trimmed) rest of the line
fn variable_header(line: &str) -> Option<(Name, &str)> {
    let rest = line.strip_prefix("variable")?;
    if !rest.starts_with([' ', '\t', '"']) {
        return None;
    }
    let rest = rest.trim_start();

    let (name, rest) = if rest.starts_with('"') {
        scan::read_quoted(rest)?
    } else {
        let end = rest.find(|c: char| !is_name_char(c)).unwrap_or(rest.len());
        (rest[..end].to_string(), &rest[end..])
    };

    let Ok(name) = Name::new(name) else {
        tracing::debug!(line, "skipping variable with invalid name");
        return None;
    };

    Some((name, rest.trim()))
}

fn variable_body(mut block: VariableBlock, line: &str, defaults: &mut Variables) -> State {
    let direct_child = block.balance.depth() == 0;

    // where (if at all) the variable block closes on this line
    let mut peek = block.balance.clone();
    let close = peek.close_in(line);
    let segment = close.map_or(line, |end| &line[..end]).trim();

    if direct_child {
        if let Some((key, rhs)) = scan::split_assignment(segment) {
            match key.as_str() {
                "default" => {
                    block.has_default = true;
                    if let Some(literal) = default_value(&block.name, rhs, defaults) {
                        return State::InDefaultBlock(block, literal);
                    }
                }
                "type" if !block.has_default => {
                    if let Some(literal) = object_type(&block.name, rhs, defaults) {
                        // brackets opened before `object(`, as in `list(object({`
                        let prefix = rhs.find("object(").map_or("", |start| &rhs[..start]);
                        let _ = block.balance.close_in(prefix);
                        return State::InTypeBlock(block, literal);
                    }
                }
                _ => {}
            }
        }
    }

    block.balance = peek;
    match close {
        Some(_) => {
            tracing::trace!(name = %block.name, "variable block closed");
            State::TopLevel(Balance::default())
        }
        None => State::InVariableBlock(block),
    }
}

/// Appends a line to an open default or type literal
///
/// Once the literal closes, the remainder of the line belongs to the variable block again.
fn continue_literal(
    mut block: VariableBlock,
    mut literal: OpenLiteral,
    line: &str,
    defaults: &mut Variables,
    reopen: fn(VariableBlock, OpenLiteral) -> State,
) -> State {
    literal.buffer.push('\n');

    let Some(end) = literal.balance.close_in(line) else {
        literal.buffer.push_str(line);
        return reopen(block, literal);
    };
    literal.buffer.push_str(&line[..end]);

    finish_literal(&block.name, literal, defaults);

    let rest = &line[end + 1..];
    match block.balance.close_in(rest) {
        Some(_) => State::TopLevel(Balance::default()),
        None => State::InVariableBlock(block),
    }
}

/// Handles `default = <rhs>`
///
/// Returns the open literal when `rhs` starts a list or map that continues on the next lines.
fn default_value(name: &Name, rhs: &str, defaults: &mut Variables) -> Option<OpenLiteral> {
    let kind = if rhs.starts_with('{') {
        LiteralKind::Map
    } else if rhs.starts_with('[') {
        LiteralKind::List
    } else {
        if rhs == "null" {
            tracing::debug!(%name, "null default");
            defaults.shift_remove(name);
            return None;
        }

        match scan::parse_scalar(rhs) {
            Some(scalar) => insert(defaults, name, scalar.into()),
            None => tracing::debug!(%name, rhs, "skipping unrecognized default"),
        }
        return None;
    };

    start_literal(name, kind, &rhs[1..], defaults)
}

/// Handles `type = <rhs>` when `rhs` contains an object type
fn object_type(name: &Name, rhs: &str, defaults: &mut Variables) -> Option<OpenLiteral> {
    let start = rhs.find("object(")? + "object(".len();
    start_literal(name, LiteralKind::Object, &rhs[start..], defaults)
}

/// Starts a literal with the text following its opening bracket
///
/// A literal that closes within `text` is finished right away, otherwise the open literal is
/// returned.
fn start_literal(
    name: &Name,
    kind: LiteralKind,
    text: &str,
    defaults: &mut Variables,
) -> Option<OpenLiteral> {
    let mut literal = OpenLiteral {
        kind,
        buffer: String::new(),
        balance: Balance::default(),
    };

    match literal.balance.close_in(text) {
        Some(end) => {
            literal.buffer.push_str(&text[..end]);
            finish_literal(name, literal, defaults);
            None
        }
        None => {
            literal.buffer.push_str(text);
            Some(literal)
        }
    }
}

fn finish_literal(name: &Name, literal: OpenLiteral, defaults: &mut Variables) {
    match literal.kind {
        LiteralKind::List => {
            insert(defaults, name, Value::List(scan::parse_list(&literal.buffer)));
        }
        LiteralKind::Map => {
            let map = scan::parse_map(&literal.buffer, default_scalar);
            insert(defaults, name, Value::Map(map));
        }
        LiteralKind::Object => {
            let map = optional_defaults(&literal.buffer);
            if map.is_empty() {
                tracing::debug!(%name, "object type without optional defaults");
                return;
            }
            insert(defaults, name, Value::Map(map));
        }
    }
}

fn insert(defaults: &mut Variables, name: &Name, value: Value) {
    tracing::debug!(%name, kind = %value.kind(), "found default");
    defaults.insert(name.clone(), value);
}

/// Types a value inside a `default = { .. }` map
///
/// Quoted strings, bools, numbers with a `.`, integers in that order. Anything else is kept as
/// plain text.
fn default_scalar(value: &str) -> Option<Scalar> {
    if value.starts_with('"') && value.ends_with('"') && value.len() >= 2 {
        return Some(match scan::read_quoted(value) {
            Some((s, rest)) if rest.is_empty() => Scalar::String(s),
            _ => Scalar::String(value.trim_matches('"').to_string()),
        });
    }

    if value == "true" || value == "false" {
        return Some(Scalar::Bool(value == "true"));
    }

    let number = if value.contains('.') {
        value.parse::<f64>().ok()
    } else {
        value.parse::<i64>().ok().map(|int| int as f64)
    };

    Some(match number {
        Some(number) => Scalar::Number(number),
        None => Scalar::String(value.trim_matches('"').to_string()),
    })
}

/// Collects `field = optional(type, default)` defaults from the inside of `object(..)`
fn optional_defaults(content: &str) -> Map {
    const OPTIONAL: &str = "optional(";
    let mut defaults = Map::new();

    let mut offset = 0;
    while let Some(found) = content[offset..].find(OPTIONAL) {
        let start = offset + found;
        let args_start = start + OPTIONAL.len();
        offset = args_start;

        let Some(field) = field_name(&content[..start]) else {
            continue;
        };

        let args = &content[args_start..];
        let Some(default) = optional_default_text(args) else {
            tracing::trace!(field, "optional field without default");
            continue;
        };

        match optional_scalar(default) {
            Some(scalar) => {
                tracing::trace!(field, ?scalar, "optional default");
                defaults.insert(field.to_string(), scalar);
            }
            None => tracing::debug!(field, default, "skipping unsupported optional default"),
        }
    }

    defaults
}

/// The identifier directly left of `= optional(`
fn field_name(before: &str) -> Option<&str> {
    let before = before.trim_end().strip_suffix('=')?.trim_end();
    let start = before
        .rfind(|c: char| !is_name_char(c))
        .map_or(0, |index| index + 1);
    let field = &before[start..];
    (!field.is_empty()).then_some(field)
}

/// Text after the first top level comma of `optional(..)` up to its closing parenthesis
fn optional_default_text(args: &str) -> Option<&str> {
    let mut balance = Balance::default();
    let end = balance.close_in(args)?;
    let args = &args[..end];

    let comma = scan::find_top_level(args, ',')?;
    Some(args[comma + 1..].trim())
}

/// Types an `optional(..)` default: bool, quoted string, integer, decimal
fn optional_scalar(text: &str) -> Option<Scalar> {
    if text == "true" || text == "false" {
        return Some(Scalar::Bool(text == "true"));
    }

    if text.starts_with('"') {
        return match scan::read_quoted(text) {
            Some((s, rest)) if rest.is_empty() => Some(Scalar::String(s)),
            _ => None,
        };
    }

    let is_digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
    let numeric = match text.split_once('.') {
        None => is_digits(text),
        Some((integral, fraction)) => is_digits(integral) && is_digits(fraction),
    };

    if numeric {
        return text.parse().ok().map(Scalar::Number);
    }

    None
}
