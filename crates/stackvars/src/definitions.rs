//! Definition files (`*.tfvars`)
//!
//! A definition file is a flat list of `name = value` assignments:
//!
//! ```hcl
//! # comments start with # or //
//! region        = "us-gov-west-1"
//! environment   = "<%= expansion(':ENV') %>"
//! replicas      = 3
//! enabled       = true
//! allowed_cidrs = ["10.0.0.0/16", "192.168.0.0/24"]
//! tags = {
//!   team = "core"
//!   env  = "prod"
//! }
//! ```
//!
//! Lines are scanned one at a time. Once a list or map literal is opened every following line is
//! buffered until the line that closes it, then the buffer is parsed as a whole. Lines that match
//! none of the forms above are skipped.
use crate::expansion::Expansions;
use crate::scan::{self, Balance};
use crate::sources::{self, LoadError};
use crate::value::{Name, Value, Variables};
use std::path::Path;

#[derive(Debug)]
enum State {
    TopLevel,
    InList(Literal),
    InMap(Literal),
}

/// An open list or map literal
#[derive(Debug)]
struct Literal {
    name: Name,
    buffer: String,
    balance: Balance,
}

impl Literal {
    /// Starts a literal with the text following its opening bracket
    ///
    /// Returns the literal content instead when the bracket is closed within `text`.
    fn open(name: Name, text: &str) -> Result<(Name, String), Literal> {
        let mut balance = Balance::default();
        match balance.close_in(text) {
            Some(end) => Ok((name, text[..end].to_string())),
            None => Err(Literal {
                name,
                buffer: text.to_string(),
                balance,
            }),
        }
    }

    /// Appends `line`, returns true once the literal is closed
    fn push(&mut self, line: &str) -> bool {
        self.buffer.push('\n');
        match self.balance.close_in(line) {
            Some(end) => {
                self.buffer.push_str(&line[..end]);
                true
            }
            None => {
                self.buffer.push_str(line);
                false
            }
        }
    }
}

/// Scanner for definition files
#[derive(Debug, derive_new::new)]
pub struct DefinitionParser<'e> {
    expansions: &'e Expansions,
}

impl<'e> DefinitionParser<'e> {
    /// Parses a definition file
    ///
    /// A missing file is not an error, it contributes no variables.
    #[tracing::instrument(level = "debug", skip_all, fields(path = %path.display()))]
    pub fn parse_file(&self, path: &Path) -> Result<Variables, LoadError> {
        match sources::read_source(path)? {
            Some(text) => Ok(self.parse_str(&text)),
            None => Ok(Variables::new()),
        }
    }

    #[tracing::instrument(level = "debug", skip_all)]
    pub fn parse_str(&self, text: &str) -> Variables {
        let mut variables = Variables::new();
        let mut state = State::TopLevel;
        let mut heredoc: Option<&str> = None;

        for (line_number, line) in text.lines().enumerate() {
            if let Some(terminator) = heredoc {
                if line.trim() == terminator {
                    heredoc = None;
                }
                continue;
            }

            let mut line = scan::strip_comment(line);
            if let Some((start, terminator)) = scan::heredoc_start(line) {
                tracing::debug!(line = line_number + 1, "skipping heredoc string");
                heredoc = Some(terminator);
                line = line[..start].trim_end();
            }
            if line.is_empty() {
                continue;
            }

            state = match state {
                State::TopLevel => self.top_level(line, &mut variables),
                State::InList(mut literal) => {
                    if !literal.push(line) {
                        State::InList(literal)
                    } else {
                        let value = Value::List(scan::parse_list(&literal.buffer));
                        insert(&mut variables, literal.name, value);
                        State::TopLevel
                    }
                }
                State::InMap(mut literal) => {
                    if !literal.push(line) {
                        State::InMap(literal)
                    } else {
                        let value = Value::Map(scan::parse_map(&literal.buffer, scan::parse_scalar));
                        insert(&mut variables, literal.name, value);
                        State::TopLevel
                    }
                }
            };
            tracing::trace!(line = line_number + 1, ?state);
        }

        match state {
            State::TopLevel => {}
            State::InList(literal) | State::InMap(literal) => {
                tracing::warn!(name = %literal.name, "unterminated literal, variable skipped");
            }
        }

        variables
    }

    fn top_level(&self, line: &str, variables: &mut Variables) -> State {
        let Some((key, rhs)) = scan::split_assignment(line) else {
            tracing::debug!(line, "skipping line that is not an assignment");
            return State::TopLevel;
        };

        let Ok(name) = Name::new(key) else {
            tracing::debug!(line, "skipping assignment with invalid name");
            return State::TopLevel;
        };

        if let Some(content) = rhs.strip_prefix('[') {
            return match Literal::open(name, content) {
                Ok((name, content)) => {
                    insert(variables, name, Value::List(scan::parse_list(&content)));
                    State::TopLevel
                }
                Err(literal) => State::InList(literal),
            };
        }

        if let Some(content) = rhs.strip_prefix('{') {
            return match Literal::open(name, content) {
                Ok((name, content)) => {
                    let map = scan::parse_map(&content, scan::parse_scalar);
                    insert(variables, name, Value::Map(map));
                    State::TopLevel
                }
                Err(literal) => State::InMap(literal),
            };
        }

        match self.value(rhs) {
            Some(value) => insert(variables, name, value),
            None => tracing::debug!(%name, rhs, "skipping unrecognized value"),
        }

        State::TopLevel
    }

    /// Parses a single-line right hand side
    ///
    /// Strings get their placeholders expanded.
    pub(crate) fn value(&self, rhs: &str) -> Option<Value> {
        let rhs = rhs.trim();

        if let Some(content) = rhs.strip_prefix('[') {
            let mut balance = Balance::default();
            let end = balance.close_in(content)?;
            return content[end + 1..]
                .trim()
                .is_empty()
                .then(|| Value::List(scan::parse_list(&content[..end])));
        }

        if let Some(content) = rhs.strip_prefix('{') {
            let mut balance = Balance::default();
            let end = balance.close_in(content)?;
            return content[end + 1..]
                .trim()
                .is_empty()
                .then(|| Value::Map(scan::parse_map(&content[..end], scan::parse_scalar)));
        }

        match Value::from(scan::parse_scalar(rhs)?) {
            Value::String(s) => Some(Value::String(self.expansions.expand(&s).into_owned())),
            value => Some(value),
        }
    }
}

fn insert(variables: &mut Variables, name: Name, value: Value) {
    tracing::trace!(%name, kind = %value.kind(), "found variable");
    variables.insert(name, value);
}
