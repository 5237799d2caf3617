//! Rendering a [CompilationSet] as a tfvars file
//!
//! ```hcl
//! allowed_cidrs = ["10.0.0.0/16", "192.168.0.0/24"]
//! enabled = true
//! region = "us-gov-west-1"
//! replicas = 3
//! tags = {
//!   env = "prod"
//!   team = "core"
//! }
//! ```
//!
//! Variables are sorted by name. Map entries keep the order they were first seen in. List items
//! are always written as strings.
use crate::merge::CompilationSet;
use crate::value::{is_name_char, Scalar, Value};
use std::fmt::{self, Display, Formatter, Write};

const HEADER: &str = "# Compiled variables from multiple tfvars files\n# Generated by stackvars\n";

impl CompilationSet {
    /// Renders the tfvars file content
    pub fn render(&self) -> String {
        self.to_string()
    }
}

impl Display for CompilationSet {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(HEADER)?;
        for (name, value) in self.sorted() {
            writeln!(f)?;
            write!(f, "{name} = {value}")?;
        }
        writeln!(f)
    }
}

/// Renders the right hand side of an assignment
impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => write_quoted(f, s),
            Value::Number(n) => write!(f, "{n}"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::List(items) => {
                f.write_char('[')?;
                for (index, item) in items.iter().enumerate() {
                    if index > 0 {
                        f.write_str(", ")?;
                    }
                    match item {
                        Scalar::String(s) => write_quoted(f, s)?,
                        other => write!(f, "\"{other}\"")?,
                    }
                }
                f.write_char(']')
            }
            Value::Map(map) if map.is_empty() => f.write_str("{}"),
            Value::Map(map) => {
                f.write_str("{\n")?;
                for (key, value) in map {
                    f.write_str("  ")?;
                    write_key(f, key)?;
                    writeln!(f, " = {value}")?;
                }
                f.write_char('}')
            }
        }
    }
}

impl Display for Scalar {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::String(s) => write_quoted(f, s),
            Scalar::Number(n) => write!(f, "{n}"),
            Scalar::Bool(b) => write!(f, "{b}"),
        }
    }
}

/// Map keys that are not plain names are quoted
fn write_key(f: &mut Formatter<'_>, key: &str) -> fmt::Result {
    if !key.is_empty() && key.chars().all(is_name_char) {
        f.write_str(key)
    } else {
        write_quoted(f, key)
    }
}

fn write_quoted(f: &mut Formatter<'_>, s: &str) -> fmt::Result {
    f.write_char('"')?;
    for c in s.chars() {
        match c {
            '"' => f.write_str("\\\"")?,
            '\\' => f.write_str("\\\\")?,
            '\n' => f.write_str("\\n")?,
            '\r' => f.write_str("\\r")?,
            '\t' => f.write_str("\\t")?,
            c => f.write_char(c)?,
        }
    }
    f.write_char('"')
}
