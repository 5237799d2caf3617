//! `NAME=VALUE` overrides given on the command line
//!
//! The value is read like the right hand side of a definition file line, so `replicas=3` is a
//! number and `zones=["a", "b"]` a list. Anything that is not a literal is taken verbatim as a
//! string: `env=prod` sets `env = "prod"`. Placeholders are expanded either way.
use crate::definitions::DefinitionParser;
use crate::expansion::Expansions;
use crate::value::{Name, NameError, Value, Variables};

/// Parses a single `NAME=VALUE` argument
pub fn parse_override(argument: &str, expansions: &Expansions) -> Result<(Name, Value), OverrideError> {
    let (name, value) = argument
        .split_once('=')
        .ok_or_else(|| OverrideError::MissingEquals(argument.to_string()))?;

    let name = Name::new(name.trim()).map_err(|source| OverrideError::InvalidName {
        argument: argument.to_string(),
        source,
    })?;

    let value = DefinitionParser::new(expansions)
        .value(value)
        .unwrap_or_else(|| Value::String(expansions.expand(value).into_owned()));

    Ok((name, value))
}

/// Parses all overrides, later arguments win over earlier ones
pub fn parse_overrides<'a>(
    arguments: impl IntoIterator<Item = &'a str>,
    expansions: &Expansions,
) -> Result<Variables, OverrideError> {
    let mut variables = Variables::new();
    for argument in arguments {
        let (name, value) = parse_override(argument, expansions)?;
        variables.insert(name, value);
    }
    Ok(variables)
}

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum OverrideError {
    #[error("Expected NAME=VALUE, got {0:?}")]
    MissingEquals(String),
    #[error("Invalid variable name in {argument:?}")]
    InvalidName {
        argument: String,
        #[source]
        source: NameError,
    },
}
