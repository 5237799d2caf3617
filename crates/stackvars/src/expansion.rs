//! `<%= expansion('TOKEN') %>` placeholders
//!
//! Variable files written for terraspace-style tooling may contain placeholders of this form inside
//! string values. They are substituted while parsing, from a table the host passes in. Tokens the
//! table does not know about are left untouched.
use std::borrow::Cow;
use std::collections::HashMap;

/// Token that resolves to the selected environment
pub const ENV_TOKEN: &str = ":ENV";

const OPEN: &str = "<%=";
const CLOSE: &str = "%>";

/// Token table for placeholder expansion
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Expansions {
    tokens: HashMap<String, String>,
}

impl Expansions {
    /// Table that only knows about [ENV_TOKEN]
    pub fn for_environment(environment: impl Into<String>) -> Self {
        let mut expansions = Self::default();
        expansions.insert(ENV_TOKEN, environment);
        expansions
    }

    pub fn insert(&mut self, token: impl Into<String>, value: impl Into<String>) {
        self.tokens.insert(token.into(), value.into());
    }

    pub fn get(&self, token: &str) -> Option<&str> {
        self.tokens.get(token).map(String::as_str)
    }

    /// Substitutes every known placeholder in `text`
    pub fn expand<'t>(&self, text: &'t str) -> Cow<'t, str> {
        if !text.contains(OPEN) {
            return Cow::Borrowed(text);
        }

        let mut expanded = String::with_capacity(text.len());
        let mut rest = text;

        while let Some(start) = rest.find(OPEN) {
            let Some(len) = rest[start..].find(CLOSE) else {
                break;
            };
            let end = start + len + CLOSE.len();
            let placeholder = &rest[start..end];

            expanded.push_str(&rest[..start]);
            match placeholder_token(placeholder).and_then(|token| self.get(token)) {
                Some(value) => {
                    tracing::trace!(placeholder, value, "expanded placeholder");
                    expanded.push_str(value);
                }
                None => {
                    tracing::debug!(placeholder, "leaving unknown placeholder unexpanded");
                    expanded.push_str(placeholder);
                }
            }

            rest = &rest[end..];
        }
        expanded.push_str(rest);

        Cow::Owned(expanded)
    }
}

/// Extracts `TOKEN` from `<%= expansion('TOKEN') %>` (single or double quotes)
fn placeholder_token(placeholder: &str) -> Option<&str> {
    let call = placeholder
        .strip_prefix(OPEN)?
        .strip_suffix(CLOSE)?
        .trim()
        .strip_prefix("expansion(")?
        .strip_suffix(')')?
        .trim();

    let quote = call.chars().next().filter(|c| *c == '\'' || *c == '"')?;
    let token = call.strip_prefix(quote)?.strip_suffix(quote)?;

    let valid = !token.is_empty() && !token.contains(['\'', '"']);
    valid.then_some(token)
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    fn expansions() -> Expansions {
        let mut expansions = Expansions::for_environment("usgw1-dev-devops");
        expansions.insert("ENV_TOKEN", "staging");
        expansions
    }

    #[test]
    fn expands_known_tokens() {
        let expansions = expansions();
        assert_eq!(expansions.expand("<%= expansion('ENV_TOKEN') %>"), "staging");
        assert_eq!(
            expansions.expand(r#"bucket-<%=expansion(":ENV")%>-state"#),
            "bucket-usgw1-dev-devops-state"
        );
    }

    #[test]
    fn leaves_unknown_tokens() {
        let text = "<%= expansion('NOPE') %>";
        assert_eq!(expansions().expand(text), text);
    }

    #[test]
    fn ignores_other_templates() {
        let text = "<%= something_else %> and <%= unclosed";
        assert_eq!(expansions().expand(text), text);
        assert_eq!(placeholder_token("<%= expansion('mixed\") %>"), None);
    }
}
