//! ordered collection of variable sources (path and role)
//!
//! [Sources] tracks
//! - schema files, whose variable defaults have the lowest priority
//! - definition files, in the order they override each other
//!
//! Iterating with [Sources::in_precedence_order] always yields every schema file before any
//! definition file, regardless of the order they were added in.
use std::path::{Path, PathBuf};

/// What a source contributes to a compilation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// `variable "x" { default = .. }` declarations
    SchemaDefault,
    /// `x = ..` assignments
    Definition,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::SchemaDefault => f.write_str("schema-default"),
            Role::Definition => f.write_str("definition"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, derive_new::new)]
pub struct Source {
    pub path: PathBuf,
    pub role: Role,
}

impl Source {
    pub fn schema(path: impl Into<PathBuf>) -> Self {
        Self::new(path.into(), Role::SchemaDefault)
    }

    pub fn definition(path: impl Into<PathBuf>) -> Self {
        Self::new(path.into(), Role::Definition)
    }
}

#[derive(Debug, Default, Clone)]
pub struct Sources {
    sources: Vec<Source>,
}

impl Sources {
    pub fn push(&mut self, source: Source) {
        self.sources.push(source);
    }

    pub fn add_schema(&mut self, path: impl Into<PathBuf>) {
        self.push(Source::schema(path));
    }

    pub fn add_definition(&mut self, path: impl Into<PathBuf>) {
        self.push(Source::definition(path));
    }

    /// Schema sources first, then definition sources, each in insertion order
    pub fn in_precedence_order(&self) -> impl Iterator<Item = &Source> {
        let schemas = self.with_role(Role::SchemaDefault);
        let definitions = self.with_role(Role::Definition);
        schemas.chain(definitions)
    }

    pub fn with_role(&self, role: Role) -> impl Iterator<Item = &Source> {
        self.sources.iter().filter(move |source| source.role == role)
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

impl FromIterator<Source> for Sources {
    fn from_iter<T: IntoIterator<Item = Source>>(iter: T) -> Self {
        Self {
            sources: iter.into_iter().collect(),
        }
    }
}

/// Reads a source file
///
/// A file that does not exist is logged and reported as `None`.
pub fn read_source(path: &Path) -> Result<Option<String>, LoadError> {
    match std::fs::read_to_string(path) {
        Ok(text) => {
            tracing::info!(path=%path.display(), "loading file");
            Ok(Some(text))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::warn!(path=%path.display(), "file not found, skipping");
            Ok(None)
        }
        Err(source) => Err(LoadError::Io {
            path: path.to_owned(),
            source,
        }),
    }
}

#[derive(thiserror::Error, Debug)]
pub enum LoadError {
    #[error("Unable to read {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Utility macro to create [Sources]
///
/// ```
/// # use stackvars::sources;
/// let sources = sources! {
///   schema: "app/stacks/demo/variables.tf",
///   definition: "tfvars/base.tfvars",
///   definition: "tfvars/dev.tfvars",
/// };
/// assert_eq!(sources.len(), 3);
/// ```
#[macro_export]
macro_rules! sources {
    { $($role:ident: $path:expr),* $(,)? } => {{
        let mut sources = $crate::sources::Sources::default();
        $(
            $crate::sources!(@push sources, $role, $path);
        )*
        sources
    }};
    (@push $sources:ident, schema, $path:expr) => {
        $sources.add_schema($path)
    };
    (@push $sources:ident, definition, $path:expr) => {
        $sources.add_definition($path)
    };
}

#[cfg(test)]
pub(crate) mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn schemas_come_first() {
        let sources = sources! {
            definition: "base.tfvars",
            schema: "a/variables.tf",
            definition: "dev.tfvars",
            schema: "b/variables.tf",
        };

        let order: Vec<_> = sources
            .in_precedence_order()
            .map(|source| source.path.to_string_lossy().into_owned())
            .collect();

        assert_eq!(
            order,
            ["a/variables.tf", "b/variables.tf", "base.tfvars", "dev.tfvars"]
        );
    }

    #[test]
    fn missing_file_is_not_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let read = read_source(&dir.path().join("missing.tfvars")).expect("not an error");
        assert_eq!(read, None);
    }

    #[test]
    fn unreadable_file_names_path() {
        let dir = tempfile::tempdir().expect("tempdir");
        // reading a directory as a file fails with something other than NotFound
        let err = read_source(dir.path()).expect_err("must fail");
        assert!(err.to_string().contains(&dir.path().display().to_string()));
    }
}
