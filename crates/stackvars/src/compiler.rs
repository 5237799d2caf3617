//! Compiling [Sources] into a single tfvars file
use crate::definitions::DefinitionParser;
use crate::expansion::Expansions;
use crate::merge::CompilationSet;
use crate::schema::SchemaParser;
use crate::sources::{LoadError, Role, Source, Sources};
use crate::value::Variables;
use std::path::{Path, PathBuf};

pub const DEFAULT_OUTPUT: &str = "compiled.tfvars";

#[derive(Debug, derive_new::new)]
pub struct Compiler {
    expansions: Expansions,
}

impl Compiler {
    /// Reads the variables a single source contributes
    pub fn load(&self, source: &Source) -> Result<Variables, LoadError> {
        match source.role {
            Role::SchemaDefault => SchemaParser::new().parse_file(&source.path),
            Role::Definition => DefinitionParser::new(&self.expansions).parse_file(&source.path),
        }
    }

    /// Merges all sources in precedence order, `overrides` last
    ///
    /// Missing sources contribute nothing. The first source that exists but cannot be read aborts
    /// the compilation.
    #[tracing::instrument(level = "debug", skip_all, fields(sources = sources.len()))]
    pub fn compile(
        &self,
        sources: &Sources,
        overrides: Variables,
    ) -> Result<CompilationSet, CompileError> {
        let mut set = CompilationSet::default();

        for source in sources.in_precedence_order() {
            let variables = self.load(source)?;
            tracing::debug!(path=%source.path.display(), role=%source.role, count=variables.len(), "merging source");
            set.merge_all(variables);
        }

        if !overrides.is_empty() {
            tracing::debug!(count = overrides.len(), "merging overrides");
            set.merge_all(overrides);
        }

        if set.is_empty() {
            tracing::warn!("no variables found");
        }

        Ok(set)
    }

    /// [Compiler::compile] and write the result to `output`
    pub fn compile_to_file(
        &self,
        sources: &Sources,
        overrides: Variables,
        output: &Path,
    ) -> Result<CompilationSet, CompileError> {
        let set = self.compile(sources, overrides)?;
        write_output(&set, output)?;
        Ok(set)
    }
}

pub fn write_output(set: &CompilationSet, output: &Path) -> Result<(), CompileError> {
    std::fs::write(output, set.render()).map_err(|source| CompileError::Write {
        path: output.to_owned(),
        source,
    })?;
    tracing::info!(path=%output.display(), variables = set.len(), "wrote compiled variables");
    Ok(())
}

#[derive(thiserror::Error, Debug)]
pub enum CompileError {
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error("Unable to write {}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
