//! Finding the schema and definition files for an environment and stack
//!
//! Definition files are looked up in the configured tfvars directory (falling back to the project
//! root if it does not exist):
//! 1. the first `base.tfvars`
//! 2. the first `<env>.tfvars`, or if there is none, the first `*.tfvars` containing `<env>`
//!
//! Schema files are the stack's `variables.tf`. Without a stack every `variables.tf` in the
//! project is used.
//!
//! Directories are walked depth first with entries sorted by name, so "first" is stable.
use crate::config::Config;
use crate::sources::{Role, Sources};
use std::path::{Component, Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

pub const BASE_FILE: &str = "base.tfvars";
pub const SCHEMA_FILE: &str = "variables.tf";

const TFVARS_EXTENSION: &str = ".tfvars";
const SKIPPED_DIRECTORIES: &[&str] = &["node_modules", ".terraform", "vendor"];

#[derive(Debug, derive_new::new)]
pub struct Resolver<'c> {
    root: &'c Path,
    config: &'c Config,
}

impl<'c> Resolver<'c> {
    /// All sources for `environment` and optionally `stack`, in precedence order
    ///
    /// Schemas or definitions in `explicit` replace the resolved ones of the same role.
    pub fn sources(&self, environment: &str, stack: Option<&str>, explicit: &Sources) -> Sources {
        let mut sources = Sources::default();

        if explicit.with_role(Role::SchemaDefault).next().is_some() {
            for source in explicit.with_role(Role::SchemaDefault) {
                sources.push(source.clone());
            }
        } else {
            for path in self.schemas(stack) {
                sources.add_schema(path);
            }
        }

        if explicit.with_role(Role::Definition).next().is_some() {
            for source in explicit.with_role(Role::Definition) {
                sources.push(source.clone());
            }
        } else {
            for path in self.definitions(environment) {
                sources.add_definition(path);
            }
        }

        tracing::info!(%environment, sources = sources.len(), "resolved sources");
        sources
    }

    /// Definition files for `environment`, base file first
    pub fn definitions(&self, environment: &str) -> Vec<PathBuf> {
        let tfvars_dir = self.root.join(&self.config.defaults.tfvars_dir);
        let search_dir = if tfvars_dir.is_dir() {
            tfvars_dir
        } else {
            tracing::debug!(dir=%tfvars_dir.display(), "no tfvars directory, searching project root");
            self.root.to_path_buf()
        };

        let candidates: Vec<PathBuf> = walk(&search_dir, is_hidden)
            .filter(|entry| file_name(entry).ends_with(TFVARS_EXTENSION))
            .map(DirEntry::into_path)
            .collect();

        let named = |name: &str| {
            candidates
                .iter()
                .find(|path| path.file_name().is_some_and(|n| n == name))
        };

        let mut definitions = Vec::new();

        match named(BASE_FILE) {
            Some(base) => definitions.push(base.clone()),
            None => tracing::warn!(dir=%search_dir.display(), "no {BASE_FILE} found"),
        }

        let env_file = named(&format!("{environment}{TFVARS_EXTENSION}")).or_else(|| {
            candidates.iter().find(|path| {
                path.file_name()
                    .and_then(|name| name.to_str())
                    .is_some_and(|name| name != BASE_FILE && name.contains(environment))
            })
        });

        match env_file {
            Some(path) if !definitions.contains(path) => definitions.push(path.clone()),
            Some(_) => {}
            None => tracing::warn!(dir=%search_dir.display(), %environment, "no tfvars file for environment"),
        }

        definitions
    }

    /// Schema files for `stack`, or for the whole project
    ///
    /// The stack's `variables.tf` is returned even if it does not exist.
    pub fn schemas(&self, stack: Option<&str>) -> Vec<PathBuf> {
        if let Some(stack) = stack {
            let stack_dir: PathBuf = self
                .config
                .stack_path(stack)
                .components()
                .filter(|component| !matches!(component, Component::CurDir))
                .collect();
            return vec![self.root.join(stack_dir).join(SCHEMA_FILE)];
        }

        walk(self.root, |entry| {
            is_hidden(entry) || SKIPPED_DIRECTORIES.contains(&file_name(entry))
        })
        .filter(|entry| file_name(entry) == SCHEMA_FILE)
        .map(DirEntry::into_path)
        .collect()
    }
}

/// Regular files below `dir`, not descending into directories matching `skip`
fn walk(dir: &Path, skip: impl Fn(&DirEntry) -> bool) -> impl Iterator<Item = DirEntry> {
    WalkDir::new(dir)
        .follow_links(true)
        .sort_by(|a, b| a.file_name().cmp(b.file_name()))
        .into_iter()
        .filter_entry(move |entry| {
            entry.depth() == 0 || !(entry.file_type().is_dir() && skip(entry))
        })
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(error) => {
                tracing::warn!(%error, "skipping unreadable entry");
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
}

fn is_hidden(entry: &DirEntry) -> bool {
    file_name(entry).starts_with('.')
}

fn file_name(entry: &DirEntry) -> &str {
    entry.file_name().to_str().unwrap_or_default()
}
