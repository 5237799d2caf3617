//! # stackvars - compile terraform variables for a stack
//!
//! Merges variable defaults from `variables.tf` files and assignments from `.tfvars` files into a
//! single tfvars file that can be handed to `terraform -var-file=...`.
//!
//! ## Introduction for developers
//!
//! Read this to understand how `stackvars` works internally.
//!
//! ### Terms
//!
//! - a **schema file** declares variables, possibly with defaults:
//!   ```hcl
//!   variable "replicas" {
//!     type    = number
//!     default = 1
//!   }
//!   ```
//! - a **definition file** assigns values:
//!   ```hcl
//!   replicas = 3
//!   ```
//! - a **source** is the path to one of those files plus its role ([sources::Source])
//! - the **compilation set** is the result of merging all sources ([merge::CompilationSet])
//!
//! Neither kind of file is parsed as full HCL. Both scanners understand a small line oriented
//! subset: strings, numbers, bools, lists of scalars and maps of scalars. Anything else is
//! skipped.
//!
//! ### Resolving sources
//!
//! see [resolve::Resolver]
//!
//! Given an environment and (optionally) a stack, the resolver looks for the stack's
//! `variables.tf` and for `base.tfvars` plus `<env>.tfvars` in the project. Paths that do not
//! exist are fine, they just contribute nothing.
//!
//! ### Parsing
//!
//! Definition files are read by [definitions::DefinitionParser]. Lists and maps may span
//! multiple lines; the scanner keeps track of open brackets until the literal is closed.
//!
//! String values may contain placeholders, which are expanded while parsing:
//!
//! ```hcl
//! name = "app-<%= expansion(':ENV') %>"
//! ```
//!
//! The token table ([expansion::Expansions]) is built from the project configuration
//! ([config::Config]) and always maps `:ENV` to the selected environment.
//!
//! Schema files are read by [schema::SchemaParser]. Besides plain `default = ...` it extracts
//! defaults of object fields:
//!
//! ```hcl
//! variable "scaling" {
//!   type = object({
//!     min = optional(number, 1)
//!     max = optional(number, 3)
//!   })
//! }
//! ```
//!
//! yields `scaling = { min = 1, max = 3 }`.
//!
//! ### Merging
//!
//! see [merge::CompilationSet]
//!
//! Sources are merged in a fixed order: schema defaults, then definition files in the order they
//! were given, then `NAME=VALUE` overrides from the command line ([overrides]). A later value
//! replaces an earlier one, unless both are maps: then the keys are merged (one level).
//!
//! ### Output
//!
//! The compilation set is rendered back into tfvars syntax, variables sorted by name, so the
//! same inputs always produce the same file.

pub mod compiler;
pub mod config;
pub mod definitions;
pub mod expansion;
pub mod merge;
pub mod overrides;
mod render;
pub mod resolve;
mod scan;
pub mod schema;
pub mod sources;
pub mod value;
