//! stackvars cli interface

use clap::{Parser, Subcommand, ValueEnum};
use std::fmt::Formatter;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Change the work directory
    ///
    /// Can be specified multiple times. Note that all
    /// paths on the way to the final path must exist.
    ///
    /// This is equivalent to running { cd <directory>; stackvars ... }
    #[clap(short = 'C', long = "directory", global(true))]
    pub directory: Vec<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Compile variables into a single tfvars file
    Compile(CompileCommand),

    /// Compile variables and print them as yaml or json
    Show(ShowCommand),

    /// Print debug information for development
    Dev(DevCommand),
}

#[derive(Parser, Debug)]
pub struct CompileCommand {
    #[clap(flatten)]
    pub input: InputArgs,

    /// Where to write the compiled variables, `-` for stdout
    #[clap(short = 'o', long = "output", default_value = stackvars::compiler::DEFAULT_OUTPUT)]
    pub output: PathBuf,
}

#[derive(Parser, Debug)]
pub struct ShowCommand {
    #[clap(flatten)]
    pub input: InputArgs,

    #[arg(short = 'F', long = "output-format", default_value_t)]
    pub format: OutputFormat,
}

#[derive(Parser, Debug)]
pub struct InputArgs {
    /// Environment to compile for
    ///
    /// Defaults to `defaults.environment` of stackvars.yaml
    #[clap(short = 'e', long = "env", env = "STACKVARS_ENV")]
    pub environment: Option<String>,

    /// Stack whose variables.tf provides defaults
    ///
    /// Without a stack every variables.tf in the project is used
    #[clap(short = 's', long = "stack")]
    pub stack: Option<String>,

    /// Project root to resolve files in
    #[clap(short = 'p', long = "path", env = "STACKVARS_PATH", default_value = ".")]
    pub path: PathBuf,

    /// Use these definition files instead of the resolved ones
    ///
    /// Can be specified multiple times, later files take precedence.
    #[clap(short = 'f', long = "vars-file")]
    pub vars_files: Vec<PathBuf>,

    /// Use these schema files instead of the resolved ones
    #[clap(long = "schema")]
    pub schemas: Vec<PathBuf>,

    /// Override a variable (NAME=VALUE)
    ///
    /// Applied after all files. Can be specified multiple times.
    #[clap(short = 'v', long = "var")]
    pub vars: Vec<String>,
}

#[derive(ValueEnum, Clone, Default, Debug)]
pub enum OutputFormat {
    Json,
    #[default]
    Yaml,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Json => f.write_str("json"),
            OutputFormat::Yaml => f.write_str("yaml"),
        }
    }
}

#[derive(Parser, Debug)]
pub struct DevCommand {
    #[command(subcommand)]
    pub command: DevSubCommand,
}

#[derive(Subcommand, Debug)]
pub enum DevSubCommand {
    /// Sources in precedence order
    Sources(InputArgs),
    /// Effective project configuration
    Config(InputArgs),
}
