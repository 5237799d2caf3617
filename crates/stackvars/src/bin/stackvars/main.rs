mod cli;

use stackvars::compiler::Compiler;
use stackvars::config::Config;
use stackvars::resolve::Resolver;
use stackvars::sources::{Source, Sources};
use stackvars::value::Variables;

fn main() {
    use clap::Parser;
    let cli = cli::Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_env("STACKVARS_LOG"))
        .with_writer(std::io::stderr)
        .init();

    for new_path in cli.directory.iter() {
        match new_path.canonicalize() {
            Err(e) => {
                eprintln!(
                    "Failed to resolve path for -C/--directory {}\n{}",
                    new_path.display(),
                    e
                );
                std::process::exit(1);
            }
            Ok(cwd) => {
                if let Err(err) = std::env::set_current_dir(&cwd) {
                    eprintln!("Failed to set work directory to {}\n{}", cwd.display(), err,);
                    std::process::exit(1);
                }

                tracing::info!(directory=%cwd.display(), "Changed working directory");
            }
        }
    }

    let command_result = match cli.command {
        cli::Command::Compile(compile_cli) => compile(compile_cli),
        cli::Command::Show(show_cli) => show(show_cli),
        cli::Command::Dev(dev_cli) => dev(dev_cli),
    };

    if let Err(e) = command_result {
        for error in e.chain() {
            eprintln!("{error}")
        }
        std::process::exit(1);
    }
}

pub fn compile(cli: cli::CompileCommand) -> anyhow::Result<()> {
    let (compiler, context, overrides) = prepare(&cli.input)?;

    if cli.output.as_os_str() == "-" {
        let set = compiler.compile(&context.sources, overrides)?;
        print!("{set}");
    } else {
        let set = compiler.compile_to_file(&context.sources, overrides, &cli.output)?;
        eprintln!("Compiled {} variables into {}", set.len(), cli.output.display());
    }

    Ok(())
}

pub fn show(cli: cli::ShowCommand) -> anyhow::Result<()> {
    let (compiler, context, overrides) = prepare(&cli.input)?;
    let set = compiler.compile(&context.sources, overrides)?;

    match cli.format {
        cli::OutputFormat::Yaml => serde_yaml::to_writer(std::io::stdout(), &set)?,
        cli::OutputFormat::Json => serde_json::to_writer_pretty(std::io::stdout(), &set)?,
    };

    Ok(())
}

/// Everything needed to compile, derived from the input arguments
struct Context {
    config: Config,
    environment: String,
    sources: Sources,
}

fn context(input: &cli::InputArgs) -> anyhow::Result<Context> {
    let config = Config::load(&input.path, input.environment.as_deref())?;
    let environment = input
        .environment
        .clone()
        .unwrap_or_else(|| config.defaults.environment.clone());

    let explicit: Sources = input
        .schemas
        .iter()
        .map(Source::schema)
        .chain(input.vars_files.iter().map(Source::definition))
        .collect();
    let sources = Resolver::new(&input.path, &config).sources(
        &environment,
        input.stack.as_deref(),
        &explicit,
    );

    Ok(Context {
        config,
        environment,
        sources,
    })
}

fn prepare(input: &cli::InputArgs) -> anyhow::Result<(Compiler, Context, Variables)> {
    let context = context(input)?;

    let expansions = context.config.expansions(&context.environment);
    let overrides =
        stackvars::overrides::parse_overrides(input.vars.iter().map(String::as_str), &expansions)?;

    Ok((Compiler::new(expansions), context, overrides))
}

/// (stackvars-)developer utilities
///
/// A quick way to expose internal structures for debugging purposes
pub fn dev(cli: cli::DevCommand) -> anyhow::Result<()> {
    match cli.command {
        cli::DevSubCommand::Sources(input) => {
            let context = context(&input)?;
            for source in context.sources.in_precedence_order() {
                println!("{}\t{}", source.role, source.path.display());
            }
        }
        cli::DevSubCommand::Config(input) => {
            let context = context(&input)?;
            println!("environment: {}", context.environment);
            println!("{:#?}", context.config);
        }
    }

    Ok(())
}
