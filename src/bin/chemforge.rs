use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::Level;

mod commands;

use commands::{IoParameters, RunContext, Settings};
use commands::{embed, featurize, info, standardize};

#[derive(Parser, Debug)]
#[command(
    name = "chemforge",
    about = "A command-line tool for standardizing, embedding, and featurizing collections of chemical structures.",
    version,
    author,
    arg_required_else_help = true
)]
struct Cli {
    /// Input `.smi` file path. When omitted, stdin is used.
    #[arg(short, long, value_name = "FILE", global = true)]
    input: Option<PathBuf>,
    /// Output file path. When omitted, stdout is used.
    #[arg(short, long, value_name = "FILE", global = true)]
    output: Option<PathBuf>,
    /// TOML settings file with `[engine]` and per-unit tables.
    #[arg(long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,
    /// Log batch progress and show a progress bar.
    #[arg(short, long, global = true)]
    verbose: bool,
    /// Worker count; 0 uses every available core.
    #[arg(short, long, value_name = "N", global = true)]
    jobs: Option<usize>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Inspect the collection without modifying the data stream.
    Info(info::InfoArgs),
    /// Reduce every structure to its canonical parent form.
    Standardize(standardize::StandardizeArgs),
    /// Generate a 3D conformer for every structure.
    Embed(embed::EmbedArgs),
    /// Compute numeric descriptors as a tab-separated table.
    Featurize(featurize::FeaturizeArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(if cli.verbose { Level::INFO } else { Level::WARN })
        .with_writer(std::io::stderr)
        .init();

    let io_params = IoParameters {
        input: cli.input.clone(),
        output: cli.output.clone(),
    };
    let settings = Settings::load(cli.config.as_deref())?;
    let unit_config = settings.unit_config(cli.verbose, cli.jobs);
    let ctx = RunContext {
        settings,
        unit_config,
    };

    match cli.command {
        Command::Info(args) => {
            let collection = commands::load_collection(&io_params)?;
            info::run(&collection, &args)?;
        }
        Command::Standardize(args) => {
            let mut collection = commands::load_collection(&io_params)?;
            let result = standardize::run(&mut collection, &args, &ctx)?;
            commands::with_output(&io_params, |writer| standardize::write(writer, &result))?;
        }
        Command::Embed(args) => {
            let mut collection = commands::load_collection(&io_params)?;
            let result = embed::run(&mut collection, &args, &ctx)?;
            commands::with_output(&io_params, |writer| embed::write(writer, &result))?;
        }
        Command::Featurize(args) => {
            let collection = commands::load_collection(&io_params)?;
            let result = featurize::run(collection, &args, &ctx)?;
            commands::with_output(&io_params, |writer| {
                featurize::write(writer, &result, args.kind)
            })?;
        }
    }

    Ok(())
}
