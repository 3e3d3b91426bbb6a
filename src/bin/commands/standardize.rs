use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;

use chem_forge::Collection;
use chem_forge::engine::Transformed;
use chem_forge::io::{Smiles, write_collection};
use chem_forge::ops::{Canonicalizer, CommandStandardizer};

use crate::commands::{RunContext, structure_slot};

/// Canonicalizes every structure: largest fragment, neutralized charges.
#[derive(Debug, Default, Args)]
pub struct StandardizeArgs {
    /// External standardizer reading one notation on stdin and printing the result.
    #[arg(long, value_name = "PATH")]
    pub program: Option<PathBuf>,
    /// Argument passed to the external standardizer (repeatable).
    #[arg(long = "program-arg", value_name = "ARG", allow_hyphen_values = true)]
    pub program_args: Vec<String>,
    /// Keep every fragment instead of the largest one.
    #[arg(long)]
    pub keep_fragments: bool,
    /// Leave formal charges untouched.
    #[arg(long)]
    pub keep_charges: bool,
}

pub fn run(collection: &mut Collection, args: &StandardizeArgs, ctx: &RunContext) -> Result<Transformed> {
    let mut options = ctx.settings.standardize.clone();
    if args.keep_fragments {
        options.keep_largest_fragment = false;
    }
    if args.keep_charges {
        options.neutralize = false;
    }

    let mut unit = Canonicalizer::new()
        .with_options(options)
        .with_config(ctx.unit_config.clone());
    if let Some(program) = &args.program {
        let standardizer = CommandStandardizer::new(program).with_args(args.program_args.clone());
        unit = unit.with_standardizer(Arc::new(standardizer));
    }

    ctx.engine(collection.len(), "Standardizing")
        .transform(collection, &unit)
        .context("Failed to standardize structures")
}

/// Writes `NOTATION<TAB>LABEL` lines; absent items are written as `*`.
pub fn write(writer: &mut dyn Write, result: &Transformed) -> Result<()> {
    let series = result
        .as_series()
        .context("Standardization did not produce a structure series")?;
    let items = series
        .iter()
        .map(|(label, slot)| (label.as_str(), structure_slot(slot)));
    write_collection(writer, items, &Smiles)?;
    Ok(())
}
