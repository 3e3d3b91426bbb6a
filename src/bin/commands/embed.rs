use std::io::Write;

use anyhow::{Context, Result};
use clap::Args;
use tracing::warn;

use chem_forge::engine::Transformed;
use chem_forge::ops::{ForcefieldKind, GeometryEmbedder};
use chem_forge::{Collection, Slot, format_point};

use crate::commands::{RunContext, structure_slot};

/// Generates one 3D conformer per structure.
#[derive(Debug, Default, Args)]
pub struct EmbedArgs {
    /// Bond-stretch form of the forcefield (harmonic or morse).
    #[arg(long, value_name = "KIND")]
    pub forcefield: Option<ForcefieldKind>,
    /// Maximum optimizer iterations per structure.
    #[arg(long, value_name = "N")]
    pub max_iterations: Option<usize>,
    /// Seed for the initial layout.
    #[arg(long, value_name = "N")]
    pub seed: Option<u64>,
}

/// Builds the embedder from settings with command-line overrides.
pub fn unit(args: &EmbedArgs, ctx: &RunContext) -> GeometryEmbedder {
    let mut options = ctx.settings.embed.clone();
    if let Some(forcefield) = args.forcefield {
        options.forcefield = forcefield;
    }
    if let Some(max_iterations) = args.max_iterations {
        options.max_iterations = max_iterations;
    }
    if let Some(seed) = args.seed {
        options.seed = seed;
    }
    GeometryEmbedder::new()
        .with_options(options)
        .with_config(ctx.unit_config.clone())
}

pub fn run(collection: &mut Collection, args: &EmbedArgs, ctx: &RunContext) -> Result<Transformed> {
    let unit = unit(args, ctx);
    ctx.engine(collection.len(), "Embedding")
        .transform(collection, &unit)
        .context("Failed to embed structures")
}

/// Writes one XYZ block per embedded structure, with the label and centroid as comment;
/// absent items are reported on stderr.
pub fn write(writer: &mut dyn Write, result: &Transformed) -> Result<()> {
    let series = result
        .as_series()
        .context("Embedding did not produce a structure series")?;

    for (label, slot) in series.iter() {
        match structure_slot(slot) {
            Slot::Filled(structure) => {
                if let Some(conformer) = structure.latest_conformer() {
                    let comment = format!("{} centroid={}", label, format_point(&conformer.centroid()));
                    write!(writer, "{}", conformer.to_xyz(structure, &comment))?;
                }
            }
            Slot::Absent(absence) => warn!(label = %label, reason = %absence.reason, "no conformer written"),
        }
    }
    Ok(())
}
