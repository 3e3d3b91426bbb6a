use std::io::Write;

use anyhow::{Context, Result, bail};
use clap::{Args, ValueEnum};

use chem_forge::Collection;
use chem_forge::engine::{Transformed, Value};
use chem_forge::ops::{CoulombMatrix, MolecularWeight, MorganFingerprint, TransformUnit};

use crate::commands::embed::{self, EmbedArgs};
use crate::commands::RunContext;

const MISSING: &str = "NA";

/// Descriptor families available from the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FeatureKind {
    /// Average molecular weight (one column).
    #[value(name = "weight")]
    Weight,
    /// Circular fingerprint (one column per bit).
    #[value(name = "morgan")]
    Morgan,
    /// Coulomb matrix of the latest conformer (flattened).
    #[value(name = "coulomb")]
    Coulomb,
}

impl FeatureKind {
    fn column_prefix(&self) -> &'static str {
        match self {
            FeatureKind::Weight => "molecular_weight",
            FeatureKind::Morgan => "morgan_fingerprint",
            FeatureKind::Coulomb => "coulomb_matrix",
        }
    }
}

/// Computes numeric descriptors and writes them as a tab-separated table.
#[derive(Debug, Args)]
pub struct FeaturizeArgs {
    /// Descriptor to compute.
    #[arg(long, value_enum)]
    pub kind: FeatureKind,
    /// Fingerprint length.
    #[arg(long, value_name = "N")]
    pub bits: Option<usize>,
    /// Fingerprint radius.
    #[arg(long, value_name = "N")]
    pub radius: Option<usize>,
    /// Count environments per bit instead of setting bits.
    #[arg(long)]
    pub counts: bool,
    /// Coulomb matrix size.
    #[arg(long, value_name = "N")]
    pub max_atoms: Option<usize>,
    /// Embed 3D geometry before computing the descriptor.
    #[arg(long)]
    pub embed: bool,
    #[command(flatten)]
    pub embed_args: EmbedArgs,
}

fn build_unit(args: &FeaturizeArgs, ctx: &RunContext) -> Box<dyn TransformUnit> {
    let config = ctx.unit_config.clone();
    match args.kind {
        FeatureKind::Weight => Box::new(MolecularWeight::new().with_config(config)),
        FeatureKind::Morgan => {
            let mut options = ctx.settings.morgan.clone();
            if let Some(bits) = args.bits {
                options.n_bits = bits;
            }
            if let Some(radius) = args.radius {
                options.radius = radius;
            }
            options.counts |= args.counts;
            Box::new(MorganFingerprint::new(options).with_config(config))
        }
        FeatureKind::Coulomb => {
            let mut options = ctx.settings.coulomb.clone();
            if let Some(max_atoms) = args.max_atoms {
                options.max_atoms = max_atoms;
            }
            Box::new(CoulombMatrix::new(options).with_config(config))
        }
    }
}

pub fn run(mut collection: Collection, args: &FeaturizeArgs, ctx: &RunContext) -> Result<Transformed> {
    if args.embed {
        collection = embed::run(&mut collection, &args.embed_args, ctx)?
            .into_collection()
            .context("Failed to hand embedded structures to the featurizer")?;
    }

    let unit = build_unit(args, ctx);
    ctx.engine(collection.len(), "Featurizing")
        .transform(&mut collection, unit.as_ref())
        .with_context(|| format!("Failed to compute {}", args.kind.column_prefix()))
}

/// Writes a header row and one row per item; absent items get `NA` in every column.
pub fn write(writer: &mut dyn Write, result: &Transformed, kind: FeatureKind) -> Result<()> {
    let prefix = kind.column_prefix();
    match result {
        Transformed::Series(series) => {
            writeln!(writer, "label\t{}", prefix)?;
            for (label, slot) in series.iter() {
                match slot.value().and_then(Value::as_scalar) {
                    Some(value) => writeln!(writer, "{}\t{}", label, value)?,
                    None => writeln!(writer, "{}\t{}", label, MISSING)?,
                }
            }
        }
        Transformed::Frame(frame) => {
            writeln!(writer, "label\t{}", frame.columns().join("\t"))?;
            for (label, row) in frame.iter() {
                let cells: Vec<String> = match row.value() {
                    Some(values) => values.iter().map(|v| v.to_string()).collect(),
                    None => vec![MISSING.to_string(); frame.width()],
                };
                writeln!(writer, "{}\t{}", label, cells.join("\t"))?;
            }
        }
        Transformed::Panel(panel) => {
            let (rows, cols) = panel.dims();
            let header: Vec<String> = (0..rows)
                .flat_map(|r| (0..cols).map(move |c| format!("{}_{}_{}", prefix, r, c)))
                .collect();
            writeln!(writer, "label\t{}", header.join("\t"))?;
            for (label, table) in panel.iter() {
                let cells: Vec<String> = match table.value() {
                    Some(values) => values.iter().map(|v| v.to_string()).collect(),
                    None => vec![MISSING.to_string(); rows * cols],
                };
                writeln!(writer, "{}\t{}", label, cells.join("\t"))?;
            }
        }
        other => bail!("Unexpected {} result for a collection input", other.shape()),
    }
    Ok(())
}
