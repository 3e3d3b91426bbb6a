use std::io::{self, Write};

use anyhow::{Context, Result};
use clap::Args;
use prettytable::{Table, format, row};

use chem_forge::{Collection, Slot, Structure};

use crate::commands::run_with_spinner;

/// Report-only command that summarizes every record of the input.
#[derive(Debug, Default, Args)]
pub struct InfoArgs {}

/// Computes and prints per-structure statistics without transforming anything.
pub fn run(collection: &Collection, _args: &InfoArgs) -> Result<()> {
    let reports = run_with_spinner("Analyzing structures", || {
        Ok(collection
            .iter()
            .map(|(label, slot)| StructureReport::new(label.as_str(), slot))
            .collect::<Vec<_>>())
    })?;

    print_tables(&reports, collection)?;
    Ok(())
}

#[derive(Debug)]
struct StructureReport {
    label: String,
    atoms: String,
    bonds: String,
    rings: String,
    charge: String,
    weight: String,
    status: String,
}

impl StructureReport {
    fn new(label: &str, slot: &Slot<Structure>) -> Self {
        match slot {
            Slot::Filled(structure) => Self {
                label: label.to_string(),
                atoms: format!("{} (+{} H)", structure.atom_count(), structure.total_hydrogens()),
                bonds: structure.bond_count().to_string(),
                rings: structure.ring_count().to_string(),
                charge: format!("{:+}", structure.formal_charge()),
                weight: format!("{:.3}", structure.molecular_weight()),
                status: "Parsed".to_string(),
            },
            Slot::Absent(absence) => Self {
                label: label.to_string(),
                atoms: "-".to_string(),
                bonds: "-".to_string(),
                rings: "-".to_string(),
                charge: "-".to_string(),
                weight: "-".to_string(),
                status: format!("Absent ({})", absence.reason),
            },
        }
    }
}

fn print_tables(reports: &[StructureReport], collection: &Collection) -> Result<()> {
    let mut stderr = io::stderr().lock();

    print_boxed_label(&mut stderr, "ChemForge Collection Report")?;
    writeln!(&mut stderr)?;

    let mut structure_table = Table::new();
    print_boxed_label(&mut stderr, "Structures")?;
    structure_table.set_format(*format::consts::FORMAT_BOX_CHARS);
    structure_table.set_titles(row![
        "Label", "Atoms", "Bonds", "Rings", "Charge", "Weight", "Status"
    ]);
    for report in reports {
        structure_table.add_row(row![
            report.label,
            report.atoms,
            report.bonds,
            report.rings,
            report.charge,
            report.weight,
            report.status
        ]);
    }
    structure_table
        .print(&mut stderr)
        .context("Failed to render structure table")?;
    writeln!(&mut stderr)?;

    let mut summary_table = Table::new();
    print_boxed_label(&mut stderr, "Summary")?;
    summary_table.set_format(*format::consts::FORMAT_BOX_CHARS);
    summary_table.set_titles(row!["Metric", "Value"]);
    summary_table.add_row(row!["Records", collection.len()]);
    summary_table.add_row(row!["Parsed", collection.filled_count()]);
    summary_table.add_row(row!["Absent", collection.len() - collection.filled_count()]);
    summary_table
        .print(&mut stderr)
        .context("Failed to render collection summary")?;

    Ok(())
}

fn print_boxed_label<W: Write>(writer: &mut W, title: &str) -> io::Result<()> {
    let inner = format!(" {title} ");
    let width = inner.chars().count();
    writeln!(writer, "╭{}╮", "─".repeat(width))?;
    writeln!(writer, "│{}│", inner)?;
    writeln!(writer, "╰{}╯", "─".repeat(width))?;
    Ok(())
}
