use std::fs::{self, File};
use std::io::{self as stdio, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use indicatif::{ProgressBar, ProgressStyle};
use is_terminal::IsTerminal;
use serde::Deserialize;

use chem_forge::engine::{Engine, ProgressReport, ProgressSink, Value};
use chem_forge::io::{Smiles, read_collection};
use chem_forge::ops::{CoulombOptions, EmbedOptions, MorganOptions, StandardizeOptions, UnitConfig};
use chem_forge::{Collection, Slot, Structure};

pub mod embed;
pub mod featurize;
pub mod info;
pub mod standardize;

/// Input and output destinations shared by every subcommand.
#[derive(Debug, Clone, Default)]
pub struct IoParameters {
    pub input: Option<PathBuf>,
    pub output: Option<PathBuf>,
}

/// Settings file layout: an `[engine]` table plus one table per unit.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub engine: UnitConfig,
    pub standardize: StandardizeOptions,
    pub embed: EmbedOptions,
    pub morgan: MorganOptions,
    pub coulomb: CoulombOptions,
}

impl Settings {
    /// Reads a TOML settings file, or returns defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        toml::from_str(&text)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    /// Engine settings with command-line flags applied on top of the file.
    pub fn unit_config(&self, verbose: bool, jobs: Option<usize>) -> UnitConfig {
        let mut config = self.engine.clone();
        config.verbose |= verbose;
        if let Some(jobs) = jobs {
            config.parallelism = jobs;
        }
        config
    }
}

/// Per-invocation state handed to subcommands.
pub struct RunContext {
    pub settings: Settings,
    pub unit_config: UnitConfig,
}

impl RunContext {
    /// Engine with a progress bar on stderr when the run is verbose and stderr is a TTY.
    pub fn engine(&self, total: usize, message: &str) -> Engine {
        let engine = Engine::new();
        if self.unit_config.verbose && total > 1 && stdio::stderr().is_terminal() {
            engine.with_progress(Arc::new(BarProgress::new(total, message)))
        } else {
            engine
        }
    }
}

/// `indicatif` progress bar driven by engine reports.
pub struct BarProgress {
    bar: ProgressBar,
}

impl BarProgress {
    pub fn new(total: usize, message: &str) -> Self {
        let bar = ProgressBar::new(total as u64);
        let style = ProgressStyle::with_template(
            "{spinner:.green} {msg} [{bar:30.cyan/blue}] {pos}/{len} ({eta})",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar());
        bar.set_style(style.progress_chars("=> "));
        bar.set_message(message.to_string());
        bar.enable_steady_tick(Duration::from_millis(80));
        Self { bar }
    }
}

impl ProgressSink for BarProgress {
    fn update(&self, report: &ProgressReport) {
        self.bar.set_position(report.processed as u64);
    }

    fn finish(&self, report: &ProgressReport) {
        self.bar.finish_with_message(format!(
            "{} items in {:.1}s ✓",
            report.total,
            report.elapsed.as_secs_f64()
        ));
    }

    fn abandon(&self, report: &ProgressReport) {
        self.bar
            .abandon_with_message(format!("stopped after {} items ✗", report.processed));
    }
}

/// Loads a labelled structure listing from the configured input source.
pub fn load_collection(params: &IoParameters) -> Result<Collection> {
    if let Some(path) = &params.input {
        let file = File::open(path)
            .with_context(|| format!("Failed to open input file {}", path.display()))?;
        read_collection(BufReader::new(file), &Smiles)
            .with_context(|| format!("Failed to read structures from {}", path.display()))
    } else {
        let stdin = stdio::stdin();
        if stdin.is_terminal() {
            bail!(
                "No --input provided and stdin is a TTY. Provide -i/--input or pipe structures into chemforge."
            );
        }
        read_collection(BufReader::new(stdin.lock()), &Smiles)
            .context("Failed to read structures from stdin")
    }
}

/// Opens the configured output destination and runs `write` against it.
pub fn with_output<F>(params: &IoParameters, write: F) -> Result<()>
where
    F: FnOnce(&mut dyn Write) -> Result<()>,
{
    match &params.output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create output file {}", path.display()))?;
            let mut writer = BufWriter::new(file);
            write(&mut writer)
                .with_context(|| format!("Failed to write output to {}", path.display()))?;
            writer.flush().context("Failed to flush output writer")?;
        }
        None => {
            let stdout = stdio::stdout();
            let mut writer = BufWriter::new(stdout.lock());
            write(&mut writer).context("Failed to write output to stdout")?;
            writer.flush().context("Failed to flush stdout")?;
        }
    }
    Ok(())
}

/// Narrows a result slot to its structure; non-structure values count as absent.
pub fn structure_slot(slot: &Slot<Value>) -> Slot<&Structure> {
    match slot {
        Slot::Filled(Value::Structure(structure)) => Slot::Filled(structure),
        Slot::Filled(Value::Scalar(_)) => Slot::absent("result is not a structure"),
        Slot::Absent(absence) => Slot::Absent(absence.clone()),
    }
}

/// Wraps long-running operations with a spinner rendered to stderr.
pub fn run_with_spinner<T, F>(message: &str, work: F) -> Result<T>
where
    F: FnOnce() -> Result<T>,
{
    let spinner = ProgressBar::new_spinner();
    let style = ProgressStyle::with_template("{spinner:.green} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    spinner.set_style(style);
    spinner.enable_steady_tick(Duration::from_millis(80));
    spinner.set_message(message.to_string());

    let result = work();

    match &result {
        Ok(_) => spinner.finish_with_message(format!("{} ✓", message)),
        Err(_) => spinner.abandon_with_message(format!("{} ✗", message)),
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_tables_fill_unit_options() {
        let settings: Settings = toml::from_str(
            r#"
            [engine]
            parallelism = 4

            [morgan]
            n_bits = 1024

            [embed]
            forcefield = "morse"
            "#,
        )
        .unwrap();

        assert_eq!(settings.engine.parallelism, 4);
        assert_eq!(settings.morgan.n_bits, 1024);
        assert_eq!(settings.morgan.radius, 2);
        assert!(settings.standardize.neutralize);
    }

    #[test]
    fn flags_override_file_values() {
        let settings = Settings::default();
        let config = settings.unit_config(true, Some(8));

        assert!(config.verbose);
        assert_eq!(config.parallelism, 8);
        assert_eq!(settings.unit_config(false, None).parallelism, 1);
    }
}
