//! Structure canonicalization through a pluggable standardizer.
//!
//! The [`Canonicalizer`] writes a structure in a line notation, hands the text to a
//! [`Standardizer`], and parses the standardized text back. Two standardizers ship with the
//! crate: [`FragmentStandardizer`] runs in-process (largest fragment, neutralized), and
//! [`CommandStandardizer`] pipes the notation through an external program.

use super::config::{CollaboratorAccess, UnitConfig};
use super::error::Error;
use super::unit::{Output, OutputKind, TransformUnit, UnitKind};
use crate::io::{Notation, Smiles};
use crate::model::structure::Structure;
use serde::Deserialize;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StandardizeOptions {
    /// Keep only the fragment with the most heavy atoms; ties go to the earliest.
    pub keep_largest_fragment: bool,
    /// Remove formal charges that can be balanced by adding or removing hydrogens.
    pub neutralize: bool,
}

impl Default for StandardizeOptions {
    fn default() -> Self {
        Self {
            keep_largest_fragment: true,
            neutralize: true,
        }
    }
}

/// One standardization call.
#[derive(Debug, Clone, Copy)]
pub struct StandardizeRequest<'a> {
    pub notation: &'a str,
    pub options: &'a StandardizeOptions,
}

/// External or in-process service that returns the canonical notation of a structure.
pub trait Standardizer: Send + Sync {
    fn name(&self) -> &str;

    /// Confirms the service can be reached.
    fn check(&self) -> Result<(), Error> {
        Ok(())
    }

    fn access_hint(&self) -> CollaboratorAccess {
        CollaboratorAccess::Shared
    }

    /// Returns the standardized notation.
    ///
    /// # Errors
    ///
    /// [`Error::Rejected`] when the service refuses this structure and
    /// [`Error::CollaboratorUnavailable`] when the service itself cannot be reached.
    fn standardize(&self, request: &StandardizeRequest<'_>) -> Result<String, Error>;
}

/// In-process standardizer working on the parsed molecular graph.
#[derive(Debug, Clone, Copy, Default)]
pub struct FragmentStandardizer;

impl FragmentStandardizer {
    /// Applies the standardization rules directly to a structure.
    pub fn standardize_structure(
        &self,
        structure: &Structure,
        options: &StandardizeOptions,
    ) -> Result<Structure, Error> {
        if structure.is_empty() {
            return Err(Error::EmptyStructure);
        }

        let mut result = if options.keep_largest_fragment {
            largest_fragment(structure)
        } else {
            structure.clone()
        };
        if options.neutralize {
            neutralize(&mut result)?;
        }
        result.clear_conformers();
        Ok(result)
    }
}

impl Standardizer for FragmentStandardizer {
    fn name(&self) -> &str {
        "fragment"
    }

    fn standardize(&self, request: &StandardizeRequest<'_>) -> Result<String, Error> {
        let structure = Smiles
            .parse(request.notation)
            .map_err(|e| Error::rejected(e.to_string()))?;
        let standardized = self.standardize_structure(&structure, request.options)?;
        Ok(Smiles.write(&standardized))
    }
}

fn largest_fragment(structure: &Structure) -> Structure {
    let fragments = structure.fragments();
    if fragments.len() < 2 {
        return structure.clone();
    }

    let heavy = |fragment: &[usize]| {
        fragment
            .iter()
            .filter_map(|&idx| structure.atom(idx))
            .filter(|atom| atom.element.is_heavy_atom())
            .count()
    };

    let mut best = &fragments[0];
    let mut best_size = heavy(best);
    for fragment in &fragments[1..] {
        let size = heavy(fragment);
        if size > best_size {
            best = fragment;
            best_size = size;
        }
    }
    structure.subset(best)
}

/// Moves charged organic atoms to their neutral protonation state.
///
/// Positive charges are removed by dropping hydrogens where an atom has any. Positive charge
/// that cannot be removed this way is balanced by leaving the same amount of negative charge
/// in place, taking negative atoms in index order.
///
/// # Errors
///
/// [`Error::Rejected`] when an atom's hydrogen count would exceed what an atom can carry.
fn neutralize(structure: &mut Structure) -> Result<(), Error> {
    let mut fixed_positive: i32 = 0;

    for idx in 0..structure.atom_count() {
        let hydrogens = structure.hydrogen_count(idx);
        let Some(atom) = structure.atom_mut(idx) else {
            continue;
        };
        if atom.charge <= 0 {
            continue;
        }
        if !atom.element.is_organic_subset() {
            fixed_positive += i32::from(atom.charge);
            continue;
        }
        let removable = atom.charge.min(i8::try_from(hydrogens).unwrap_or(i8::MAX));
        atom.charge -= removable;
        atom.hydrogens = Some(hydrogens - removable as u8);
        fixed_positive += i32::from(atom.charge);
    }

    for idx in 0..structure.atom_count() {
        let hydrogens = structure.hydrogen_count(idx);
        let valence = structure.bond_valence(idx);
        let Some(atom) = structure.atom_mut(idx) else {
            continue;
        };
        if atom.charge >= 0 || !atom.element.is_organic_subset() {
            continue;
        }
        let max_valence = atom
            .element
            .default_valences()
            .last()
            .copied()
            .map(f64::from)
            .unwrap_or(0.0);

        let mut charge = atom.charge;
        let mut added = 0u8;
        while charge < 0 {
            if fixed_positive > 0 {
                fixed_positive -= 1;
            } else if valence + f64::from(hydrogens) + f64::from(added) + 1.0 <= max_valence {
                added += 1;
            } else {
                break;
            }
            charge += 1;
        }
        // Units consumed by balancing stay charged.
        let (Some(charged), Some(total)) = (
            i8::try_from(added).ok().and_then(|n| atom.charge.checked_add(n)),
            hydrogens.checked_add(added),
        ) else {
            return Err(Error::rejected(format!(
                "atom {} cannot take {} more hydrogens",
                idx, added
            )));
        };
        atom.charge = charged;
        atom.hydrogens = Some(total);
    }
    Ok(())
}

/// Standardizer backed by an external program.
///
/// The notation is written to the program's standard input followed by a newline; the first
/// whitespace-delimited token of the first non-empty output line is the result. Options are
/// not forwarded: configure the program through its arguments instead.
#[derive(Debug, Clone)]
pub struct CommandStandardizer {
    program: PathBuf,
    args: Vec<String>,
}

impl CommandStandardizer {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    fn locate(&self) -> Option<PathBuf> {
        if self.program.is_absolute() || self.program.components().count() > 1 {
            return self.program.is_file().then(|| self.program.clone());
        }
        let paths = std::env::var_os("PATH")?;
        std::env::split_paths(&paths)
            .map(|dir| dir.join(&self.program))
            .find(|candidate| candidate.is_file())
    }

    fn unavailable(&self, details: impl Into<String>) -> Error {
        Error::unavailable(self.program.display().to_string(), details)
    }
}

impl Standardizer for CommandStandardizer {
    fn name(&self) -> &str {
        self.program.to_str().unwrap_or("command")
    }

    fn check(&self) -> Result<(), Error> {
        self.locate()
            .map(|_| ())
            .ok_or_else(|| self.unavailable("program not found"))
    }

    fn access_hint(&self) -> CollaboratorAccess {
        CollaboratorAccess::Serialized
    }

    fn standardize(&self, request: &StandardizeRequest<'_>) -> Result<String, Error> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| self.unavailable(e.to_string()))?;

        if let Some(mut stdin) = child.stdin.take() {
            match writeln!(stdin, "{}", request.notation) {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::BrokenPipe => {}
                Err(e) => return Err(self.unavailable(e.to_string())),
            }
        }

        let output = child
            .wait_with_output()
            .map_err(|e| self.unavailable(e.to_string()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::rejected(format!(
                "'{}' exited with {}: {}",
                self.program.display(),
                output.status,
                stderr.trim()
            )));
        }

        String::from_utf8_lossy(&output.stdout)
            .lines()
            .find_map(|line| line.split_whitespace().next())
            .map(str::to_string)
            .ok_or_else(|| Error::rejected(format!("'{}' produced no output", self.program.display())))
    }
}

/// Canonicalizer unit: structure in, standardized structure out.
#[derive(Clone)]
pub struct Canonicalizer {
    config: UnitConfig,
    options: StandardizeOptions,
    standardizer: Arc<dyn Standardizer>,
    notation: Arc<dyn Notation>,
}

impl Default for Canonicalizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Canonicalizer {
    /// Canonicalizer using the in-process [`FragmentStandardizer`] and SMILES.
    pub fn new() -> Self {
        Self {
            config: UnitConfig::default(),
            options: StandardizeOptions::default(),
            standardizer: Arc::new(FragmentStandardizer),
            notation: Arc::new(Smiles),
        }
    }

    pub fn with_standardizer(mut self, standardizer: Arc<dyn Standardizer>) -> Self {
        self.standardizer = standardizer;
        self
    }

    pub fn with_notation(mut self, notation: Arc<dyn Notation>) -> Self {
        self.notation = notation;
        self
    }

    pub fn with_options(mut self, options: StandardizeOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_config(mut self, config: UnitConfig) -> Self {
        self.config = config;
        self
    }

    pub fn options(&self) -> &StandardizeOptions {
        &self.options
    }

    pub fn standardizer(&self) -> &dyn Standardizer {
        self.standardizer.as_ref()
    }
}

impl TransformUnit for Canonicalizer {
    fn name(&self) -> &str {
        "Canonicalizer"
    }

    fn kind(&self) -> UnitKind {
        UnitKind::Canonicalizer
    }

    fn output_kind(&self) -> OutputKind {
        OutputKind::Structure
    }

    fn config(&self) -> &UnitConfig {
        &self.config
    }

    fn config_mut(&mut self) -> &mut UnitConfig {
        &mut self.config
    }

    fn check_ready(&self) -> Result<(), Error> {
        self.standardizer.check()
    }

    fn collaborator_access(&self) -> CollaboratorAccess {
        self.standardizer.access_hint()
    }

    fn apply(&self, structure: &mut Structure) -> Result<Output, Error> {
        if structure.is_empty() {
            return Err(Error::EmptyStructure);
        }
        let text = self.notation.write(structure);
        let request = StandardizeRequest {
            notation: &text,
            options: &self.options,
        };
        let response = self.standardizer.standardize(&request)?;
        let standardized = self
            .notation
            .parse(&response)
            .map_err(|e| Error::malformed_response(self.standardizer.name(), e.to_string()))?;
        Ok(Output::Structure(standardized))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::atom::Atom;
    use crate::model::types::Element;

    fn canonical(text: &str) -> String {
        let mut structure = Smiles.parse(text).unwrap();
        match Canonicalizer::new().apply(&mut structure).unwrap() {
            Output::Structure(s) => Smiles.write(&s),
            other => panic!("unexpected output {:?}", other),
        }
    }

    #[test]
    fn salt_is_stripped_and_neutralized() {
        assert_eq!(canonical("CC(=O)[O-].[Na+]"), "CC(=O)O");
    }

    #[test]
    fn canonical_forms_are_fixed_points() {
        for text in ["CC", "CC(=O)O", "c1ccccc1", "CCO"] {
            let once = canonical(text);
            assert_eq!(canonical(&once), once);
        }
    }

    #[test]
    fn largest_fragment_ties_keep_earliest() {
        assert_eq!(canonical("CO.CN"), "CO");
        assert_eq!(canonical("[Cl-].CCCC[NH3+]"), "CCCCN");
    }

    #[test]
    fn ammonium_loses_a_proton() {
        assert_eq!(canonical("[NH4+]"), "N");
    }

    #[test]
    fn unremovable_positive_charge_keeps_its_counter_charge() {
        let options = StandardizeOptions {
            keep_largest_fragment: false,
            neutralize: true,
        };
        let structure = Smiles.parse("CC(=O)[O-].[Na+]").unwrap();
        let result = FragmentStandardizer
            .standardize_structure(&structure, &options)
            .unwrap();

        assert_eq!(Smiles.write(&result), "CC(=O)[O-].[Na+]");
        assert_eq!(result.formal_charge(), 0);
    }

    #[test]
    fn oversized_hydrogen_counts_do_not_overflow() {
        let options = StandardizeOptions::default();
        for (hydrogens, charge) in [(255u8, -1i8), (255, 1), (200, 100)] {
            let mut structure = Structure::new();
            let mut atom = Atom::new(Element::O);
            atom.hydrogens = Some(hydrogens);
            atom.charge = charge;
            structure.add_atom(atom);

            let result = FragmentStandardizer
                .standardize_structure(&structure, &options)
                .unwrap();
            assert!(result.atoms()[0].charge.abs() <= charge.abs());
        }
    }

    #[test]
    fn quaternary_nitrogen_stays_charged() {
        assert_eq!(canonical("C[N+](C)(C)C"), "C[N+](C)(C)C");
    }

    #[test]
    fn options_can_disable_each_rule() {
        let options = StandardizeOptions {
            keep_largest_fragment: true,
            neutralize: false,
        };
        let structure = Smiles.parse("CC(=O)[O-].[Na+]").unwrap();
        let result = FragmentStandardizer
            .standardize_structure(&structure, &options)
            .unwrap();

        assert_eq!(Smiles.write(&result), "CC(=O)[O-]");
    }

    #[test]
    fn empty_structure_is_rejected() {
        let err = Canonicalizer::new()
            .apply(&mut Structure::new())
            .unwrap_err();

        assert_eq!(err, Error::EmptyStructure);
        assert!(!err.is_fatal());
    }

    #[test]
    fn canonicalizer_reports_structure_output() {
        let unit = Canonicalizer::new();

        assert_eq!(unit.output_kind(), OutputKind::Structure);
        assert_eq!(unit.kind(), UnitKind::Canonicalizer);
        assert_eq!(unit.collaborator_access(), CollaboratorAccess::Shared);
        assert!(unit.check_ready().is_ok());
    }

    #[test]
    fn missing_program_is_unavailable() {
        let standardizer = CommandStandardizer::new("/nonexistent/chem-standardizer");
        let err = standardizer.check().unwrap_err();

        assert!(err.is_fatal());
        assert_eq!(standardizer.access_hint(), CollaboratorAccess::Serialized);

        let request = StandardizeRequest {
            notation: "CC",
            options: &StandardizeOptions::default(),
        };
        assert!(standardizer.standardize(&request).unwrap_err().is_fatal());
    }

    #[cfg(unix)]
    #[test]
    fn command_output_is_the_standardized_notation() {
        let standardizer = CommandStandardizer::new("cat");
        assert!(standardizer.check().is_ok());

        let request = StandardizeRequest {
            notation: "CCO",
            options: &StandardizeOptions::default(),
        };
        assert_eq!(standardizer.standardize(&request).unwrap(), "CCO");
    }

    #[cfg(unix)]
    #[test]
    fn failing_command_rejects_the_item() {
        let standardizer = CommandStandardizer::new("false");
        let request = StandardizeRequest {
            notation: "CCO",
            options: &StandardizeOptions::default(),
        };
        let err = standardizer.standardize(&request).unwrap_err();

        assert!(matches!(err, Error::Rejected { .. }));
        assert!(!err.is_fatal());
    }
}
