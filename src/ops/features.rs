//! Numeric descriptors computed from a single structure.
//!
//! Each extractor declares a fixed output shape up front: [`MolecularWeight`] yields one
//! number, [`MorganFingerprint`] a vector of `n_bits`, and [`CoulombMatrix`] a
//! `max_atoms x max_atoms` table.

use super::config::UnitConfig;
use super::error::Error;
use super::unit::{Output, OutputKind, TransformUnit, UnitKind};
use crate::model::structure::Structure;
use crate::model::types::BondOrder;
use nalgebra::distance;
use ndarray::{Array1, Array2};
use serde::Deserialize;

const FNV_OFFSET: u32 = 0x811c_9dc5;
const FNV_PRIME: u32 = 0x0100_0193;

/// Average molecular weight including implicit hydrogens.
#[derive(Debug, Clone, Default)]
pub struct MolecularWeight {
    config: UnitConfig,
}

impl MolecularWeight {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(mut self, config: UnitConfig) -> Self {
        self.config = config;
        self
    }
}

impl TransformUnit for MolecularWeight {
    fn name(&self) -> &str {
        "MolecularWeight"
    }

    fn kind(&self) -> UnitKind {
        UnitKind::FeatureExtractor
    }

    fn output_kind(&self) -> OutputKind {
        OutputKind::Scalar
    }

    fn config(&self) -> &UnitConfig {
        &self.config
    }

    fn config_mut(&mut self) -> &mut UnitConfig {
        &mut self.config
    }

    fn apply(&self, structure: &mut Structure) -> Result<Output, Error> {
        if structure.is_empty() {
            return Err(Error::EmptyStructure);
        }
        Ok(Output::Scalar(structure.molecular_weight()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MorganOptions {
    /// Number of neighborhood expansion rounds.
    pub radius: usize,
    pub n_bits: usize,
    /// Count occurrences per bit instead of setting it to 1.
    pub counts: bool,
}

impl Default for MorganOptions {
    fn default() -> Self {
        Self {
            radius: 2,
            n_bits: 2048,
            counts: false,
        }
    }
}

/// Circular (extended-connectivity) fingerprint folded to a fixed length.
#[derive(Debug, Clone, Default)]
pub struct MorganFingerprint {
    config: UnitConfig,
    options: MorganOptions,
}

impl MorganFingerprint {
    pub fn new(options: MorganOptions) -> Self {
        Self {
            config: UnitConfig::default(),
            options,
        }
    }

    pub fn with_config(mut self, config: UnitConfig) -> Self {
        self.config = config;
        self
    }

    pub fn options(&self) -> &MorganOptions {
        &self.options
    }

    /// Atom environment identifiers for every radius from 0 to `radius`.
    fn environments(&self, structure: &Structure) -> Vec<u32> {
        let n = structure.atom_count();
        let mut ids: Vec<u32> = (0..n).map(|idx| atom_invariant(structure, idx)).collect();
        let mut all = ids.clone();

        for round in 1..=self.options.radius {
            let next: Vec<u32> = (0..n)
                .map(|idx| {
                    let mut around: Vec<(u32, u32)> = structure
                        .neighbors(idx)
                        .map(|(nbr, order)| (bond_code(order), ids[nbr]))
                        .collect();
                    around.sort_unstable();
                    let mut words = vec![round as u32, ids[idx]];
                    for (code, id) in around {
                        words.push(code);
                        words.push(id);
                    }
                    fnv1a(&words)
                })
                .collect();
            all.extend_from_slice(&next);
            ids = next;
        }

        all
    }
}

fn bond_code(order: BondOrder) -> u32 {
    match order {
        BondOrder::Single => 1,
        BondOrder::Double => 2,
        BondOrder::Triple => 3,
        BondOrder::Aromatic => 4,
    }
}

fn atom_invariant(structure: &Structure, idx: usize) -> u32 {
    let Some(atom) = structure.atom(idx) else {
        return 0;
    };
    fnv1a(&[
        u32::from(atom.element.atomic_number()),
        structure.degree(idx) as u32,
        u32::from(structure.hydrogen_count(idx)),
        (i32::from(atom.charge) + 128) as u32,
        u32::from(atom.aromatic),
        u32::from(atom.isotope.unwrap_or(0)),
    ])
}

fn fnv1a(words: &[u32]) -> u32 {
    words
        .iter()
        .flat_map(|w| w.to_le_bytes())
        .fold(FNV_OFFSET, |hash, byte| {
            (hash ^ u32::from(byte)).wrapping_mul(FNV_PRIME)
        })
}

impl TransformUnit for MorganFingerprint {
    fn name(&self) -> &str {
        "MorganFingerprint"
    }

    fn kind(&self) -> UnitKind {
        UnitKind::FeatureExtractor
    }

    fn output_kind(&self) -> OutputKind {
        OutputKind::Vector {
            len: self.options.n_bits,
        }
    }

    fn config(&self) -> &UnitConfig {
        &self.config
    }

    fn config_mut(&mut self) -> &mut UnitConfig {
        &mut self.config
    }

    fn check_ready(&self) -> Result<(), Error> {
        if self.options.n_bits == 0 {
            return Err(Error::invalid_options(self.name(), "n_bits must be at least 1"));
        }
        Ok(())
    }

    fn apply(&self, structure: &mut Structure) -> Result<Output, Error> {
        self.check_ready()?;
        let n_bits = self.options.n_bits;
        let mut bits = Array1::<f64>::zeros(n_bits);
        for id in self.environments(structure) {
            let bit = id as usize % n_bits;
            if self.options.counts {
                bits[bit] += 1.0;
            } else {
                bits[bit] = 1.0;
            }
        }
        Ok(Output::Vector(bits))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CoulombOptions {
    /// Side length of the zero-padded output matrix.
    pub max_atoms: usize,
}

impl Default for CoulombOptions {
    fn default() -> Self {
        Self { max_atoms: 23 }
    }
}

/// Coulomb matrix of the latest conformer, zero padded to `max_atoms`.
///
/// Diagonal entries are `0.5 * Z^2.4`; off-diagonal entries are `Zi * Zj / |Ri - Rj|`.
/// Implicit hydrogens are not part of the matrix.
#[derive(Debug, Clone, Default)]
pub struct CoulombMatrix {
    config: UnitConfig,
    options: CoulombOptions,
}

impl CoulombMatrix {
    pub fn new(options: CoulombOptions) -> Self {
        Self {
            config: UnitConfig::default(),
            options,
        }
    }

    pub fn with_config(mut self, config: UnitConfig) -> Self {
        self.config = config;
        self
    }

    pub fn options(&self) -> &CoulombOptions {
        &self.options
    }
}

impl TransformUnit for CoulombMatrix {
    fn name(&self) -> &str {
        "CoulombMatrix"
    }

    fn kind(&self) -> UnitKind {
        UnitKind::FeatureExtractor
    }

    fn output_kind(&self) -> OutputKind {
        OutputKind::Matrix {
            rows: self.options.max_atoms,
            cols: self.options.max_atoms,
        }
    }

    fn config(&self) -> &UnitConfig {
        &self.config
    }

    fn config_mut(&mut self) -> &mut UnitConfig {
        &mut self.config
    }

    fn check_ready(&self) -> Result<(), Error> {
        if self.options.max_atoms == 0 {
            return Err(Error::invalid_options(self.name(), "max_atoms must be at least 1"));
        }
        Ok(())
    }

    fn apply(&self, structure: &mut Structure) -> Result<Output, Error> {
        let n = structure.atom_count();
        let max_atoms = self.options.max_atoms;
        if n == 0 {
            return Err(Error::EmptyStructure);
        }
        if n > max_atoms {
            return Err(Error::too_many_atoms("coulomb_matrix", n, max_atoms));
        }
        let conformer = structure
            .latest_conformer()
            .ok_or_else(|| Error::missing_conformer("coulomb_matrix"))?;

        let charges: Vec<f64> = structure
            .atoms()
            .iter()
            .map(|atom| f64::from(atom.element.atomic_number()))
            .collect();
        let positions = conformer.positions();

        let mut matrix = Array2::<f64>::zeros((max_atoms, max_atoms));
        for i in 0..n {
            matrix[[i, i]] = 0.5 * charges[i].powf(2.4);
            for j in (i + 1)..n {
                let r = distance(&positions[i], &positions[j]).max(1e-8);
                let value = charges[i] * charges[j] / r;
                matrix[[i, j]] = value;
                matrix[[j, i]] = value;
            }
        }
        Ok(Output::Matrix(matrix))
    }
}
