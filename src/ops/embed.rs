//! 3D coordinate generation for molecular graphs.
//!
//! [`ForcefieldEmbedder`] grows a seeded random tree layout over each fragment and relaxes it
//! with steepest descent on a small distance-geometry forcefield: bond stretches (harmonic
//! or Morse), 1-3 distances standing in for angle bends, and a soft repulsion between all
//! other atom pairs. Only explicit graph atoms receive coordinates.

use super::config::{CollaboratorAccess, UnitConfig};
use super::error::Error;
use super::unit::{Output, OutputKind, TransformUnit, UnitKind};
use crate::model::{
    conformer::Conformer,
    structure::Structure,
    types::{BondOrder, Point},
};
use nalgebra::Vector3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Deserialize;
use std::collections::{HashSet, VecDeque};
use std::f64::consts::TAU;
use std::fmt;
use std::sync::Arc;

const BOND_FORCE_CONSTANT: f64 = 700.0;
const MORSE_WELL_DEPTH: f64 = 100.0;
const ANGLE_FORCE_CONSTANT: f64 = 100.0;
const REPULSION_FORCE_CONSTANT: f64 = 50.0;
const REPULSION_DISTANCE: f64 = 2.5;
const FRAGMENT_SPACING: f64 = 6.0;
const INITIAL_STEP: f64 = 1e-3;
const MIN_STEP: f64 = 1e-14;

/// Functional form of the bond-stretch term.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ForcefieldKind {
    /// `k (r - r0)^2`
    #[default]
    Harmonic,
    /// `D (1 - exp(-a (r - r0)))^2` with the same curvature at `r0` as the harmonic form.
    Morse,
}

impl fmt::Display for ForcefieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ForcefieldKind::Harmonic => f.write_str("harmonic"),
            ForcefieldKind::Morse => f.write_str("morse"),
        }
    }
}

impl std::str::FromStr for ForcefieldKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "harmonic" => Ok(ForcefieldKind::Harmonic),
            "morse" => Ok(ForcefieldKind::Morse),
            _ => Err(format!("Unknown forcefield: {}", s)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EmbedOptions {
    pub forcefield: ForcefieldKind,
    pub max_iterations: usize,
    /// Convergence threshold on the RMS gradient, in energy units per ångström.
    pub gradient_tolerance: f64,
    pub seed: u64,
}

impl Default for EmbedOptions {
    fn default() -> Self {
        Self {
            forcefield: ForcefieldKind::Harmonic,
            max_iterations: 2000,
            gradient_tolerance: 0.05,
            seed: 42,
        }
    }
}

/// Service that produces one conformer for a structure.
pub trait ConformerGenerator: Send + Sync {
    fn name(&self) -> &str;

    fn check(&self) -> Result<(), Error> {
        Ok(())
    }

    fn access_hint(&self) -> CollaboratorAccess {
        CollaboratorAccess::Shared
    }

    /// Generates positions for every atom of `structure`.
    ///
    /// # Errors
    ///
    /// [`Error::NotConverged`] when optimization fails for this structure.
    fn generate(&self, structure: &Structure, options: &EmbedOptions) -> Result<Conformer, Error>;
}

/// Built-in generator: seeded tree layout plus forcefield relaxation.
#[derive(Debug, Clone, Copy, Default)]
pub struct ForcefieldEmbedder;

impl ConformerGenerator for ForcefieldEmbedder {
    fn name(&self) -> &str {
        "forcefield"
    }

    fn generate(&self, structure: &Structure, options: &EmbedOptions) -> Result<Conformer, Error> {
        if structure.is_empty() {
            return Err(Error::EmptyStructure);
        }

        let mut rng = StdRng::seed_from_u64(options.seed);
        let model = Forcefield::build(structure, options.forcefield);
        let mut positions = initial_layout(structure, &model, &mut rng);

        let energy = minimize(&model, &mut positions, options)?;
        Ok(Conformer::new(positions).with_energy(energy))
    }
}

#[derive(Debug, Clone, Copy)]
struct DistanceTerm {
    i: usize,
    j: usize,
    target: f64,
}

struct Forcefield {
    kind: ForcefieldKind,
    bonds: Vec<DistanceTerm>,
    angles: Vec<DistanceTerm>,
    repulsions: Vec<DistanceTerm>,
}

impl Forcefield {
    fn build(structure: &Structure, kind: ForcefieldKind) -> Self {
        let n = structure.atom_count();
        let mut bonded: HashSet<(usize, usize)> = HashSet::new();

        let bonds: Vec<DistanceTerm> = structure
            .bonds()
            .iter()
            .map(|bond| {
                bonded.insert((bond.a1_idx, bond.a2_idx));
                DistanceTerm {
                    i: bond.a1_idx,
                    j: bond.a2_idx,
                    target: bond_length(structure, bond.a1_idx, bond.a2_idx, bond.order),
                }
            })
            .collect();

        let mut angles = Vec::new();
        for center in 0..n {
            let neighbors: Vec<(usize, BondOrder)> = structure.neighbors(center).collect();
            let theta = ideal_angle(&neighbors);
            for (x, &(a, order_a)) in neighbors.iter().enumerate() {
                for &(c, order_c) in &neighbors[x + 1..] {
                    let key = (a.min(c), a.max(c));
                    if !bonded.insert(key) {
                        continue;
                    }
                    let r_a = bond_length(structure, center, a, order_a);
                    let r_c = bond_length(structure, center, c, order_c);
                    let target = (r_a * r_a + r_c * r_c - 2.0 * r_a * r_c * theta.cos()).sqrt();
                    angles.push(DistanceTerm {
                        i: key.0,
                        j: key.1,
                        target,
                    });
                }
            }
        }

        let mut repulsions = Vec::new();
        for i in 0..n {
            for j in (i + 1)..n {
                if !bonded.contains(&(i, j)) {
                    repulsions.push(DistanceTerm {
                        i,
                        j,
                        target: REPULSION_DISTANCE,
                    });
                }
            }
        }

        Self {
            kind,
            bonds,
            angles,
            repulsions,
        }
    }

    fn bond_target(&self, i: usize, j: usize) -> Option<f64> {
        self.bonds
            .iter()
            .find(|t| (t.i == i && t.j == j) || (t.i == j && t.j == i))
            .map(|t| t.target)
    }

    /// Energy only, for line searches.
    fn energy(&self, positions: &[Point]) -> f64 {
        self.evaluate(positions, None)
    }

    /// Energy and, when requested, its gradient with respect to every position.
    fn evaluate(&self, positions: &[Point], mut gradient: Option<&mut [Vector3<f64>]>) -> f64 {
        if let Some(g) = gradient.as_deref_mut() {
            g.iter_mut().for_each(|v| *v = Vector3::zeros());
        }

        let mut energy = 0.0;
        let mut accumulate = |term: &DistanceTerm, f: &dyn Fn(f64) -> (f64, f64)| {
            let delta = positions[term.i] - positions[term.j];
            let r = delta.norm().max(1e-9);
            let (e, de_dr) = f(r);
            energy += e;
            if let Some(g) = gradient.as_deref_mut() {
                let force = delta * (de_dr / r);
                g[term.i] += force;
                g[term.j] -= force;
            }
        };

        for term in &self.bonds {
            let target = term.target;
            match self.kind {
                ForcefieldKind::Harmonic => accumulate(term, &|r| harmonic(r, target, BOND_FORCE_CONSTANT)),
                ForcefieldKind::Morse => accumulate(term, &|r| morse(r, target)),
            }
        }
        for term in &self.angles {
            let target = term.target;
            accumulate(term, &|r| harmonic(r, target, ANGLE_FORCE_CONSTANT));
        }
        for term in &self.repulsions {
            let target = term.target;
            accumulate(term, &|r| {
                if r >= target {
                    (0.0, 0.0)
                } else {
                    harmonic(r, target, REPULSION_FORCE_CONSTANT)
                }
            });
        }

        energy
    }
}

fn harmonic(r: f64, target: f64, k: f64) -> (f64, f64) {
    let dr = r - target;
    (k * dr * dr, 2.0 * k * dr)
}

fn morse(r: f64, target: f64) -> (f64, f64) {
    let a = (BOND_FORCE_CONSTANT / MORSE_WELL_DEPTH).sqrt();
    let x = (-a * (r - target)).exp();
    let one_minus = 1.0 - x;
    (
        MORSE_WELL_DEPTH * one_minus * one_minus,
        2.0 * MORSE_WELL_DEPTH * a * one_minus * x,
    )
}

fn bond_length(structure: &Structure, a: usize, b: usize, order: BondOrder) -> f64 {
    let radius = |idx: usize| {
        structure
            .atom(idx)
            .map(|atom| atom.element.covalent_radius())
            .unwrap_or(0.76)
    };
    let factor = match order {
        BondOrder::Single => 1.0,
        BondOrder::Aromatic => 0.93,
        BondOrder::Double => 0.87,
        BondOrder::Triple => 0.78,
    };
    (radius(a) + radius(b)) * factor
}

fn ideal_angle(neighbors: &[(usize, BondOrder)]) -> f64 {
    let triples = neighbors
        .iter()
        .filter(|(_, o)| *o == BondOrder::Triple)
        .count();
    let doubles = neighbors
        .iter()
        .filter(|(_, o)| *o == BondOrder::Double)
        .count();
    let aromatic = neighbors.iter().any(|(_, o)| *o == BondOrder::Aromatic);

    if triples > 0 || doubles > 1 {
        180f64.to_radians()
    } else if doubles == 1 || aromatic {
        120f64.to_radians()
    } else {
        109.47f64.to_radians()
    }
}

fn random_direction(rng: &mut StdRng) -> Vector3<f64> {
    let z: f64 = rng.random_range(-1.0..1.0);
    let phi: f64 = rng.random_range(0.0..TAU);
    let s = (1.0 - z * z).sqrt();
    Vector3::new(s * phi.cos(), s * phi.sin(), z)
}

/// Breadth-first placement along bonds, one fragment after another along the x axis.
fn initial_layout(structure: &Structure, model: &Forcefield, rng: &mut StdRng) -> Vec<Point> {
    let mut positions = vec![Point::origin(); structure.atom_count()];
    let mut placed = vec![false; structure.atom_count()];

    for (f_idx, fragment) in structure.fragments().iter().enumerate() {
        let Some(&root) = fragment.first() else {
            continue;
        };
        positions[root] = Point::new(f_idx as f64 * FRAGMENT_SPACING, 0.0, 0.0);
        placed[root] = true;

        let mut queue = VecDeque::from([root]);
        while let Some(current) = queue.pop_front() {
            for (next, order) in structure.neighbors(current) {
                if placed[next] {
                    continue;
                }
                let length = model
                    .bond_target(current, next)
                    .unwrap_or_else(|| bond_length(structure, current, next, order));
                positions[next] = positions[current] + random_direction(rng) * length;
                placed[next] = true;
                queue.push_back(next);
            }
        }
    }

    positions
}

fn rms(gradient: &[Vector3<f64>]) -> f64 {
    if gradient.is_empty() {
        return 0.0;
    }
    let sum: f64 = gradient.iter().map(|g| g.norm_squared()).sum();
    (sum / gradient.len() as f64).sqrt()
}

/// Steepest descent with a backtracking step size. Returns the final energy.
fn minimize(model: &Forcefield, positions: &mut [Point], options: &EmbedOptions) -> Result<f64, Error> {
    let mut gradient = vec![Vector3::zeros(); positions.len()];
    let mut energy = model.evaluate(positions, Some(gradient.as_mut_slice()));
    let mut step = INITIAL_STEP;
    let mut trial = positions.to_vec();

    for _ in 0..options.max_iterations {
        if rms(&gradient) < options.gradient_tolerance {
            return Ok(energy);
        }

        let mut accepted = false;
        while step > MIN_STEP {
            for ((t, p), g) in trial.iter_mut().zip(positions.iter()).zip(&gradient) {
                *t = p - g * step;
            }
            let trial_energy = model.energy(&trial);
            if trial_energy < energy {
                positions.copy_from_slice(&trial);
                step *= 1.2;
                accepted = true;
                break;
            }
            step *= 0.5;
        }
        if !accepted {
            break;
        }
        energy = model.evaluate(positions, Some(gradient.as_mut_slice()));
    }

    let rms_gradient = rms(&gradient);
    if rms_gradient < options.gradient_tolerance {
        Ok(energy)
    } else {
        Err(Error::NotConverged {
            iterations: options.max_iterations,
            rms_gradient,
        })
    }
}

/// Geometry-embedder unit: attaches one conformer and returns the updated structure.
#[derive(Clone)]
pub struct GeometryEmbedder {
    config: UnitConfig,
    options: EmbedOptions,
    generator: Arc<dyn ConformerGenerator>,
}

impl Default for GeometryEmbedder {
    fn default() -> Self {
        Self::new()
    }
}

impl GeometryEmbedder {
    pub fn new() -> Self {
        Self {
            config: UnitConfig::default(),
            options: EmbedOptions::default(),
            generator: Arc::new(ForcefieldEmbedder),
        }
    }

    pub fn with_options(mut self, options: EmbedOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_generator(mut self, generator: Arc<dyn ConformerGenerator>) -> Self {
        self.generator = generator;
        self
    }

    pub fn with_config(mut self, config: UnitConfig) -> Self {
        self.config = config;
        self
    }

    pub fn options(&self) -> &EmbedOptions {
        &self.options
    }
}

impl TransformUnit for GeometryEmbedder {
    fn name(&self) -> &str {
        "GeometryEmbedder"
    }

    fn kind(&self) -> UnitKind {
        UnitKind::GeometryEmbedder
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
        if !(self.options.gradient_tolerance > 0.0) {
            return Err(Error::invalid_options(
                self.name(),
                "gradient_tolerance must be positive",
            ));
        }
        self.generator.check()
    }

    fn collaborator_access(&self) -> CollaboratorAccess {
        self.generator.access_hint()
    }

    fn apply(&self, structure: &mut Structure) -> Result<Output, Error> {
        let conformer = self.generator.generate(structure, &self.options)?;
        structure
            .add_conformer(conformer)
            .map_err(|e| Error::malformed_response(self.generator.name(), e.to_string()))?;
        Ok(Output::Structure(structure.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::{Notation, Smiles};
    use nalgebra::distance;

    fn embed(text: &str, options: EmbedOptions) -> Structure {
        let mut structure = Smiles.parse(text).unwrap();
        let unit = GeometryEmbedder::new().with_options(options);
        match unit.apply(&mut structure).unwrap() {
            Output::Structure(s) => s,
            other => panic!("unexpected output {:?}", other),
        }
    }

    #[test]
    fn ethane_gets_a_relaxed_carbon_carbon_bond() {
        let structure = embed("CC", EmbedOptions::default());
        let conformer = structure.latest_conformer().unwrap();

        let d = distance(
            conformer.position(0).unwrap(),
            conformer.position(1).unwrap(),
        );
        assert!((d - 1.52).abs() < 0.02, "C-C distance {}", d);
        assert!(conformer.energy.is_some());
    }

    #[test]
    fn both_forcefields_converge() {
        for forcefield in [ForcefieldKind::Harmonic, ForcefieldKind::Morse] {
            let options = EmbedOptions {
                forcefield,
                ..EmbedOptions::default()
            };
            let structure = embed("CCO", options);
            assert_eq!(structure.conformers().len(), 1);
            assert_eq!(structure.latest_conformer().unwrap().len(), 3);
        }
    }

    #[test]
    fn same_seed_gives_same_coordinates() {
        let a = embed("CC(=O)O", EmbedOptions::default());
        let b = embed("CC(=O)O", EmbedOptions::default());

        assert_eq!(a.latest_conformer(), b.latest_conformer());
    }

    #[test]
    fn embedding_appends_to_existing_conformers() {
        let mut structure = Smiles.parse("CO").unwrap();
        let unit = GeometryEmbedder::new();
        unit.apply(&mut structure).unwrap();
        unit.apply(&mut structure).unwrap();

        assert_eq!(structure.conformers().len(), 2);
    }

    #[test]
    fn fragments_are_placed_apart() {
        let structure = embed("C.C", EmbedOptions::default());
        let conformer = structure.latest_conformer().unwrap();

        let d = distance(
            conformer.position(0).unwrap(),
            conformer.position(1).unwrap(),
        );
        assert!(d >= REPULSION_DISTANCE);
    }

    #[test]
    fn exhausted_iterations_mark_the_item_failed() {
        let mut structure = Smiles.parse("CCCC").unwrap();
        let unit = GeometryEmbedder::new().with_options(EmbedOptions {
            max_iterations: 0,
            ..EmbedOptions::default()
        });
        let err = unit.apply(&mut structure).unwrap_err();

        assert!(matches!(err, Error::NotConverged { .. }));
        assert!(!err.is_fatal());
        assert!(structure.conformers().is_empty());
    }

    #[test]
    fn empty_structure_is_an_item_failure() {
        let err = GeometryEmbedder::new()
            .apply(&mut Structure::new())
            .unwrap_err();

        assert_eq!(err, Error::EmptyStructure);
    }

    #[test]
    fn non_positive_tolerance_is_rejected_up_front() {
        let unit = GeometryEmbedder::new().with_options(EmbedOptions {
            gradient_tolerance: 0.0,
            ..EmbedOptions::default()
        });

        assert!(unit.check_ready().unwrap_err().is_fatal());
    }

    #[test]
    fn forcefield_kind_parses_case_insensitively() {
        assert_eq!("Morse".parse::<ForcefieldKind>().unwrap(), ForcefieldKind::Morse);
        assert!("uff".parse::<ForcefieldKind>().is_err());
    }
}
