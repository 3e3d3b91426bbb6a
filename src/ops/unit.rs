//! The transform unit contract.
//!
//! A unit maps exactly one [`Structure`] to exactly one [`Output`]. It declares the shape of
//! that output once, through [`OutputKind`], so the engine can decide the container for a
//! whole batch before any item runs. Units never see collections; batching, ordering, and
//! failure isolation belong to the engine.

use super::config::{CollaboratorAccess, UnitConfig};
use super::error::Error;
use crate::model::structure::Structure;
use crate::utils::naming::column_prefix;
use ndarray::{Array1, Array2};
use std::fmt;

/// Dimensionality of a single-structure output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Rank {
    /// One value per structure: a structure or a number.
    Scalar,
    /// A fixed-length numeric vector.
    Vector,
    /// A fixed-shape numeric table.
    Matrix,
}

impl Rank {
    pub fn value(&self) -> usize {
        match self {
            Rank::Scalar => 0,
            Rank::Vector => 1,
            Rank::Matrix => 2,
        }
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value())
    }
}

/// Family a unit belongs to.
///
/// Every family reports item-level failures the same way: the item becomes absent and the
/// rest of the batch continues. What counts as an item-level failure differs:
///
/// - canonicalizers: the standardizer rejected the structure or returned unparseable text;
/// - geometry embedders: the optimizer did not converge;
/// - feature extractors: the structure lacks what the feature needs (a conformer, or fits
///   within a size limit).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnitKind {
    Canonicalizer,
    GeometryEmbedder,
    FeatureExtractor,
}

impl fmt::Display for UnitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            UnitKind::Canonicalizer => "canonicalizer",
            UnitKind::GeometryEmbedder => "geometry embedder",
            UnitKind::FeatureExtractor => "feature extractor",
        };
        f.write_str(name)
    }
}

/// Declared shape of a unit's per-structure output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputKind {
    Structure,
    Scalar,
    Vector { len: usize },
    Matrix { rows: usize, cols: usize },
}

impl OutputKind {
    pub fn rank(&self) -> Rank {
        match self {
            OutputKind::Structure | OutputKind::Scalar => Rank::Scalar,
            OutputKind::Vector { .. } => Rank::Vector,
            OutputKind::Matrix { .. } => Rank::Matrix,
        }
    }
}

impl fmt::Display for OutputKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputKind::Structure => f.write_str("structure"),
            OutputKind::Scalar => f.write_str("scalar"),
            OutputKind::Vector { len } => write!(f, "vector[{}]", len),
            OutputKind::Matrix { rows, cols } => write!(f, "matrix[{}x{}]", rows, cols),
        }
    }
}

/// Result of applying a unit to one structure.
#[derive(Debug, Clone, PartialEq)]
pub enum Output {
    Structure(Structure),
    Scalar(f64),
    Vector(Array1<f64>),
    Matrix(Array2<f64>),
}

impl Output {
    /// Whether this output has the shape a unit declared.
    pub fn conforms_to(&self, kind: &OutputKind) -> bool {
        match (self, kind) {
            (Output::Structure(_), OutputKind::Structure) => true,
            (Output::Scalar(_), OutputKind::Scalar) => true,
            (Output::Vector(v), OutputKind::Vector { len }) => v.len() == *len,
            (Output::Matrix(m), OutputKind::Matrix { rows, cols }) => m.dim() == (*rows, *cols),
            _ => false,
        }
    }

    /// Short description of the actual shape, for diagnostics.
    pub fn describe(&self) -> String {
        match self {
            Output::Structure(_) => OutputKind::Structure.to_string(),
            Output::Scalar(_) => OutputKind::Scalar.to_string(),
            Output::Vector(v) => OutputKind::Vector { len: v.len() }.to_string(),
            Output::Matrix(m) => OutputKind::Matrix {
                rows: m.nrows(),
                cols: m.ncols(),
            }
            .to_string(),
        }
    }
}

/// A 1:1 transformation of a structure.
///
/// Implementations must be safe to call from several workers at once. A unit may append a
/// conformer to the structure it is given, which is why `apply` takes a mutable borrow; any
/// other mutation is a contract violation.
pub trait TransformUnit: Send + Sync {
    /// Display name in `CamelCase`, e.g. `MorganFingerprint`.
    fn name(&self) -> &str;

    fn kind(&self) -> UnitKind;

    fn output_kind(&self) -> OutputKind;

    fn rank(&self) -> Rank {
        self.output_kind().rank()
    }

    fn config(&self) -> &UnitConfig;

    fn config_mut(&mut self) -> &mut UnitConfig;

    /// Column names for vector outputs, one per component.
    ///
    /// The default names are `<snake_case name>_<i>`.
    fn feature_names(&self) -> Vec<String> {
        match self.output_kind() {
            OutputKind::Vector { len } => {
                let prefix = column_prefix(self.name());
                (0..len).map(|i| format!("{}_{}", prefix, i)).collect()
            }
            _ => Vec::new(),
        }
    }

    /// Verifies options and collaborators before a batch starts.
    ///
    /// # Errors
    ///
    /// Returns a fatal [`Error`] when the unit cannot run at all.
    fn check_ready(&self) -> Result<(), Error> {
        Ok(())
    }

    /// Access policy the unit's collaborator prefers when the config does not override it.
    fn collaborator_access(&self) -> CollaboratorAccess {
        CollaboratorAccess::Shared
    }

    /// Policy in effect for the next batch.
    fn effective_access(&self) -> CollaboratorAccess {
        self.config()
            .collaborator_access
            .unwrap_or_else(|| self.collaborator_access())
    }

    /// Transforms one structure.
    ///
    /// # Errors
    ///
    /// Non-fatal errors mark this item absent; fatal ones abort the batch.
    fn apply(&self, structure: &mut Structure) -> Result<Output, Error>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array1, Array2};

    struct Counter {
        config: UnitConfig,
    }

    impl TransformUnit for Counter {
        fn name(&self) -> &str {
            "AtomCounts"
        }

        fn kind(&self) -> UnitKind {
            UnitKind::FeatureExtractor
        }

        fn output_kind(&self) -> OutputKind {
            OutputKind::Vector { len: 3 }
        }

        fn config(&self) -> &UnitConfig {
            &self.config
        }

        fn config_mut(&mut self) -> &mut UnitConfig {
            &mut self.config
        }

        fn apply(&self, structure: &mut Structure) -> Result<Output, Error> {
            Ok(Output::Vector(Array1::from(vec![
                structure.atom_count() as f64,
                structure.bond_count() as f64,
                structure.total_hydrogens() as f64,
            ])))
        }
    }

    #[test]
    fn output_kinds_map_to_ranks() {
        assert_eq!(OutputKind::Structure.rank(), Rank::Scalar);
        assert_eq!(OutputKind::Scalar.rank(), Rank::Scalar);
        assert_eq!(OutputKind::Vector { len: 8 }.rank(), Rank::Vector);
        assert_eq!(OutputKind::Matrix { rows: 2, cols: 2 }.rank().value(), 2);
    }

    #[test]
    fn conformance_checks_shape() {
        let kind = OutputKind::Vector { len: 3 };

        assert!(Output::Vector(Array1::zeros(3)).conforms_to(&kind));
        assert!(!Output::Vector(Array1::zeros(4)).conforms_to(&kind));
        assert!(!Output::Scalar(1.0).conforms_to(&kind));
        assert!(
            Output::Matrix(Array2::zeros((2, 3))).conforms_to(&OutputKind::Matrix { rows: 2, cols: 3 })
        );
        assert_eq!(Output::Vector(Array1::zeros(4)).describe(), "vector[4]");
    }

    #[test]
    fn default_feature_names_use_snake_case_prefix() {
        let unit = Counter {
            config: UnitConfig::default(),
        };

        assert_eq!(
            unit.feature_names(),
            vec!["atom_counts_0", "atom_counts_1", "atom_counts_2"]
        );
        assert_eq!(unit.rank(), Rank::Vector);
    }

    #[test]
    fn config_override_wins_over_collaborator_hint() {
        let mut unit = Counter {
            config: UnitConfig::default(),
        };
        assert_eq!(unit.effective_access(), CollaboratorAccess::Shared);

        unit.config_mut().collaborator_access = Some(CollaboratorAccess::Serialized);
        assert_eq!(unit.effective_access(), CollaboratorAccess::Serialized);
    }
}
