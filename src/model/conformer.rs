//! Three-dimensional coordinate sets attached to a structure.
//!
//! A `Conformer` holds exactly one [`Point`] per atom of its owning structure, in atom
//! order. Conformers are only created by geometry embedding and are owned by the structure
//! they were attached to; several may coexist and none are ever merged.

use super::structure::Structure;
use super::types::Point;
use std::fmt;
use thiserror::Error;

/// Rejection raised when a conformer does not cover every atom of the target structure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("conformer has {found} positions but the structure has {expected} atoms")]
pub struct ConformerMismatch {
    pub expected: usize,
    pub found: usize,
}

/// One 3D coordinate assignment for a structure's atoms.
#[derive(Debug, Clone, PartialEq)]
pub struct Conformer {
    positions: Vec<Point>,
    /// Final energy reported by the optimizer that produced the geometry, if any.
    pub energy: Option<f64>,
}

impl Conformer {
    pub fn new(positions: Vec<Point>) -> Self {
        Self {
            positions,
            energy: None,
        }
    }

    pub fn with_energy(mut self, energy: f64) -> Self {
        self.energy = Some(energy);
        self
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn position(&self, idx: usize) -> Option<&Point> {
        self.positions.get(idx)
    }

    pub fn positions(&self) -> &[Point] {
        &self.positions
    }

    /// Unweighted centroid of all positions, or the origin for an empty conformer.
    pub fn centroid(&self) -> Point {
        if self.positions.is_empty() {
            return Point::origin();
        }
        let sum = self
            .positions
            .iter()
            .fold(nalgebra::Vector3::zeros(), |acc, p| acc + p.coords);
        Point::from(sum / self.positions.len() as f64)
    }

    /// Renders the conformer as an XYZ block using the structure's element symbols.
    ///
    /// # Arguments
    ///
    /// * `structure` - Owner supplying element identities, in the same atom order.
    /// * `comment` - Free text written on the second line of the block.
    pub fn to_xyz(&self, structure: &Structure, comment: &str) -> String {
        let mut out = format!("{}\n{}\n", self.positions.len(), comment);
        for (atom, pos) in structure.atoms().iter().zip(&self.positions) {
            out.push_str(&format!(
                "{:<2} {:>12.6} {:>12.6} {:>12.6}\n",
                atom.element.symbol(),
                pos.x,
                pos.y,
                pos.z
            ));
        }
        out
    }
}

/// Formats a point as `(x, y, z)` with two decimals.
pub fn format_point(point: &Point) -> String {
    format!("({:.2}, {:.2}, {:.2})", point.x, point.y, point.z)
}

impl fmt::Display for Conformer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: Vec<String> = self.positions.iter().map(format_point).collect();
        write!(f, "[{}]", rendered.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::atom::Atom;
    use crate::model::types::{BondOrder, Element};

    #[test]
    fn centroid_averages_positions() {
        let conformer = Conformer::new(vec![Point::new(0.0, 0.0, 0.0), Point::new(2.0, 4.0, -2.0)]);

        assert_eq!(conformer.centroid(), Point::new(1.0, 2.0, -1.0));
        assert_eq!(Conformer::new(vec![]).centroid(), Point::origin());
    }

    #[test]
    fn format_point_uses_two_decimals() {
        assert_eq!(format_point(&Point::new(1.0, -0.456, 10.0)), "(1.00, -0.46, 10.00)");
    }

    #[test]
    fn to_xyz_writes_count_comment_and_rows() {
        let mut structure = Structure::new();
        let c = structure.add_atom(Atom::new(Element::C));
        let o = structure.add_atom(Atom::new(Element::O));
        structure.add_bond(c, o, BondOrder::Double);
        let conformer = Conformer::new(vec![Point::origin(), Point::new(1.2, 0.0, 0.0)]);

        let block = conformer.to_xyz(&structure, "formaldehyde");
        let lines: Vec<&str> = block.lines().collect();

        assert_eq!(lines[0], "2");
        assert_eq!(lines[1], "formaldehyde");
        assert!(lines[2].starts_with("C "));
        assert!(lines[3].starts_with("O "));
        assert!(lines[3].contains("1.200000"));
    }
}
