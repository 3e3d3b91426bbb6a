//! Undirected bonds between atoms of a [`Structure`](super::structure::Structure).

use super::types::BondOrder;
use std::fmt;

/// Undirected bond connecting two atoms within a structure.
///
/// Bonds store canonical atom indices (ascending order) so equality, hashing, and sorting
/// remain stable regardless of the order in which the connection was created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Bond {
    /// Index of the first atom (always the lesser index after canonicalization).
    pub a1_idx: usize,
    /// Index of the second atom (greater than `a1_idx`).
    pub a2_idx: usize,
    /// Chemical multiplicity assigned to the bond.
    pub order: BondOrder,
}

impl Bond {
    /// Creates a new bond while canonicalizing the endpoint ordering.
    ///
    /// # Arguments
    ///
    /// * `idx1` - Index of one bonded atom within the owning structure.
    /// * `idx2` - Index of the partner atom.
    /// * `order` - Chemical bond order describing multiplicity or aromaticity.
    ///
    /// # Returns
    ///
    /// A `Bond` whose indices are sorted so `a1_idx <= a2_idx`.
    pub fn new(idx1: usize, idx2: usize, order: BondOrder) -> Self {
        if idx1 <= idx2 {
            Self {
                a1_idx: idx1,
                a2_idx: idx2,
                order,
            }
        } else {
            Self {
                a1_idx: idx2,
                a2_idx: idx1,
                order,
            }
        }
    }

    /// Whether the bond touches the given atom.
    pub fn contains(&self, idx: usize) -> bool {
        self.a1_idx == idx || self.a2_idx == idx
    }

    /// Returns the opposite endpoint when `idx` is one of the bond's atoms.
    pub fn partner(&self, idx: usize) -> Option<usize> {
        if self.a1_idx == idx {
            Some(self.a2_idx)
        } else if self.a2_idx == idx {
            Some(self.a1_idx)
        } else {
            None
        }
    }
}

impl fmt::Display for Bond {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{} ({})", self.a1_idx, self.a2_idx, self.order)
    }
}
