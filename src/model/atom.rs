//! Graph-level atom representation used by structures read from line notations.
//!
//! An `Atom` carries the chemical identity of one vertex in the molecular graph. Hydrogens
//! are normally implicit: the owning [`Structure`](super::structure::Structure) derives them
//! from default valences unless an explicit count was given (bracket atoms). Coordinates are
//! not stored here; they live in the structure's conformers so several geometries can share
//! the same graph.

use super::types::{Chirality, Element};
use std::fmt;

/// Vertex of the molecular graph with charge, hydrogen, and aromaticity metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct Atom {
    /// Chemical element.
    pub element: Element,
    /// Formal charge in elementary charge units.
    pub charge: i8,
    /// Explicit attached hydrogen count. `None` means hydrogens follow default valences.
    pub hydrogens: Option<u8>,
    /// Whether the atom belongs to an aromatic system.
    pub aromatic: bool,
    /// Mass number when the atom is an explicit isotope.
    pub isotope: Option<u16>,
    /// Tetrahedral parity mark.
    pub chirality: Chirality,
    /// Atom class (reaction map number) attached in the notation.
    pub class: Option<u16>,
}

impl Atom {
    /// Creates a neutral, non-aromatic atom with implicit hydrogens.
    pub fn new(element: Element) -> Self {
        Self {
            element,
            charge: 0,
            hydrogens: None,
            aromatic: false,
            isotope: None,
            chirality: Chirality::None,
            class: None,
        }
    }

    /// Creates an aromatic atom with implicit hydrogens.
    pub fn aromatic(element: Element) -> Self {
        Self {
            aromatic: true,
            ..Self::new(element)
        }
    }

    /// Returns a copy with the given formal charge and explicit hydrogen count.
    pub fn with_charge(mut self, charge: i8, hydrogens: u8) -> Self {
        self.charge = charge;
        self.hydrogens = Some(hydrogens);
        self
    }

    /// Whether the atom carries any property that forces the bracket form.
    pub fn has_bracket_properties(&self) -> bool {
        self.charge != 0
            || self.isotope.is_some()
            || self.chirality != Chirality::None
            || self.class.is_some()
            || !self.element.is_organic_subset()
    }
}

impl fmt::Display for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = self.element.symbol();
        if self.aromatic {
            write!(f, "{}", symbol.to_ascii_lowercase())?;
        } else {
            write!(f, "{}", symbol)?;
        }
        match self.charge {
            0 => Ok(()),
            c if c > 0 => write!(f, "{:+}", c),
            c => write!(f, "{}", c),
        }
    }
}
