//! Molecular graph with attached conformers.
//!
//! The `Structure` type owns atoms, bonds, and zero or more [`Conformer`]s. Hydrogen counts
//! are derived on demand from default valences, so the same graph can be written back to a
//! line notation or handed to geometry and feature routines without re-parsing.

use super::atom::Atom;
use super::bond::Bond;
use super::conformer::{Conformer, ConformerMismatch};
use super::types::BondOrder;
use std::fmt;

/// In-memory chemical object: atoms, bonds, and attached 3D conformers.
///
/// Conformers are owned exclusively by the structure. Appending one requires a mutable
/// borrow, so two concurrent embeddings of the same structure cannot happen.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Structure {
    atoms: Vec<Atom>,
    bonds: Vec<Bond>,
    conformers: Vec<Conformer>,
}

impl Structure {
    /// Creates an empty structure.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an atom and returns its index.
    pub fn add_atom(&mut self, atom: Atom) -> usize {
        self.atoms.push(atom);
        self.atoms.len() - 1
    }

    /// Connects two existing atoms.
    ///
    /// Duplicate connections are ignored so ring-closure bookkeeping in readers can stay
    /// simple.
    ///
    /// # Arguments
    ///
    /// * `a` - Index of the first atom.
    /// * `b` - Index of the second atom; must differ from `a`.
    /// * `order` - Bond multiplicity.
    pub fn add_bond(&mut self, a: usize, b: usize, order: BondOrder) {
        debug_assert!(
            a < self.atoms.len() && b < self.atoms.len(),
            "Bond index out of bounds"
        );
        debug_assert_ne!(a, b, "Self-bonds are not allowed");
        if self.bond_between(a, b).is_none() {
            self.bonds.push(Bond::new(a, b, order));
        }
    }

    pub fn atoms(&self) -> &[Atom] {
        &self.atoms
    }

    pub fn atom(&self, idx: usize) -> Option<&Atom> {
        self.atoms.get(idx)
    }

    pub fn atom_mut(&mut self, idx: usize) -> Option<&mut Atom> {
        self.atoms.get_mut(idx)
    }

    pub fn bonds(&self) -> &[Bond] {
        &self.bonds
    }

    pub fn atom_count(&self) -> usize {
        self.atoms.len()
    }

    pub fn bond_count(&self) -> usize {
        self.bonds.len()
    }

    pub fn heavy_atom_count(&self) -> usize {
        self.atoms
            .iter()
            .filter(|a| a.element.is_heavy_atom())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }

    /// Looks up the bond joining two atoms, if any.
    pub fn bond_between(&self, a: usize, b: usize) -> Option<&Bond> {
        let probe = Bond::new(a, b, BondOrder::Single);
        self.bonds
            .iter()
            .find(|bond| bond.a1_idx == probe.a1_idx && bond.a2_idx == probe.a2_idx)
    }

    /// Iterates over `(neighbor index, bond order)` pairs of an atom in ascending neighbor order.
    pub fn neighbors(&self, idx: usize) -> impl Iterator<Item = (usize, BondOrder)> + '_ {
        let mut found: Vec<(usize, BondOrder)> = self
            .bonds
            .iter()
            .filter_map(|bond| bond.partner(idx).map(|other| (other, bond.order)))
            .collect();
        found.sort_by_key(|(other, _)| *other);
        found.into_iter()
    }

    /// Number of explicit graph neighbors.
    pub fn degree(&self, idx: usize) -> usize {
        self.bonds.iter().filter(|bond| bond.contains(idx)).count()
    }

    /// Sum of bond orders around an atom, counting aromatic bonds as 1.5.
    pub fn bond_valence(&self, idx: usize) -> f64 {
        self.bonds
            .iter()
            .filter(|bond| bond.contains(idx))
            .map(|bond| bond.order.value())
            .sum()
    }

    /// Hydrogen count the default valence model assigns to an atom written without brackets.
    ///
    /// Returns `None` for elements outside the organic subset, which have no default valence.
    pub fn default_hydrogens(&self, idx: usize) -> Option<u8> {
        let atom = self.atoms.get(idx)?;
        let valences = atom.element.default_valences();
        if valences.is_empty() {
            return None;
        }
        // Doubled to keep aromatic 1.5 contributions integral.
        let doubled: u32 = self
            .bonds
            .iter()
            .filter(|bond| bond.contains(idx))
            .map(|bond| (bond.order.value() * 2.0).round() as u32)
            .sum();
        let hydrogens = valences
            .iter()
            .map(|&v| u32::from(v) * 2)
            .find(|&v| v >= doubled)
            .map(|v| (v - doubled) / 2)
            .unwrap_or(0);
        Some(hydrogens as u8)
    }

    /// Attached hydrogen count: explicit when given, otherwise from the valence model.
    pub fn hydrogen_count(&self, idx: usize) -> u8 {
        match self.atoms.get(idx) {
            Some(atom) => atom
                .hydrogens
                .unwrap_or_else(|| self.default_hydrogens(idx).unwrap_or(0)),
            None => 0,
        }
    }

    /// Total implicit and explicit hydrogens attached to graph atoms.
    pub fn total_hydrogens(&self) -> usize {
        (0..self.atoms.len())
            .map(|idx| usize::from(self.hydrogen_count(idx)))
            .sum()
    }

    /// Net formal charge.
    pub fn formal_charge(&self) -> i32 {
        self.atoms.iter().map(|a| i32::from(a.charge)).sum()
    }

    /// Average molecular weight including attached hydrogens.
    pub fn molecular_weight(&self) -> f64 {
        let heavy: f64 = self.atoms.iter().map(|a| a.element.atomic_mass()).sum();
        heavy + self.total_hydrogens() as f64 * super::types::Element::H.atomic_mass()
    }

    /// Connected components as sorted atom index lists, ordered by their lowest atom.
    pub fn fragments(&self) -> Vec<Vec<usize>> {
        let mut component = vec![usize::MAX; self.atoms.len()];
        let mut fragments = Vec::new();

        for start in 0..self.atoms.len() {
            if component[start] != usize::MAX {
                continue;
            }
            let id = fragments.len();
            let mut members = Vec::new();
            let mut stack = vec![start];
            component[start] = id;
            while let Some(current) = stack.pop() {
                members.push(current);
                for (next, _) in self.neighbors(current) {
                    if component[next] == usize::MAX {
                        component[next] = id;
                        stack.push(next);
                    }
                }
            }
            members.sort_unstable();
            fragments.push(members);
        }

        fragments
    }

    /// Number of independent rings (cyclomatic number of the graph).
    pub fn ring_count(&self) -> usize {
        (self.bonds.len() + self.fragments().len()).saturating_sub(self.atoms.len())
    }

    /// Builds a new structure containing only the given atoms, in the given order.
    ///
    /// Bonds between retained atoms are kept and re-indexed. Conformers are projected onto
    /// the retained atoms so geometry survives fragment selection.
    ///
    /// # Arguments
    ///
    /// * `indices` - Atom indices to keep; out-of-range indices are skipped.
    pub fn subset(&self, indices: &[usize]) -> Structure {
        let mut remap = vec![None; self.atoms.len()];
        let mut result = Structure::new();
        let mut kept = Vec::with_capacity(indices.len());

        for &old in indices {
            if let Some(atom) = self.atoms.get(old) {
                if remap[old].is_none() {
                    remap[old] = Some(result.add_atom(atom.clone()));
                    kept.push(old);
                }
            }
        }

        for bond in &self.bonds {
            if let (Some(a), Some(b)) = (remap[bond.a1_idx], remap[bond.a2_idx]) {
                result.add_bond(a, b, bond.order);
            }
        }

        for conformer in &self.conformers {
            let positions = kept
                .iter()
                .filter_map(|&old| conformer.position(old).copied())
                .collect();
            result.conformers.push(Conformer::new(positions));
        }

        result
    }

    pub fn conformers(&self) -> &[Conformer] {
        &self.conformers
    }

    /// Most recently attached conformer.
    pub fn latest_conformer(&self) -> Option<&Conformer> {
        self.conformers.last()
    }

    /// Appends a conformer, returning its index.
    ///
    /// # Errors
    ///
    /// Returns [`ConformerMismatch`] when the conformer does not have one position per atom.
    pub fn add_conformer(&mut self, conformer: Conformer) -> Result<usize, ConformerMismatch> {
        if conformer.len() != self.atoms.len() {
            return Err(ConformerMismatch {
                expected: self.atoms.len(),
                found: conformer.len(),
            });
        }
        self.conformers.push(conformer);
        Ok(self.conformers.len() - 1)
    }

    pub fn clear_conformers(&mut self) {
        self.conformers.clear();
    }
}

impl fmt::Display for Structure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Structure {{ atoms: {}, bonds: {}, conformers: {} }}",
            self.atom_count(),
            self.bond_count(),
            self.conformers.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::types::{Element, Point};

    fn acetate_with_sodium() -> Structure {
        let mut s = Structure::new();
        let c1 = s.add_atom(Atom::new(Element::C));
        let c2 = s.add_atom(Atom::new(Element::C));
        let o1 = s.add_atom(Atom::new(Element::O));
        let o2 = s.add_atom(Atom::new(Element::O).with_charge(-1, 0));
        s.add_atom(Atom::new(Element::Na).with_charge(1, 0));
        s.add_bond(c1, c2, BondOrder::Single);
        s.add_bond(c2, o1, BondOrder::Double);
        s.add_bond(c2, o2, BondOrder::Single);
        s
    }

    fn benzene() -> Structure {
        let mut s = Structure::new();
        for _ in 0..6 {
            s.add_atom(Atom::aromatic(Element::C));
        }
        for i in 0..6 {
            s.add_bond(i, (i + 1) % 6, BondOrder::Aromatic);
        }
        s
    }

    #[test]
    fn structure_new_creates_empty_structure() {
        let structure = Structure::new();

        assert!(structure.is_empty());
        assert_eq!(structure.atom_count(), 0);
        assert_eq!(structure.bond_count(), 0);
        assert!(structure.conformers().is_empty());
    }

    #[test]
    fn add_bond_ignores_duplicates() {
        let mut s = Structure::new();
        let a = s.add_atom(Atom::new(Element::C));
        let b = s.add_atom(Atom::new(Element::C));
        s.add_bond(a, b, BondOrder::Single);
        s.add_bond(b, a, BondOrder::Single);

        assert_eq!(s.bond_count(), 1);
    }

    #[test]
    fn default_hydrogens_follow_valence_rules() {
        let s = acetate_with_sodium();

        assert_eq!(s.hydrogen_count(0), 3);
        assert_eq!(s.hydrogen_count(1), 0);
        assert_eq!(s.hydrogen_count(2), 0);
        assert_eq!(s.hydrogen_count(3), 0);
        assert_eq!(s.default_hydrogens(3), Some(1));
        assert_eq!(s.default_hydrogens(4), None);
    }

    #[test]
    fn aromatic_carbons_receive_one_hydrogen() {
        let s = benzene();

        assert!((0..6).all(|i| s.hydrogen_count(i) == 1));
        assert_eq!(s.total_hydrogens(), 6);
        assert_eq!(s.ring_count(), 1);
    }

    #[test]
    fn fragments_are_ordered_by_lowest_atom() {
        let s = acetate_with_sodium();

        assert_eq!(s.fragments(), vec![vec![0, 1, 2, 3], vec![4]]);
        assert_eq!(s.formal_charge(), 0);
    }

    #[test]
    fn molecular_weight_includes_implicit_hydrogens() {
        let mut s = Structure::new();
        s.add_atom(Atom::new(Element::C));

        let expected = Element::C.atomic_mass() + 4.0 * Element::H.atomic_mass();
        assert!((s.molecular_weight() - expected).abs() < 1e-9);
    }

    #[test]
    fn subset_reindexes_bonds_and_projects_conformers() {
        let mut s = acetate_with_sodium();
        let positions = (0..5).map(|i| Point::new(i as f64, 0.0, 0.0)).collect();
        s.add_conformer(Conformer::new(positions)).unwrap();

        let sub = s.subset(&[1, 3]);

        assert_eq!(sub.atom_count(), 2);
        assert_eq!(sub.bond_count(), 1);
        assert_eq!(sub.bonds()[0], Bond::new(0, 1, BondOrder::Single));
        assert_eq!(sub.conformers()[0].positions()[1], Point::new(3.0, 0.0, 0.0));
    }

    #[test]
    fn add_conformer_rejects_wrong_length() {
        let mut s = benzene();

        let err = s
            .add_conformer(Conformer::new(vec![Point::origin()]))
            .unwrap_err();

        assert_eq!(err.expected, 6);
        assert_eq!(err.found, 1);
        assert!(s.conformers().is_empty());
    }

    #[test]
    fn conformers_accumulate_without_merging() {
        let mut s = Structure::new();
        s.add_atom(Atom::new(Element::C));
        s.add_conformer(Conformer::new(vec![Point::origin()])).unwrap();
        s.add_conformer(Conformer::new(vec![Point::origin()])).unwrap();

        assert_eq!(s.conformers().len(), 2);
    }
}
