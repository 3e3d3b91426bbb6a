use crate::model::{
    structure::Structure,
    types::{BondOrder, Element},
};
use std::collections::BTreeSet;

/// Serializes a [`Structure`] to SMILES.
///
/// Atoms are emitted depth first in stored order, starting each fragment at its lowest
/// unvisited atom and visiting lower-index neighbors first. Bracket syntax is used only
/// when an atom cannot be expressed in organic-subset form, so a string produced here
/// parses back to a structure that writes the identical string.
pub fn write(structure: &Structure) -> String {
    let tree = SpanningForest::build(structure);
    let mut emitter = Emitter {
        structure,
        tree: &tree,
        out: String::new(),
        open_rings: Vec::new(),
    };

    for (i, &root) in tree.roots.iter().enumerate() {
        if i > 0 {
            emitter.out.push('.');
        }
        emitter.emit_from(root);
    }

    emitter.out
}

/// Depth-first spanning forest plus the ring-closure bonds left out of it.
struct SpanningForest {
    roots: Vec<usize>,
    children: Vec<Vec<usize>>,
    /// Ring closures as `(opened_at, closed_at)`, where the opener is visited first.
    closures: Vec<(usize, usize)>,
}

impl SpanningForest {
    fn build(structure: &Structure) -> Self {
        let n = structure.atom_count();
        let neighbors: Vec<Vec<usize>> = (0..n)
            .map(|i| structure.neighbors(i).map(|(j, _)| j).collect())
            .collect();

        let mut visited = vec![false; n];
        let mut parent = vec![None; n];
        let mut children = vec![Vec::new(); n];
        let mut closure_set = BTreeSet::new();
        let mut closures = Vec::new();
        let mut roots = Vec::new();

        for root in 0..n {
            if visited[root] {
                continue;
            }
            roots.push(root);
            visited[root] = true;
            let mut stack: Vec<(usize, usize)> = vec![(root, 0)];

            while let Some(frame) = stack.last_mut() {
                let (atom, cursor) = *frame;
                if cursor >= neighbors[atom].len() {
                    stack.pop();
                    continue;
                }
                frame.1 += 1;
                let next = neighbors[atom][cursor];

                if parent[atom] == Some(next) {
                    continue;
                }
                if !visited[next] {
                    visited[next] = true;
                    parent[next] = Some(atom);
                    children[atom].push(next);
                    stack.push((next, 0));
                } else {
                    let key = (atom.min(next), atom.max(next));
                    if closure_set.insert(key) {
                        // `next` is an ancestor already emitted, so it opens the ring.
                        closures.push((next, atom));
                    }
                }
            }
        }

        Self {
            roots,
            children,
            closures,
        }
    }
}

struct Emitter<'a> {
    structure: &'a Structure,
    tree: &'a SpanningForest,
    out: String,
    /// Ring digit slots; `Some((opener, closer))` while a ring is open.
    open_rings: Vec<Option<(usize, usize)>>,
}

impl Emitter<'_> {
    fn emit_from(&mut self, root: usize) {
        enum Step {
            Atom(usize, Option<usize>),
            Open,
            Close,
        }

        let mut work = vec![Step::Atom(root, None)];
        while let Some(step) = work.pop() {
            match step {
                Step::Open => self.out.push('('),
                Step::Close => self.out.push(')'),
                Step::Atom(atom, from) => {
                    if let Some(from) = from {
                        let symbol = self.bond_symbol(from, atom);
                        self.out.push_str(&symbol);
                    }
                    self.out.push_str(&atom_token(self.structure, atom));
                    self.emit_ring_marks(atom);

                    let children = &self.tree.children[atom];
                    if let Some((&last, branches)) = children.split_last() {
                        work.push(Step::Atom(last, Some(atom)));
                        for &child in branches.iter().rev() {
                            work.push(Step::Close);
                            work.push(Step::Atom(child, Some(atom)));
                            work.push(Step::Open);
                        }
                    }
                }
            }
        }
    }

    fn emit_ring_marks(&mut self, atom: usize) {
        for slot in 0..self.open_rings.len() {
            if let Some((_, closer)) = self.open_rings[slot] {
                if closer == atom {
                    self.out.push_str(&ring_label(slot + 1));
                    self.open_rings[slot] = None;
                }
            }
        }

        let openings: Vec<(usize, usize)> = self
            .tree
            .closures
            .iter()
            .filter(|(opener, _)| *opener == atom)
            .copied()
            .collect();
        for (opener, closer) in openings {
            let slot = match self.open_rings.iter().position(Option::is_none) {
                Some(free) => free,
                None => {
                    self.open_rings.push(None);
                    self.open_rings.len() - 1
                }
            };
            self.open_rings[slot] = Some((opener, closer));
            let symbol = self.bond_symbol(opener, closer);
            self.out.push_str(&symbol);
            self.out.push_str(&ring_label(slot + 1));
        }
    }

    fn bond_symbol(&self, a: usize, b: usize) -> String {
        let Some(bond) = self.structure.bond_between(a, b) else {
            return String::new();
        };
        let aromatic_pair = self.structure.atom(a).is_some_and(|x| x.aromatic)
            && self.structure.atom(b).is_some_and(|x| x.aromatic);
        match (bond.order, aromatic_pair) {
            (BondOrder::Single, false) | (BondOrder::Aromatic, true) => String::new(),
            (order, _) => order.symbol().to_string(),
        }
    }
}

fn ring_label(number: usize) -> String {
    if number < 10 {
        number.to_string()
    } else {
        format!("%{:02}", number)
    }
}

fn atom_token(structure: &Structure, idx: usize) -> String {
    let Some(atom) = structure.atom(idx) else {
        return String::new();
    };

    let organic_aromatic = matches!(
        atom.element,
        Element::B | Element::C | Element::N | Element::O | Element::P | Element::S
    );
    let hydrogens_match_default = match atom.hydrogens {
        None => true,
        Some(h) => structure.default_hydrogens(idx) == Some(h),
    };
    let plain = !atom.has_bracket_properties()
        && hydrogens_match_default
        && (!atom.aromatic || organic_aromatic);

    if atom.element == Element::Unknown
        && atom.charge == 0
        && atom.isotope.is_none()
        && atom.class.is_none()
        && structure.hydrogen_count(idx) == 0
    {
        return "*".to_string();
    }

    let symbol = if atom.aromatic {
        atom.element.symbol().to_ascii_lowercase()
    } else {
        atom.element.symbol().to_string()
    };

    if plain {
        return symbol;
    }

    let mut token = String::from("[");
    if let Some(isotope) = atom.isotope {
        token.push_str(&isotope.to_string());
    }
    token.push_str(&symbol);
    token.push_str(atom.chirality.symbol());
    match structure.hydrogen_count(idx) {
        0 => {}
        1 => token.push('H'),
        h => token.push_str(&format!("H{}", h)),
    }
    match atom.charge {
        0 => {}
        1 => token.push('+'),
        -1 => token.push('-'),
        c if c > 0 => token.push_str(&format!("+{}", c)),
        c => token.push_str(&format!("-{}", -i16::from(c))),
    }
    if let Some(class) = atom.class {
        token.push_str(&format!(":{}", class));
    }
    token.push(']');
    token
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::smiles::reader::parse;
    use crate::model::atom::Atom;

    fn rewrite(text: &str) -> String {
        write(&parse(text).unwrap())
    }

    #[test]
    fn writes_chain_with_branch() {
        assert_eq!(rewrite("CC(=O)O"), "CC(=O)O");
        assert_eq!(rewrite("CC"), "CC");
    }

    #[test]
    fn writes_salts_with_brackets_and_dots() {
        assert_eq!(rewrite("CC(=O)[O-].[Na+]"), "CC(=O)[O-].[Na+]");
    }

    #[test]
    fn writes_aromatic_rings() {
        assert_eq!(rewrite("c1ccccc1"), "c1ccccc1");
        assert_eq!(rewrite("c1ccc2ccccc2c1"), "c1ccc2ccccc2c1");
        assert_eq!(rewrite("c1cc[nH]c1"), "c1cc[nH]c1");
    }

    #[test]
    fn writes_explicit_bonds_only_where_needed() {
        assert_eq!(rewrite("C=CC#N"), "C=CC#N");
        assert_eq!(rewrite("c1ccccc1-c1ccccc1"), "c1ccccc1-c1ccccc1");
    }

    #[test]
    fn drops_redundant_brackets() {
        assert_eq!(rewrite("[CH3][OH]"), "CO");
        assert_eq!(rewrite("[CH2]O"), "[CH2]O");
    }

    #[test]
    fn keeps_bracket_details() {
        assert_eq!(rewrite("[13CH3:7]N"), "[13CH3:7]N");
        assert_eq!(rewrite("[NH4+]"), "[NH4+]");
        assert_eq!(rewrite("[O-2]"), "[O-2]");
        assert_eq!(rewrite("N[C@@H](C)C(=O)O"), "N[C@@H](C)C(=O)O");
    }

    #[test]
    fn written_output_is_a_fixed_point() {
        for input in ["C1CC1C(=O)[O-]", "OC1CCCCC1N", "C1CC2CC1CC2", "c1ccccc1-c1ccccc1"] {
            let once = rewrite(input);
            assert_eq!(rewrite(&once), once, "not a fixed point for {input}");
        }
    }

    #[test]
    fn writes_wildcard_and_programmatic_atoms() {
        let mut s = Structure::new();
        let a = s.add_atom(Atom::new(Element::Unknown));
        let b = s.add_atom(Atom::new(Element::Zn));
        s.add_bond(a, b, BondOrder::Single);

        assert_eq!(write(&s), "*[Zn]");
    }
}
