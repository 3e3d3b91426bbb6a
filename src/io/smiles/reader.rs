use crate::io::error::Error;
use crate::model::{
    atom::Atom,
    structure::Structure,
    types::{BondOrder, Chirality, Element},
};
use std::collections::BTreeMap;

const FORMAT: &str = "SMILES";
const MAX_CHARGE: u32 = 15;

/// Parses a SMILES string into a [`Structure`].
///
/// Directional bond marks (`/`, `\`) are read as plain single bonds.
///
/// # Errors
///
/// Returns [`Error::Parse`] with the offending character position for empty input,
/// unknown atoms, unbalanced branches, dangling bonds, or unclosed rings.
pub fn parse(text: &str) -> Result<Structure, Error> {
    Parser::new(text).run()
}

struct RingOpening {
    atom: usize,
    order: Option<BondOrder>,
    position: usize,
}

struct Parser<'a> {
    text: &'a str,
    chars: Vec<char>,
    pos: usize,
    structure: Structure,
    prev: Option<usize>,
    branches: Vec<usize>,
    pending_bond: Option<BondOrder>,
    rings: BTreeMap<u16, RingOpening>,
}

impl<'a> Parser<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            text,
            chars: text.chars().collect(),
            pos: 0,
            structure: Structure::new(),
            prev: None,
            branches: Vec::new(),
            pending_bond: None,
            rings: BTreeMap::new(),
        }
    }

    fn error(&self, position: usize, details: impl Into<String>) -> Error {
        Error::parse(FORMAT, self.text, position, details)
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn run(mut self) -> Result<Structure, Error> {
        if self.chars.is_empty() {
            return Err(self.error(0, "empty input"));
        }

        while let Some(c) = self.peek() {
            match c {
                '(' => {
                    let Some(prev) = self.prev else {
                        return Err(self.error(self.pos, "branch opened before any atom"));
                    };
                    if self.pending_bond.is_some() {
                        return Err(self.error(self.pos, "bond symbol before branch"));
                    }
                    self.branches.push(prev);
                    self.pos += 1;
                }
                ')' => {
                    if self.pending_bond.is_some() {
                        return Err(self.error(self.pos, "dangling bond at end of branch"));
                    }
                    let Some(anchor) = self.branches.pop() else {
                        return Err(self.error(self.pos, "unbalanced ')'"));
                    };
                    self.prev = Some(anchor);
                    self.pos += 1;
                }
                '.' => {
                    if self.pending_bond.is_some() {
                        return Err(self.error(self.pos, "bond symbol before '.'"));
                    }
                    if !self.branches.is_empty() {
                        return Err(self.error(self.pos, "'.' inside a branch"));
                    }
                    self.prev = None;
                    self.pos += 1;
                }
                '-' | '=' | '#' | ':' | '/' | '\\' => {
                    if self.pending_bond.is_some() {
                        return Err(self.error(self.pos, "consecutive bond symbols"));
                    }
                    self.pending_bond = Some(match c {
                        '=' => BondOrder::Double,
                        '#' => BondOrder::Triple,
                        ':' => BondOrder::Aromatic,
                        _ => BondOrder::Single,
                    });
                    self.pos += 1;
                }
                '0'..='9' | '%' => self.ring_closure()?,
                '[' => {
                    let atom = self.bracket_atom()?;
                    self.attach(atom)?;
                }
                _ => {
                    let atom = self.organic_atom()?;
                    self.attach(atom)?;
                }
            }
        }

        if self.pending_bond.is_some() {
            return Err(self.error(self.pos, "dangling bond at end of input"));
        }
        if !self.branches.is_empty() {
            return Err(self.error(self.pos, "unclosed branch"));
        }
        if let Some((number, opening)) = self.rings.iter().next() {
            return Err(self.error(opening.position, format!("unclosed ring {}", number)));
        }

        Ok(self.structure)
    }

    fn implicit_order(&self, a: usize, b: usize) -> BondOrder {
        let aromatic = |idx: usize| self.structure.atom(idx).is_some_and(|atom| atom.aromatic);
        if aromatic(a) && aromatic(b) {
            BondOrder::Aromatic
        } else {
            BondOrder::Single
        }
    }

    fn attach(&mut self, atom: Atom) -> Result<(), Error> {
        let idx = self.structure.add_atom(atom);
        match self.prev {
            Some(prev) => {
                let order = self
                    .pending_bond
                    .take()
                    .unwrap_or_else(|| self.implicit_order(prev, idx));
                self.structure.add_bond(prev, idx, order);
            }
            None if self.pending_bond.is_some() => {
                return Err(self.error(self.pos, "bond symbol without a preceding atom"));
            }
            None => {}
        }
        self.prev = Some(idx);
        Ok(())
    }

    fn ring_closure(&mut self) -> Result<(), Error> {
        let start = self.pos;
        let number = if self.peek() == Some('%') {
            let digits: String = [self.peek_at(1), self.peek_at(2)]
                .into_iter()
                .flatten()
                .take_while(|c| c.is_ascii_digit())
                .collect();
            if digits.len() != 2 {
                return Err(self.error(start, "'%' must be followed by two digits"));
            }
            self.pos += 3;
            digits
                .parse::<u16>()
                .map_err(|_| self.error(start, "invalid ring number"))?
        } else {
            let digit = self.peek().and_then(|c| c.to_digit(10)).unwrap_or(0) as u16;
            self.pos += 1;
            digit
        };

        let Some(current) = self.prev else {
            return Err(self.error(start, "ring closure before any atom"));
        };
        let pending = self.pending_bond.take();

        match self.rings.remove(&number) {
            Some(opening) => {
                if opening.atom == current {
                    return Err(self.error(start, "ring closure onto the same atom"));
                }
                if self.structure.bond_between(opening.atom, current).is_some() {
                    return Err(self.error(start, "ring closure duplicates an existing bond"));
                }
                let order = match (opening.order, pending) {
                    (Some(a), Some(b)) if a != b => {
                        return Err(self.error(start, "conflicting ring closure bond orders"));
                    }
                    (Some(a), _) | (None, Some(a)) => a,
                    (None, None) => self.implicit_order(opening.atom, current),
                };
                self.structure.add_bond(opening.atom, current, order);
            }
            None => {
                self.rings.insert(
                    number,
                    RingOpening {
                        atom: current,
                        order: pending,
                        position: start,
                    },
                );
            }
        }
        Ok(())
    }

    fn organic_atom(&mut self) -> Result<Atom, Error> {
        let start = self.pos;
        let c = self.peek().unwrap_or(' ');
        let (element, aromatic, width) = match (c, self.peek_at(1)) {
            ('C', Some('l')) => (Element::Cl, false, 2),
            ('B', Some('r')) => (Element::Br, false, 2),
            ('B', _) => (Element::B, false, 1),
            ('C', _) => (Element::C, false, 1),
            ('N', _) => (Element::N, false, 1),
            ('O', _) => (Element::O, false, 1),
            ('P', _) => (Element::P, false, 1),
            ('S', _) => (Element::S, false, 1),
            ('F', _) => (Element::F, false, 1),
            ('I', _) => (Element::I, false, 1),
            ('*', _) => (Element::Unknown, false, 1),
            ('b', _) => (Element::B, true, 1),
            ('c', _) => (Element::C, true, 1),
            ('n', _) => (Element::N, true, 1),
            ('o', _) => (Element::O, true, 1),
            ('p', _) => (Element::P, true, 1),
            ('s', _) => (Element::S, true, 1),
            _ => return Err(self.error(start, format!("unexpected character '{}'", c))),
        };
        self.pos += width;

        let mut atom = Atom::new(element);
        atom.aromatic = aromatic;
        if element == Element::Unknown {
            atom.hydrogens = Some(0);
        }
        Ok(atom)
    }

    fn read_number(&mut self) -> Option<u32> {
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.pos += 1;
        }
        if self.pos == start {
            return None;
        }
        self.chars[start..self.pos]
            .iter()
            .collect::<String>()
            .parse()
            .ok()
            .or(Some(u32::MAX))
    }

    fn bracket_atom(&mut self) -> Result<Atom, Error> {
        let open = self.pos;
        self.pos += 1;

        let isotope = self.read_number();

        let (element, aromatic) = self.bracket_symbol()?;
        let mut atom = Atom::new(element);
        atom.aromatic = aromatic;
        atom.isotope = isotope
            .map(u16::try_from)
            .transpose()
            .map_err(|_| self.error(open + 1, "isotope out of range"))?;

        if self.peek() == Some('@') {
            self.pos += 1;
            if self.peek() == Some('@') {
                self.pos += 1;
                atom.chirality = Chirality::Clockwise;
            } else {
                atom.chirality = Chirality::CounterClockwise;
            }
        }

        let mut hydrogens = 0u8;
        if self.peek() == Some('H') {
            self.pos += 1;
            hydrogens = match self.peek().and_then(|c| c.to_digit(10)) {
                Some(digit) => {
                    self.pos += 1;
                    digit as u8
                }
                None => 1,
            };
            if self.peek().is_some_and(|c| c.is_ascii_digit()) {
                return Err(self.error(self.pos, "hydrogen count takes a single digit"));
            }
        }
        atom.hydrogens = Some(hydrogens);

        atom.charge = self.bracket_charge()?;

        if self.peek() == Some(':') {
            self.pos += 1;
            let Some(class) = self.read_number() else {
                return Err(self.error(self.pos, "atom class requires digits"));
            };
            atom.class = Some(
                u16::try_from(class).map_err(|_| self.error(self.pos, "atom class out of range"))?,
            );
        }

        if self.peek() != Some(']') {
            return Err(self.error(open, "unterminated bracket atom"));
        }
        self.pos += 1;
        Ok(atom)
    }

    fn bracket_symbol(&mut self) -> Result<(Element, bool), Error> {
        let start = self.pos;
        let Some(first) = self.peek() else {
            return Err(self.error(start, "missing element symbol"));
        };

        if first == '*' {
            self.pos += 1;
            return Ok((Element::Unknown, false));
        }

        if first.is_ascii_lowercase() {
            if first == 's' && self.peek_at(1) == Some('e') {
                self.pos += 2;
                return Ok((Element::Se, true));
            }
            let upper = first.to_ascii_uppercase().to_string();
            return match Element::from_symbol(&upper) {
                Some(element) if element.can_be_aromatic() => {
                    self.pos += 1;
                    Ok((element, true))
                }
                _ => Err(self.error(start, format!("'{}' cannot be aromatic", first))),
            };
        }

        if let Some(second) = self.peek_at(1).filter(|c| c.is_ascii_lowercase()) {
            let candidate: String = [first, second].iter().collect();
            if let Some(element) = Element::from_symbol(&candidate) {
                self.pos += 2;
                return Ok((element, false));
            }
        }

        match Element::from_symbol(&first.to_string()) {
            Some(element) => {
                self.pos += 1;
                Ok((element, false))
            }
            None => Err(self.error(start, format!("unknown element '{}'", first))),
        }
    }

    /// Charges are bounded to `-15..=15`.
    fn bracket_charge(&mut self) -> Result<i8, Error> {
        let start = self.pos;
        let sign = match self.peek() {
            Some('+') => 1i8,
            Some('-') => -1i8,
            _ => return Ok(0),
        };
        let symbol = self.peek();
        self.pos += 1;

        let magnitude = match self.read_number() {
            Some(n) => n,
            None => {
                let mut repeated = 1u32;
                while self.peek() == symbol {
                    self.pos += 1;
                    repeated += 1;
                    if repeated > MAX_CHARGE {
                        break;
                    }
                }
                repeated
            }
        };
        if magnitude > MAX_CHARGE {
            return Err(self.error(
                start,
                format!("charge magnitude exceeds {}", MAX_CHARGE),
            ));
        }
        Ok(sign * magnitude as i8)
    }
}
