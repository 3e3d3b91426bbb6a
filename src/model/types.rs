use nalgebra::Point3;
use std::fmt;
use std::str::FromStr;

pub type Point = Point3<f64>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Element {
    H = 1,
    He = 2,
    Li = 3,
    Be = 4,
    B = 5,
    C = 6,
    N = 7,
    O = 8,
    F = 9,
    Ne = 10,
    Na = 11,
    Mg = 12,
    Al = 13,
    Si = 14,
    P = 15,
    S = 16,
    Cl = 17,
    Ar = 18,
    K = 19,
    Ca = 20,
    Fe = 26,
    Cu = 29,
    Zn = 30,
    Se = 34,
    Br = 35,
    I = 53,
    Unknown = 0,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BondOrder {
    Single,
    Double,
    Triple,
    Aromatic,
}

/// Tetrahedral parity mark carried through from the line notation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Chirality {
    #[default]
    None,
    CounterClockwise,
    Clockwise,
}

impl BondOrder {
    pub fn value(&self) -> f64 {
        match self {
            BondOrder::Single => 1.0,
            BondOrder::Double => 2.0,
            BondOrder::Triple => 3.0,
            BondOrder::Aromatic => 1.5,
        }
    }

    /// Line-notation symbol written between two atoms, if any.
    pub fn symbol(&self) -> &'static str {
        match self {
            BondOrder::Single => "-",
            BondOrder::Double => "=",
            BondOrder::Triple => "#",
            BondOrder::Aromatic => ":",
        }
    }
}

impl fmt::Display for BondOrder {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.value())
    }
}

impl FromStr for BondOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "1" | "1.0" | "-" | "Single" => Ok(BondOrder::Single),
            "2" | "2.0" | "=" | "Double" => Ok(BondOrder::Double),
            "3" | "3.0" | "#" | "Triple" => Ok(BondOrder::Triple),
            "1.5" | ":" | "Aromatic" => Ok(BondOrder::Aromatic),
            _ => Err(format!("Invalid bond order: {}", s)),
        }
    }
}

impl Chirality {
    pub fn symbol(&self) -> &'static str {
        match self {
            Chirality::None => "",
            Chirality::CounterClockwise => "@",
            Chirality::Clockwise => "@@",
        }
    }
}

impl Element {
    pub fn symbol(&self) -> &'static str {
        match self {
            Element::H => "H",
            Element::He => "He",
            Element::Li => "Li",
            Element::Be => "Be",
            Element::B => "B",
            Element::C => "C",
            Element::N => "N",
            Element::O => "O",
            Element::F => "F",
            Element::Ne => "Ne",
            Element::Na => "Na",
            Element::Mg => "Mg",
            Element::Al => "Al",
            Element::Si => "Si",
            Element::P => "P",
            Element::S => "S",
            Element::Cl => "Cl",
            Element::Ar => "Ar",
            Element::K => "K",
            Element::Ca => "Ca",
            Element::Fe => "Fe",
            Element::Cu => "Cu",
            Element::Zn => "Zn",
            Element::Se => "Se",
            Element::Br => "Br",
            Element::I => "I",
            Element::Unknown => "*",
        }
    }

    pub fn atomic_number(&self) -> u8 {
        *self as u8
    }

    pub fn is_heavy_atom(&self) -> bool {
        !matches!(self, Element::H)
    }

    pub fn atomic_mass(&self) -> f64 {
        match self {
            Element::H => 1.00794,
            Element::He => 4.002602,
            Element::Li => 6.941,
            Element::Be => 9.012182,
            Element::B => 10.811,
            Element::C => 12.0107,
            Element::N => 14.0067,
            Element::O => 15.9994,
            Element::F => 18.9984032,
            Element::Ne => 20.1797,
            Element::Na => 22.98976928,
            Element::Mg => 24.305,
            Element::Al => 26.9815386,
            Element::Si => 28.0855,
            Element::P => 30.973762,
            Element::S => 32.065,
            Element::Cl => 35.453,
            Element::Ar => 39.948,
            Element::K => 39.0983,
            Element::Ca => 40.078,
            Element::Fe => 55.845,
            Element::Cu => 63.546,
            Element::Zn => 65.38,
            Element::Se => 78.96,
            Element::Br => 79.904,
            Element::I => 126.90447,
            Element::Unknown => 0.0,
        }
    }

    /// Single-bond covalent radius in ångströms.
    pub fn covalent_radius(&self) -> f64 {
        match self {
            Element::H => 0.31,
            Element::He => 0.28,
            Element::Li => 1.28,
            Element::Be => 0.96,
            Element::B => 0.84,
            Element::C => 0.76,
            Element::N => 0.71,
            Element::O => 0.66,
            Element::F => 0.57,
            Element::Ne => 0.58,
            Element::Na => 1.66,
            Element::Mg => 1.41,
            Element::Al => 1.21,
            Element::Si => 1.11,
            Element::P => 1.07,
            Element::S => 1.05,
            Element::Cl => 1.02,
            Element::Ar => 1.06,
            Element::K => 2.03,
            Element::Ca => 1.76,
            Element::Fe => 1.32,
            Element::Cu => 1.32,
            Element::Zn => 1.22,
            Element::Se => 1.20,
            Element::Br => 1.20,
            Element::I => 1.39,
            Element::Unknown => 1.0,
        }
    }

    /// Allowed valences for atoms written without brackets, smallest first.
    pub fn default_valences(&self) -> &'static [u8] {
        match self {
            Element::B => &[3],
            Element::C => &[4],
            Element::N | Element::P => &[3, 5],
            Element::O => &[2],
            Element::S => &[2, 4, 6],
            Element::F | Element::Cl | Element::Br | Element::I => &[1],
            _ => &[],
        }
    }

    /// Whether the element may be written without brackets.
    pub fn is_organic_subset(&self) -> bool {
        !self.default_valences().is_empty()
    }

    /// Whether the element has a lowercase aromatic spelling.
    pub fn can_be_aromatic(&self) -> bool {
        matches!(
            self,
            Element::B | Element::C | Element::N | Element::O | Element::P | Element::S | Element::Se
        )
    }

    pub fn from_atomic_number(number: u8) -> Self {
        match number {
            1 => Element::H,
            2 => Element::He,
            3 => Element::Li,
            4 => Element::Be,
            5 => Element::B,
            6 => Element::C,
            7 => Element::N,
            8 => Element::O,
            9 => Element::F,
            10 => Element::Ne,
            11 => Element::Na,
            12 => Element::Mg,
            13 => Element::Al,
            14 => Element::Si,
            15 => Element::P,
            16 => Element::S,
            17 => Element::Cl,
            18 => Element::Ar,
            19 => Element::K,
            20 => Element::Ca,
            26 => Element::Fe,
            29 => Element::Cu,
            30 => Element::Zn,
            34 => Element::Se,
            35 => Element::Br,
            53 => Element::I,
            _ => Element::Unknown,
        }
    }

    /// Resolves a case-sensitive element symbol, returning `None` for unknown symbols.
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        let element = match symbol {
            "H" => Element::H,
            "He" => Element::He,
            "Li" => Element::Li,
            "Be" => Element::Be,
            "B" => Element::B,
            "C" => Element::C,
            "N" => Element::N,
            "O" => Element::O,
            "F" => Element::F,
            "Ne" => Element::Ne,
            "Na" => Element::Na,
            "Mg" => Element::Mg,
            "Al" => Element::Al,
            "Si" => Element::Si,
            "P" => Element::P,
            "S" => Element::S,
            "Cl" => Element::Cl,
            "Ar" => Element::Ar,
            "K" => Element::K,
            "Ca" => Element::Ca,
            "Fe" => Element::Fe,
            "Cu" => Element::Cu,
            "Zn" => Element::Zn,
            "Se" => Element::Se,
            "Br" => Element::Br,
            "I" => Element::I,
            "*" => Element::Unknown,
            _ => return None,
        };
        Some(element)
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

impl FromStr for Element {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(num) = s.parse::<u8>() {
            return Ok(Element::from_atomic_number(num));
        }
        Element::from_symbol(s).ok_or_else(|| format!("Unknown element symbol: {}", s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn element_symbol_returns_correct_value() {
        assert_eq!(Element::H.symbol(), "H");
        assert_eq!(Element::Cl.symbol(), "Cl");
        assert_eq!(Element::Na.symbol(), "Na");
        assert_eq!(Element::Unknown.symbol(), "*");
    }

    #[test]
    fn element_atomic_mass_returns_correct_value() {
        assert_eq!(Element::H.atomic_mass(), 1.00794);
        assert_eq!(Element::C.atomic_mass(), 12.0107);
        assert_eq!(Element::O.atomic_mass(), 15.9994);
        assert_eq!(Element::Unknown.atomic_mass(), 0.0);
    }

    #[test]
    fn element_from_str_parses_symbols_and_numbers() {
        assert_eq!(Element::from_str("Br").unwrap(), Element::Br);
        assert_eq!(Element::from_str("8").unwrap(), Element::O);
        assert_eq!(Element::from_str("119").unwrap(), Element::Unknown);
        assert!(Element::from_str("Zz").is_err());
        assert!(Element::from_str("cl").is_err());
    }

    #[test]
    fn organic_subset_matches_default_valences() {
        assert!(Element::C.is_organic_subset());
        assert!(Element::Br.is_organic_subset());
        assert!(!Element::Na.is_organic_subset());
        assert_eq!(Element::S.default_valences(), &[2, 4, 6]);
    }

    #[test]
    fn atomic_number_round_trips() {
        for element in [Element::H, Element::C, Element::Zn, Element::I] {
            assert_eq!(Element::from_atomic_number(element.atomic_number()), element);
        }
    }

    #[test]
    fn bond_order_value_returns_correct_f64() {
        assert_eq!(BondOrder::Single.value(), 1.0);
        assert_eq!(BondOrder::Double.value(), 2.0);
        assert_eq!(BondOrder::Triple.value(), 3.0);
        assert_eq!(BondOrder::Aromatic.value(), 1.5);
    }

    #[test]
    fn bond_order_from_str_parses_symbols() {
        assert_eq!(BondOrder::from_str("=").unwrap(), BondOrder::Double);
        assert_eq!(BondOrder::from_str("Triple").unwrap(), BondOrder::Triple);
        assert_eq!(BondOrder::from_str("1.5").unwrap(), BondOrder::Aromatic);
        assert!(BondOrder::from_str("4").is_err());
    }

    #[test]
    fn chirality_symbols_match_notation() {
        assert_eq!(Chirality::None.symbol(), "");
        assert_eq!(Chirality::CounterClockwise.symbol(), "@");
        assert_eq!(Chirality::Clockwise.symbol(), "@@");
    }
}
