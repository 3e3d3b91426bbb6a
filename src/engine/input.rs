//! Engine inputs and cardinality detection.

use super::error::Error;
use super::rank::Cardinality;
use crate::io::{self, Notation};
use crate::model::collection::Collection;
use crate::model::slot::Slot;
use crate::model::structure::Structure;

/// Borrowed engine input. Structures are borrowed mutably because units may attach
/// conformers to them.
#[derive(Debug)]
pub enum Input<'a> {
    Single(&'a mut Structure),
    /// A single position that may already be absent, e.g. the result of an earlier unit.
    Item(&'a mut Slot<Structure>),
    Collection(&'a mut Collection),
}

impl Input<'_> {
    pub fn cardinality(&self) -> Cardinality {
        match self {
            Input::Single(_) | Input::Item(_) => Cardinality::Single,
            Input::Collection(_) => Cardinality::Collection,
        }
    }

    /// Number of items the result will have.
    pub fn len(&self) -> usize {
        match self {
            Input::Single(_) | Input::Item(_) => 1,
            Input::Collection(c) => c.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<'a> From<&'a mut Structure> for Input<'a> {
    fn from(structure: &'a mut Structure) -> Self {
        Input::Single(structure)
    }
}

impl<'a> From<&'a mut Slot<Structure>> for Input<'a> {
    fn from(slot: &'a mut Slot<Structure>) -> Self {
        Input::Item(slot)
    }
}

impl<'a> From<&'a mut Collection> for Input<'a> {
    fn from(collection: &'a mut Collection) -> Self {
        Input::Collection(collection)
    }
}

/// Owned input built from text.
#[derive(Debug, Clone, PartialEq)]
pub enum OwnedInput {
    Single(Slot<Structure>),
    Collection(Collection),
}

impl OwnedInput {
    /// Decides cardinality from text: one unlabelled record is a single structure, anything
    /// else is a collection. A record that fails to parse is an absent item, not an error.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] when the text holds no records or a record has more
    /// than two fields.
    pub fn parse(text: &str, notation: &dyn Notation) -> Result<Self, Error> {
        let records =
            io::read_records(text.as_bytes()).map_err(|e| Error::invalid_input(e.to_string()))?;

        match records.as_slice() {
            [] => Err(Error::invalid_input("no structures found in input")),
            [record] if record.label.is_none() => {
                Ok(OwnedInput::Single(notation.parse(&record.notation).into()))
            }
            _ => Ok(OwnedInput::Collection(io::build_collection(&records, notation))),
        }
    }

    pub fn cardinality(&self) -> Cardinality {
        match self {
            OwnedInput::Single(_) => Cardinality::Single,
            OwnedInput::Collection(_) => Cardinality::Collection,
        }
    }

    pub fn as_input(&mut self) -> Input<'_> {
        match self {
            OwnedInput::Single(slot) => Input::Item(slot),
            OwnedInput::Collection(collection) => Input::Collection(collection),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::Smiles;

    #[test]
    fn one_unlabelled_record_is_single() {
        let input = OwnedInput::parse("CCO\n", &Smiles).unwrap();

        assert_eq!(input.cardinality(), Cardinality::Single);
    }

    #[test]
    fn labelled_or_multiple_records_form_a_collection() {
        let labelled = OwnedInput::parse("CCO ethanol\n", &Smiles).unwrap();
        let multiple = OwnedInput::parse("CC\nCCO\n", &Smiles).unwrap();

        assert_eq!(labelled.cardinality(), Cardinality::Collection);
        match multiple {
            OwnedInput::Collection(c) => assert_eq!(c.len(), 2),
            other => panic!("expected a collection, got {:?}", other),
        }
    }

    #[test]
    fn empty_or_malformed_text_is_invalid_input() {
        assert!(matches!(
            OwnedInput::parse("  \n# nothing\n", &Smiles),
            Err(Error::InvalidInput { .. })
        ));
        assert!(matches!(
            OwnedInput::parse("CC a b\n", &Smiles),
            Err(Error::InvalidInput { .. })
        ));
    }

    #[test]
    fn unparseable_single_record_is_absent() {
        let mut input = OwnedInput::parse("C(C\n", &Smiles).unwrap();

        match input.as_input() {
            Input::Item(slot) => assert!(slot.is_absent()),
            other => panic!("expected an item, got {:?}", other),
        }
    }
}
