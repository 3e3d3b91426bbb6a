pub mod reader;
pub mod writer;

use super::{Error, Notation};
use crate::model::structure::Structure;

/// SMILES line notation backed by the built-in reader and writer.
#[derive(Debug, Clone, Copy, Default)]
pub struct Smiles;

impl Notation for Smiles {
    fn name(&self) -> &'static str {
        "SMILES"
    }

    fn parse(&self, text: &str) -> Result<Structure, Error> {
        reader::parse(text)
    }

    fn write(&self, structure: &Structure) -> String {
        writer::write(structure)
    }
}
