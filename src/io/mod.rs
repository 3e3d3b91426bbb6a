//! Parsing and serialization collaborators.
//!
//! The engine never reads files itself; these readers turn line notations and labelled
//! listings into [`Structure`]s and [`Collection`](crate::Collection)s, and the writers turn
//! results back into text.

mod collection;
mod error;
mod smiles;

use crate::model::structure::Structure;

pub use collection::{
    Record, build_collection, read as read_collection, read_records, write as write_collection,
};
pub use error::Error;
pub use smiles::Smiles;

/// A textual chemical-structure notation that can be parsed and written back.
pub trait Notation: Send + Sync {
    /// Short display name of the notation.
    fn name(&self) -> &'static str;

    /// Parses one structure.
    fn parse(&self, text: &str) -> Result<Structure, Error>;

    /// Serializes one structure.
    fn write(&self, structure: &Structure) -> String;
}
