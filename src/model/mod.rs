pub mod atom;
pub mod bond;
pub mod collection;
pub mod conformer;
pub mod slot;
pub mod structure;
pub mod types;
