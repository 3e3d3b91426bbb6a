//! # ChemForge
//!
//! **ChemForge** runs one-to-one transforms over chemical structures and shapes the results
//! by what went in. The same transform accepts a single structure or a labelled collection:
//! a unit that returns a vector for one molecule yields a labelled table for a collection,
//! in input order, with failed items kept in place as explicit absences.
//!
//! ## Features
//!
//! - **Collection-aware execution** – [`engine::Engine`] promotes a unit's intrinsic rank by
//!   one axis for collections, preserves labels and order, isolates per-item failures, and
//!   spreads work over a configurable `rayon` worker pool with progress and cancellation.
//! - **Transform units** – Canonicalizers, geometry embedders, and feature extractors share one
//!   [`TransformUnit`](ops::TransformUnit) contract and a common [`UnitConfig`](ops::UnitConfig).
//! - **Pluggable collaborators** – Standardizers and conformer generators sit behind traits,
//!   with an in-process fragment/charge standardizer, an external-command standardizer, and a
//!   harmonic or Morse forcefield embedder built in.
//! - **Line-notation I/O** – A SMILES reader and writer plus labelled `.smi` collections, with
//!   unparseable records kept as absent entries.

mod model;
mod utils;

pub mod engine;
pub mod io;
pub mod ops;

pub use model::atom::Atom;
pub use model::bond::Bond;
pub use model::collection::{Collection, Entry};
pub use model::conformer::{Conformer, ConformerMismatch, format_point};
pub use model::slot::{Absence, Slot};
pub use model::structure::Structure;
pub use model::types::{BondOrder, Chirality, Element, Point};

pub use engine::{Engine, Transformed, transform};
