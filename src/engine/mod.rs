//! Execution engine: runs one transform unit over one structure or a whole collection.
//!
//! The engine inspects the input's cardinality and the unit's declared rank, picks the
//! result container with [`promote`], and then processes items in parallel while keeping
//! their order and labels. Per-item failures become absent slots; only collaborator
//! unavailability, invalid configuration, contract violations, and cancellation end a run.

mod container;
mod control;
mod error;
mod input;
mod progress;
mod rank;
mod runner;

pub use container::{Frame, Panel, Series, Transformed, Value};
pub use control::CancelToken;
pub use error::Error;
pub use input::{Input, OwnedInput};
pub use progress::{ProgressReport, ProgressSink, TracingProgress};
pub use rank::{Cardinality, Shape, promote};
pub use runner::{Engine, transform};
