//! Output shape promotion.
//!
//! A unit's intrinsic rank describes what it returns for one structure. Running it over a
//! collection adds exactly one leading item axis, so the container rank is the unit rank
//! plus one. Units never need to know which case they are in.

use crate::ops::Rank;
use std::fmt;

/// Whether the engine was handed one structure or many.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cardinality {
    Single,
    Collection,
}

/// Container shape for a unit rank and an input cardinality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Shape {
    /// One structure or scalar.
    Value,
    /// One vector.
    Vector,
    /// One matrix.
    Table,
    /// Labelled sequence of structures or scalars.
    Series,
    /// Labelled rows of equal-length vectors.
    Frame,
    /// Labelled stack of equal-shape matrices.
    Panel,
}

impl Shape {
    /// Number of axes of the container.
    pub fn ndim(&self) -> usize {
        match self {
            Shape::Value => 0,
            Shape::Vector | Shape::Series => 1,
            Shape::Table | Shape::Frame => 2,
            Shape::Panel => 3,
        }
    }

    pub fn cardinality(&self) -> Cardinality {
        match self {
            Shape::Value | Shape::Vector | Shape::Table => Cardinality::Single,
            Shape::Series | Shape::Frame | Shape::Panel => Cardinality::Collection,
        }
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Shape::Value => "value",
            Shape::Vector => "vector",
            Shape::Table => "table",
            Shape::Series => "series",
            Shape::Frame => "frame",
            Shape::Panel => "panel",
        };
        f.write_str(name)
    }
}

/// Chooses the container shape: `ndim == rank` for a single input, `rank + 1` otherwise.
pub fn promote(rank: Rank, cardinality: Cardinality) -> Shape {
    match (cardinality, rank) {
        (Cardinality::Single, Rank::Scalar) => Shape::Value,
        (Cardinality::Single, Rank::Vector) => Shape::Vector,
        (Cardinality::Single, Rank::Matrix) => Shape::Table,
        (Cardinality::Collection, Rank::Scalar) => Shape::Series,
        (Cardinality::Collection, Rank::Vector) => Shape::Frame,
        (Cardinality::Collection, Rank::Matrix) => Shape::Panel,
    }
}
