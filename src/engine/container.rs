//! Result containers.
//!
//! A [`Transformed`] value always has as many outer positions as the engine's input had
//! items, in input order, with collection labels carried through unchanged. Failed items
//! stay in place as absent slots so positional alignment with the input is never lost.

use super::error::Error;
use super::rank::Shape;
use crate::model::collection::Collection;
use crate::model::slot::Slot;
use crate::model::structure::Structure;
use crate::ops::{Output, OutputKind};
use ndarray::{Array1, Array2, Array3, Axis};
use smol_str::SmolStr;

/// Rank-0 result: a structure or a number.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Structure(Structure),
    Scalar(f64),
}

impl Value {
    pub fn as_structure(&self) -> Option<&Structure> {
        match self {
            Value::Structure(s) => Some(s),
            Value::Scalar(_) => None,
        }
    }

    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            Value::Scalar(v) => Some(*v),
            Value::Structure(_) => None,
        }
    }
}

/// Labelled rank-0 results, one per collection item.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    labels: Vec<SmolStr>,
    values: Vec<Slot<Value>>,
}

impl Series {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn labels(&self) -> &[SmolStr] {
        &self.labels
    }

    pub fn values(&self) -> &[Slot<Value>] {
        &self.values
    }

    pub fn get(&self, label: &str) -> Option<&Slot<Value>> {
        let idx = self.labels.iter().position(|l| l == label)?;
        self.values.get(idx)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&SmolStr, &Slot<Value>)> {
        self.labels.iter().zip(&self.values)
    }

    pub fn absent_count(&self) -> usize {
        self.values.iter().filter(|v| v.is_absent()).count()
    }

    /// Dense numeric view with absent items replaced by `fill`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] when the series holds structures.
    pub fn to_array(&self, fill: f64) -> Result<Array1<f64>, Error> {
        self.values
            .iter()
            .map(|slot| match slot {
                Slot::Filled(Value::Scalar(v)) => Ok(*v),
                Slot::Filled(Value::Structure(_)) => {
                    Err(Error::invalid_input("series holds structures, not numbers"))
                }
                Slot::Absent(_) => Ok(fill),
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Array1::from)
    }
}

/// Labelled rows of fixed-length vectors with named columns.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    labels: Vec<SmolStr>,
    columns: Vec<String>,
    rows: Vec<Slot<Array1<f64>>>,
}

impl Frame {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Number of columns; every filled row has exactly this length.
    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn labels(&self) -> &[SmolStr] {
        &self.labels
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Slot<Array1<f64>>] {
        &self.rows
    }

    pub fn get(&self, label: &str) -> Option<&Slot<Array1<f64>>> {
        let idx = self.labels.iter().position(|l| l == label)?;
        self.rows.get(idx)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&SmolStr, &Slot<Array1<f64>>)> {
        self.labels.iter().zip(&self.rows)
    }

    pub fn absent_count(&self) -> usize {
        self.rows.iter().filter(|r| r.is_absent()).count()
    }

    /// Dense `items x width` array with absent rows filled with `fill`.
    pub fn to_array(&self, fill: f64) -> Array2<f64> {
        let mut array = Array2::from_elem((self.len(), self.width()), fill);
        for (mut target, row) in array.axis_iter_mut(Axis(0)).zip(&self.rows) {
            if let Slot::Filled(values) = row {
                target.assign(values);
            }
        }
        array
    }
}

/// Labelled stack of fixed-shape matrices.
#[derive(Debug, Clone, PartialEq)]
pub struct Panel {
    labels: Vec<SmolStr>,
    dims: (usize, usize),
    tables: Vec<Slot<Array2<f64>>>,
}

impl Panel {
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// `(rows, cols)` of every filled table.
    pub fn dims(&self) -> (usize, usize) {
        self.dims
    }

    pub fn labels(&self) -> &[SmolStr] {
        &self.labels
    }

    pub fn tables(&self) -> &[Slot<Array2<f64>>] {
        &self.tables
    }

    pub fn get(&self, label: &str) -> Option<&Slot<Array2<f64>>> {
        let idx = self.labels.iter().position(|l| l == label)?;
        self.tables.get(idx)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&SmolStr, &Slot<Array2<f64>>)> {
        self.labels.iter().zip(&self.tables)
    }

    pub fn absent_count(&self) -> usize {
        self.tables.iter().filter(|t| t.is_absent()).count()
    }

    /// Dense `items x rows x cols` array with absent tables filled with `fill`.
    pub fn to_array(&self, fill: f64) -> Array3<f64> {
        let (rows, cols) = self.dims;
        let mut array = Array3::from_elem((self.len(), rows, cols), fill);
        for (mut target, table) in array.axis_iter_mut(Axis(0)).zip(&self.tables) {
            if let Slot::Filled(values) = table {
                target.assign(values);
            }
        }
        array
    }
}

/// Output of one engine run, shaped by the unit rank and the input cardinality.
#[derive(Debug, Clone, PartialEq)]
pub enum Transformed {
    Value(Slot<Value>),
    Vector(Slot<Array1<f64>>),
    Table(Slot<Array2<f64>>),
    Series(Series),
    Frame(Frame),
    Panel(Panel),
}

impl Transformed {
    pub fn shape(&self) -> Shape {
        match self {
            Transformed::Value(_) => Shape::Value,
            Transformed::Vector(_) => Shape::Vector,
            Transformed::Table(_) => Shape::Table,
            Transformed::Series(_) => Shape::Series,
            Transformed::Frame(_) => Shape::Frame,
            Transformed::Panel(_) => Shape::Panel,
        }
    }

    /// Number of axes of the container.
    pub fn rank(&self) -> usize {
        self.shape().ndim()
    }

    /// Outer size: 1 for a single input, the item count for a collection.
    pub fn len(&self) -> usize {
        match self {
            Transformed::Value(_) | Transformed::Vector(_) | Transformed::Table(_) => 1,
            Transformed::Series(s) => s.len(),
            Transformed::Frame(f) => f.len(),
            Transformed::Panel(p) => p.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Item labels; empty for single inputs.
    pub fn labels(&self) -> &[SmolStr] {
        match self {
            Transformed::Series(s) => s.labels(),
            Transformed::Frame(f) => f.labels(),
            Transformed::Panel(p) => p.labels(),
            _ => &[],
        }
    }

    pub fn absent_count(&self) -> usize {
        match self {
            Transformed::Value(v) => usize::from(v.is_absent()),
            Transformed::Vector(v) => usize::from(v.is_absent()),
            Transformed::Table(t) => usize::from(t.is_absent()),
            Transformed::Series(s) => s.absent_count(),
            Transformed::Frame(f) => f.absent_count(),
            Transformed::Panel(p) => p.absent_count(),
        }
    }

    pub fn as_value(&self) -> Option<&Slot<Value>> {
        match self {
            Transformed::Value(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_vector(&self) -> Option<&Slot<Array1<f64>>> {
        match self {
            Transformed::Vector(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_table(&self) -> Option<&Slot<Array2<f64>>> {
        match self {
            Transformed::Table(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_series(&self) -> Option<&Series> {
        match self {
            Transformed::Series(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_frame(&self) -> Option<&Frame> {
        match self {
            Transformed::Frame(f) => Some(f),
            _ => None,
        }
    }

    pub fn as_panel(&self) -> Option<&Panel> {
        match self {
            Transformed::Panel(p) => Some(p),
            _ => None,
        }
    }

    /// Extracts the structure of a single structure-valued result.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] for any other container.
    pub fn into_structure(self) -> Result<Slot<Structure>, Error> {
        match self {
            Transformed::Value(Slot::Filled(Value::Structure(s))) => Ok(Slot::Filled(s)),
            Transformed::Value(Slot::Absent(a)) => Ok(Slot::Absent(a)),
            other => Err(Error::invalid_input(format!(
                "a {} cannot be converted to a structure",
                other.shape()
            ))),
        }
    }

    /// Turns a structure series back into a collection so another unit can consume it.
    ///
    /// Absent items stay absent under their original labels.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] for numeric containers and single results.
    pub fn into_collection(self) -> Result<Collection, Error> {
        let Transformed::Series(series) = self else {
            return Err(Error::invalid_input(format!(
                "a {} cannot be converted to a collection",
                self.shape()
            )));
        };

        let mut collection = Collection::new();
        for (label, slot) in series.labels.into_iter().zip(series.values) {
            let structure = match slot {
                Slot::Filled(Value::Structure(s)) => Slot::Filled(s),
                Slot::Filled(Value::Scalar(_)) => {
                    return Err(Error::invalid_input(
                        "a numeric series cannot be converted to a collection",
                    ));
                }
                Slot::Absent(a) => Slot::Absent(a),
            };
            collection.push_slot(label, structure);
        }
        Ok(collection)
    }
}

/// Builds the container for `shape` from per-item outputs in input order.
///
/// Every filled output must match `kind`; a mismatch is a contract violation.
pub(crate) fn assemble(
    unit: &str,
    shape: Shape,
    kind: &OutputKind,
    columns: Vec<String>,
    labels: Vec<SmolStr>,
    slots: Vec<Slot<Output>>,
) -> Result<Transformed, Error> {
    let violation = |output: &Output| Error::contract_violation(unit, kind.to_string(), output.describe());

    let mut converted = Vec::with_capacity(slots.len());
    for slot in slots {
        match slot {
            Slot::Filled(output) if !output.conforms_to(kind) => return Err(violation(&output)),
            other => converted.push(other),
        }
    }

    let single = |mut items: Vec<Slot<Output>>| {
        items
            .pop()
            .filter(|_| items.is_empty())
            .ok_or_else(|| Error::contract_violation(unit, "one result", "a different count"))
    };

    let transformed = match shape {
        Shape::Value => Transformed::Value(single(converted)?.map(into_value)),
        Shape::Vector => Transformed::Vector(single(converted)?.map(into_vector)),
        Shape::Table => Transformed::Table(single(converted)?.map(into_matrix)),
        Shape::Series => Transformed::Series(Series {
            labels,
            values: converted.into_iter().map(|s| s.map(into_value)).collect(),
        }),
        Shape::Frame => {
            let columns = match kind {
                OutputKind::Vector { len } if columns.len() != *len => {
                    (0..*len).map(|i| i.to_string()).collect()
                }
                _ => columns,
            };
            Transformed::Frame(Frame {
                labels,
                columns,
                rows: converted.into_iter().map(|s| s.map(into_vector)).collect(),
            })
        }
        Shape::Panel => {
            let dims = match kind {
                OutputKind::Matrix { rows, cols } => (*rows, *cols),
                _ => (0, 0),
            };
            Transformed::Panel(Panel {
                labels,
                dims,
                tables: converted.into_iter().map(|s| s.map(into_matrix)).collect(),
            })
        }
    };
    Ok(transformed)
}

// Shapes were checked against the declared kind, so the fallbacks below are unreachable.

fn into_value(output: Output) -> Value {
    match output {
        Output::Structure(s) => Value::Structure(s),
        Output::Scalar(v) => Value::Scalar(v),
        Output::Vector(_) | Output::Matrix(_) => Value::Scalar(f64::NAN),
    }
}

fn into_vector(output: Output) -> Array1<f64> {
    match output {
        Output::Vector(v) => v,
        _ => Array1::zeros(0),
    }
}

fn into_matrix(output: Output) -> Array2<f64> {
    match output {
        Output::Matrix(m) => m,
        _ => Array2::zeros((0, 0)),
    }
}
