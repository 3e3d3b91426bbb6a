//! Explicit per-item outcome used wherever a transform may fail for one item only.

use std::fmt;

/// Reason a slot holds no value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Absence {
    pub reason: String,
}

impl Absence {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl fmt::Display for Absence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "absent: {}", self.reason)
    }
}

/// One position of a result: either a value or an explicit absence marker.
#[derive(Debug, Clone, PartialEq)]
pub enum Slot<T> {
    Filled(T),
    Absent(Absence),
}

impl<T> Slot<T> {
    pub fn absent(reason: impl Into<String>) -> Self {
        Slot::Absent(Absence::new(reason))
    }

    pub fn is_filled(&self) -> bool {
        matches!(self, Slot::Filled(_))
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Slot::Absent(_))
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            Slot::Filled(v) => Some(v),
            Slot::Absent(_) => None,
        }
    }

    pub fn value_mut(&mut self) -> Option<&mut T> {
        match self {
            Slot::Filled(v) => Some(v),
            Slot::Absent(_) => None,
        }
    }

    pub fn absence(&self) -> Option<&Absence> {
        match self {
            Slot::Filled(_) => None,
            Slot::Absent(a) => Some(a),
        }
    }

    pub fn into_value(self) -> Option<T> {
        match self {
            Slot::Filled(v) => Some(v),
            Slot::Absent(_) => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Slot<U> {
        match self {
            Slot::Filled(v) => Slot::Filled(f(v)),
            Slot::Absent(a) => Slot::Absent(a),
        }
    }

    pub fn as_ref(&self) -> Slot<&T> {
        match self {
            Slot::Filled(v) => Slot::Filled(v),
            Slot::Absent(a) => Slot::Absent(a.clone()),
        }
    }

    pub fn as_mut(&mut self) -> Slot<&mut T> {
        match self {
            Slot::Filled(v) => Slot::Filled(v),
            Slot::Absent(a) => Slot::Absent(a.clone()),
        }
    }
}

impl<T, E: fmt::Display> From<Result<T, E>> for Slot<T> {
    fn from(result: Result<T, E>) -> Self {
        match result {
            Ok(v) => Slot::Filled(v),
            Err(e) => Slot::absent(e.to_string()),
        }
    }
}
