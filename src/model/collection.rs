//! Ordered, labelled sequences of structures.
//!
//! A `Collection` is the batch input of the engine. Entry order and labels are the identity
//! of each item: labels may repeat, and a 1:1 transform never reorders, drops, or merges
//! entries. Items that could not be loaded are kept as absent slots so the length still
//! matches the source.

use super::slot::Slot;
use super::structure::Structure;
use smol_str::SmolStr;

/// One labelled position of a collection.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    pub label: SmolStr,
    pub structure: Slot<Structure>,
}

/// Ordered mapping from labels to structures.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Collection {
    entries: Vec<Entry>,
}

impl Collection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a structure under the given label.
    pub fn push(&mut self, label: impl Into<SmolStr>, structure: Structure) {
        self.push_slot(label, Slot::Filled(structure));
    }

    /// Appends a slot, which may already be absent (e.g. a record that failed to parse).
    pub fn push_slot(&mut self, label: impl Into<SmolStr>, structure: Slot<Structure>) {
        self.entries.push(Entry {
            label: label.into(),
            structure,
        });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn labels(&self) -> Vec<SmolStr> {
        self.entries.iter().map(|e| e.label.clone()).collect()
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub(crate) fn entries_mut(&mut self) -> &mut [Entry] {
        &mut self.entries
    }

    /// First structure stored under `label`, skipping absent entries.
    pub fn get(&self, label: &str) -> Option<&Structure> {
        self.entries
            .iter()
            .filter(|e| e.label == label)
            .find_map(|e| e.structure.value())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&SmolStr, &Slot<Structure>)> {
        self.entries.iter().map(|e| (&e.label, &e.structure))
    }

    /// Number of entries holding a structure.
    pub fn filled_count(&self) -> usize {
        self.entries.iter().filter(|e| e.structure.is_filled()).count()
    }
}

impl<L: Into<SmolStr>> FromIterator<(L, Structure)> for Collection {
    fn from_iter<T: IntoIterator<Item = (L, Structure)>>(iter: T) -> Self {
        let mut collection = Collection::new();
        for (label, structure) in iter {
            collection.push(label, structure);
        }
        collection
    }
}

impl<L: Into<SmolStr>> FromIterator<(L, Slot<Structure>)> for Collection {
    fn from_iter<T: IntoIterator<Item = (L, Slot<Structure>)>>(iter: T) -> Self {
        let mut collection = Collection::new();
        for (label, slot) in iter {
            collection.push_slot(label, slot);
        }
        collection
    }
}
