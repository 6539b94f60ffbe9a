use indexmap::map::Entry;
use indexmap::IndexMap;
use oxigraph::model::NamedNode;

use crate::ontology::OwlObjectKind;
use crate::repo::Metadata;

/// One sanitized object waiting to be written
#[derive(Debug, Clone, PartialEq)]
pub struct BatchEntry {
    pub id: NamedNode,
    pub kind: OwlObjectKind,
    pub metadata: Metadata,
}

/// Objects staged for a bulk import, keyed by identifier in insertion
/// order. The first entry for an identifier wins.
#[derive(Debug, Clone, Default)]
pub struct ImportBatch {
    entries: IndexMap<String, BatchEntry>,
}

impl ImportBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage an entry; returns false and drops it when its identifier is
    /// already staged
    pub fn push(&mut self, entry: BatchEntry) -> bool {
        match self.entries.entry(entry.id.as_str().to_string()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(entry);
                true
            }
        }
    }

    pub fn get(&self, id: &str) -> Option<&BatchEntry> {
        self.entries.get(id)
    }

    pub fn entries(&self) -> impl Iterator<Item = &BatchEntry> {
        self.entries.values()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
