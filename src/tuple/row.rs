use std::fmt;

use crate::common::PageId;

use super::Entry;

/// One table row: its entries in schema order and the page that holds it.
///
/// Rows compare by their entries only.
#[derive(Debug, Clone)]
pub struct Row {
    entries: Vec<Entry>,
    position: PageId,
}

impl Row {
    /// Creates a row not yet placed on any page.
    pub fn new(entries: Vec<Entry>) -> Self {
        Self {
            entries,
            position: PageId::new(0),
        }
    }

    pub fn with_position(entries: Vec<Entry>, position: PageId) -> Self {
        Self { entries, position }
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn entries_mut(&mut self) -> &mut Vec<Entry> {
        &mut self.entries
    }

    pub fn into_entries(self) -> Vec<Entry> {
        self.entries
    }

    /// Returns the entry at `index`.
    pub fn entry(&self, index: usize) -> Option<&Entry> {
        self.entries.get(index)
    }

    /// Returns the id of the page holding (or last holding) this row.
    pub fn position(&self) -> PageId {
        self.position
    }

    pub fn set_position(&mut self, position: PageId) {
        self.position = position;
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of bytes this row is charged against a page budget: the length
    /// of its display form.
    pub fn byte_size(&self) -> usize {
        self.to_string().len()
    }
}

impl PartialEq for Row {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

impl Eq for Row {}

impl fmt::Display for Row {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, entry) in self.entries.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", entry)?;
        }
        Ok(())
    }
}
