use crate::common::{PageId, Timestamp};
use crate::storage::disk::DiskManager;
use crate::tuple::Entry;

/// In-memory bookkeeping for one resident page of a table.
///
/// A page does not own rows; it records the primary keys of the rows it
/// holds (in insertion order) and charges each against a byte budget. The
/// rows themselves live in the table's index.
#[derive(Debug, Clone)]
pub struct TablePage {
    id: PageId,
    file_name: String,
    /// Accumulated row bytes
    size: usize,
    /// Primary keys of the rows on this page
    entries: Vec<Entry>,
    last_visit: Timestamp,
    dirty: bool,
    pinned: bool,
}

impl TablePage {
    /// Creates an empty, clean, unpinned page.
    pub fn new(database: &str, table: &str, id: PageId) -> Self {
        Self {
            id,
            file_name: DiskManager::page_file_name(database, table, id),
            size: 0,
            entries: Vec::new(),
            last_visit: 0,
            dirty: false,
            pinned: false,
        }
    }

    pub fn id(&self) -> PageId {
        self.id
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Returns the bytes charged against this page's budget.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Returns true if a row of `len` bytes still fits within `budget`.
    pub fn fits(&self, len: usize, budget: usize) -> bool {
        self.size + len <= budget
    }

    /// Primary keys held by this page, in insertion order.
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn contains(&self, key: &Entry) -> bool {
        self.entries.contains(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Registers a row of `len` bytes under `key`.
    pub fn insert_entry(&mut self, key: Entry, len: usize) {
        self.entries.push(key);
        self.size += len;
    }

    /// Unregisters `key`, releasing `len` bytes. Returns false if absent.
    pub fn remove_entry(&mut self, key: &Entry, len: usize) -> bool {
        match self.entries.iter().position(|e| e == key) {
            Some(pos) => {
                self.entries.remove(pos);
                self.size = self.size.saturating_sub(len);
                true
            }
            None => false,
        }
    }

    /// Replaces `old` with `new` in place and moves the byte accounting from
    /// `old_len` to `new_len`.
    pub fn rename_entry(&mut self, old: &Entry, new: Entry, old_len: usize, new_len: usize) {
        match self.entries.iter_mut().find(|e| *e == old) {
            Some(slot) => *slot = new,
            None => self.entries.push(new),
        }
        self.resize(old_len, new_len);
    }

    /// Adjusts accounting after a row changed size from `old_len` to `new_len`.
    pub fn resize(&mut self, old_len: usize, new_len: usize) {
        self.size = self.size.saturating_sub(old_len) + new_len;
    }

    pub fn last_visit(&self) -> Timestamp {
        self.last_visit
    }

    pub fn set_last_visit(&mut self, timestamp: Timestamp) {
        self.last_visit = timestamp;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn set_dirty(&mut self, dirty: bool) {
        self.dirty = dirty;
    }

    pub fn is_pinned(&self) -> bool {
        self.pinned
    }

    pub fn set_pinned(&mut self, pinned: bool) {
        self.pinned = pinned;
    }
}
