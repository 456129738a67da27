use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::buffer::LruReplacer;
use crate::common::{PageId, Result, StorageConfig, StrataError};
use crate::index::OrderedIndex;
use crate::storage::disk::{codec, DiskManager, DiskScheduler};
use crate::storage::page::TablePage;
use crate::tuple::{Entry, Row};

/// Index value: either the row itself or the page it was evicted with.
#[derive(Debug, Clone)]
pub enum Slot {
    Resident(Row),
    Evicted(PageId),
}

/// Page cache backing one table.
///
/// Rows live in a primary-key index; pages group them into byte-budgeted
/// units that are written to disk and dropped from memory when more than
/// `max_resident_pages` are resident. A row whose page was evicted is held
/// in the index as `Slot::Evicted` until its page is read back.
pub struct PageStore {
    database: String,
    table: String,
    page_byte_budget: usize,
    max_resident_pages: usize,
    /// Resident pages
    pages: HashMap<PageId, TablePage>,
    /// Most recently allocated page, the one inserts go to
    last_page_id: PageId,
    /// None once the table has been dropped
    index: Option<OrderedIndex<Entry, Slot>>,
    replacer: LruReplacer,
    disk_scheduler: Arc<DiskScheduler>,
    resurrections: u64,
}

impl PageStore {
    /// Creates an empty store for `database.table`.
    pub fn new(
        database: &str,
        table: &str,
        config: &StorageConfig,
        disk_scheduler: Arc<DiskScheduler>,
    ) -> Self {
        Self {
            database: database.to_string(),
            table: table.to_string(),
            page_byte_budget: config.page_byte_budget(),
            max_resident_pages: config.max_resident_pages(),
            pages: HashMap::new(),
            last_page_id: PageId::new(0),
            index: Some(OrderedIndex::new()),
            replacer: LruReplacer::new(),
            disk_scheduler,
            resurrections: 0,
        }
    }

    fn dropped(&self) -> StrataError {
        StrataError::TableDropped(self.table.clone())
    }

    fn index(&self) -> Result<&OrderedIndex<Entry, Slot>> {
        self.index.as_ref().ok_or_else(|| self.dropped())
    }

    /// Bulk-loads a page read back from disk during recovery.
    ///
    /// The page gets the next page id. If the resident cap is already
    /// reached, its rows are indexed as evicted and nothing is cached.
    /// Returns whether the page is resident.
    pub fn insert_page(&mut self, rows: Vec<Row>, primary_index: usize) -> Result<bool> {
        let index = self
            .index
            .as_ref()
            .ok_or_else(|| StrataError::TableDropped(self.table.clone()))?;

        let mut seen = BTreeSet::new();
        for row in &rows {
            let key = primary_key(row, primary_index)?;
            if index.contains(key) || !seen.insert(key) {
                return Err(StrataError::DuplicateKey(key.to_string()));
            }
        }

        let page_id = self.last_page_id.next();
        let resident = self.pages.len() < self.max_resident_pages;
        let mut page = TablePage::new(&self.database, &self.table, page_id);

        let index = self
            .index
            .as_mut()
            .ok_or_else(|| StrataError::TableDropped(self.table.clone()))?;
        for mut row in rows {
            row.set_position(page_id);
            let key = primary_key(&row, primary_index)?.clone();
            if resident {
                page.insert_entry(key.clone(), row.byte_size());
                index.put(key, Slot::Resident(row))?;
            } else {
                index.put(key, Slot::Evicted(page_id))?;
            }
        }

        self.last_page_id = page_id;
        if resident {
            self.pages.insert(page_id, page);
            self.touch(page_id, false);
        }
        debug!(table = %self.table, page = page_id.as_u32(), resident, "loaded page");
        Ok(resident)
    }

    /// Inserts a new row. The row goes to the open page, or to a fresh page
    /// if the open one is evicted or would overflow its byte budget.
    pub fn insert_row(
        &mut self,
        entries: Vec<Entry>,
        primary_index: usize,
        transactional: bool,
    ) -> Result<()> {
        let mut row = Row::new(entries);
        let key = primary_key(&row, primary_index)?.clone();
        if self.index()?.contains(&key) {
            return Err(StrataError::DuplicateKey(key.to_string()));
        }

        let len = row.byte_size();
        let fits = self
            .pages
            .get(&self.last_page_id)
            .map_or(false, |page| page.fits(len, self.page_byte_budget));
        let page_id = if fits {
            self.last_page_id
        } else {
            self.add_page()?
        };

        row.set_position(page_id);
        let index = self
            .index
            .as_mut()
            .ok_or_else(|| StrataError::TableDropped(self.table.clone()))?;
        index.put(key.clone(), Slot::Resident(row))?;

        let page = self
            .pages
            .get_mut(&page_id)
            .ok_or(StrataError::PageNotFound(page_id))?;
        page.insert_entry(key, len);
        page.set_dirty(true);
        self.touch(page_id, transactional);
        Ok(())
    }

    /// Deletes the row stored under `key`.
    pub fn delete_row(&mut self, key: &Entry, primary_index: usize, transactional: bool) -> Result<()> {
        let page_id = self.resolve(key, primary_index)?;

        let index = self
            .index
            .as_mut()
            .ok_or_else(|| StrataError::TableDropped(self.table.clone()))?;
        let len = match index.remove(key)? {
            Slot::Resident(row) => row.byte_size(),
            Slot::Evicted(_) => 0,
        };

        let page = self
            .pages
            .get_mut(&page_id)
            .ok_or(StrataError::PageNotFound(page_id))?;
        page.remove_entry(key, len);
        page.set_dirty(true);
        self.touch(page_id, transactional);
        Ok(())
    }

    /// Overwrites columns `targets` of the row under `key` with `values`.
    ///
    /// A new primary key is checked against the index before anything
    /// changes; on success the row moves to the new key.
    pub fn update_row(
        &mut self,
        key: &Entry,
        primary_index: usize,
        targets: &[usize],
        values: &[Entry],
        transactional: bool,
    ) -> Result<()> {
        if targets.len() != values.len() {
            return Err(StrataError::LengthNotMatch {
                expected: targets.len(),
                actual: values.len(),
            });
        }

        let page_id = self.resolve(key, primary_index)?;
        let index = self
            .index
            .as_mut()
            .ok_or_else(|| StrataError::TableDropped(self.table.clone()))?;

        let mut new_key = None;
        for (&column, value) in targets.iter().zip(values) {
            if column == primary_index && value != key {
                if index.contains(value) {
                    return Err(StrataError::DuplicateKey(value.to_string()));
                }
                new_key = Some(value.clone());
            }
        }

        let Slot::Resident(row) = index.get_mut(key)? else {
            return Err(StrataError::CorruptPage(format!(
                "row {} missing from page {}",
                key, page_id
            )));
        };
        if let Some(&column) = targets.iter().find(|&&column| column >= row.len()) {
            return Err(StrataError::SchemaNotMatch(format!(
                "row has {} columns, no column {}",
                row.len(),
                column
            )));
        }

        let old_len = row.byte_size();
        for (&column, value) in targets.iter().zip(values) {
            row.entries_mut()[column] = value.clone();
        }
        let new_len = row.byte_size();

        let page = self
            .pages
            .get_mut(&page_id)
            .ok_or(StrataError::PageNotFound(page_id))?;
        match new_key {
            Some(new_key) => {
                let slot = index.remove(key)?;
                index.put(new_key.clone(), slot)?;
                page.rename_entry(key, new_key, old_len, new_len);
            }
            None => page.resize(old_len, new_len),
        }
        page.set_dirty(true);
        self.touch(page_id, transactional);
        Ok(())
    }

    /// Returns a copy of the row stored under `key`, reading its page back
    /// from disk if it was evicted.
    pub fn get_row(&mut self, key: &Entry, primary_index: usize) -> Result<Row> {
        let page_id = self.resolve(key, primary_index)?;
        let row = match self.index()?.get(key)? {
            Slot::Resident(row) => row.clone(),
            Slot::Evicted(_) => {
                return Err(StrataError::CorruptPage(format!(
                    "row {} missing from page {}",
                    key, page_id
                )))
            }
        };
        self.touch(page_id, false);
        Ok(row)
    }

    /// Writes every resident page to disk, dirty or not.
    /// Returns the number of pages written.
    pub fn persist(&mut self) -> Result<usize> {
        let index = self.index()?;
        let mut page_ids: Vec<PageId> = self.pages.keys().copied().collect();
        page_ids.sort();

        for page_id in &page_ids {
            let page = &self.pages[page_id];
            let data = codec::encode_rows(resident_rows(index, page))?;
            self.disk_scheduler
                .schedule_write_sync(page.file_name(), data)?;
        }

        for page in self.pages.values_mut() {
            page.set_dirty(false);
        }
        info!(table = %self.table, pages = page_ids.len(), "persisted table");
        Ok(page_ids.len())
    }

    /// Clears the pin of every resident page.
    pub fn unpin(&mut self) {
        for page in self.pages.values_mut() {
            if page.is_pinned() {
                page.set_pinned(false);
                self.replacer.set_evictable(page.id(), true);
            }
        }
    }

    /// Releases all in-memory state. Later operations fail with
    /// `TableDropped`.
    pub fn drop_self(&mut self) {
        self.pages.clear();
        self.replacer.clear();
        self.index = None;
        debug!(table = %self.table, "dropped page store");
    }

    /// Returns the smallest key greater than `after` (or the first key).
    pub fn next_key(&self, after: Option<&Entry>) -> Result<Option<Entry>> {
        Ok(self.index()?.next_key(after).cloned())
    }

    /// Snapshot of all primary keys in ascending order.
    pub fn keys(&self) -> Result<Vec<Entry>> {
        Ok(self.index()?.keys().cloned().collect())
    }

    /// Number of pages allocated so far, resident or not.
    pub fn page_count(&self) -> u32 {
        self.last_page_id.as_u32()
    }

    pub fn resident_page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn pinned_page_count(&self) -> usize {
        self.pages.values().filter(|page| page.is_pinned()).count()
    }

    pub fn is_resident(&self, page_id: PageId) -> bool {
        self.pages.contains_key(&page_id)
    }

    /// Returns a resident page.
    pub fn page(&self, page_id: PageId) -> Option<&TablePage> {
        self.pages.get(&page_id)
    }

    /// Summed byte size of the resident pages.
    pub fn resident_bytes(&self) -> usize {
        self.pages.values().map(TablePage::size).sum()
    }

    /// Number of times an evicted page has been read back.
    pub fn resurrection_count(&self) -> u64 {
        self.resurrections
    }

    /// Number of rows, zero once dropped.
    pub fn len(&self) -> usize {
        self.index.as_ref().map_or(0, |index| index.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_dropped(&self) -> bool {
        self.index.is_none()
    }

    /// Returns the page currently holding `key`, resurrecting it if needed.
    fn resolve(&mut self, key: &Entry, primary_index: usize) -> Result<PageId> {
        let evicted = match self.index()?.get(key)? {
            Slot::Resident(row) => return Ok(row.position()),
            Slot::Evicted(page_id) => *page_id,
        };

        self.resurrect(evicted, primary_index)?;
        match self.index()?.get(key)? {
            Slot::Resident(row) => Ok(row.position()),
            Slot::Evicted(_) => Err(StrataError::CorruptPage(format!(
                "row {} missing from page file of {}",
                key, evicted
            ))),
        }
    }

    /// Allocates a fresh page, evicting first if the cache is full.
    fn add_page(&mut self) -> Result<PageId> {
        if self.pages.len() >= self.max_resident_pages {
            self.evict_page()?;
        }

        let page_id = self.last_page_id.next();
        self.last_page_id = page_id;
        self.pages
            .insert(page_id, TablePage::new(&self.database, &self.table, page_id));
        self.touch(page_id, false);
        debug!(table = %self.table, page = page_id.as_u32(), "opened page");
        Ok(page_id)
    }

    /// Evicts the least recently visited unpinned page.
    ///
    /// Returns false if every resident page is pinned or the page could not
    /// be written out; in both cases the page set is unchanged.
    fn evict_page(&mut self) -> Result<bool> {
        let Some(victim) = self.replacer.victim() else {
            debug!(
                table = %self.table,
                resident = self.pages.len(),
                "no unpinned page to evict"
            );
            return Ok(false);
        };
        let Some(page) = self.pages.get(&victim) else {
            self.replacer.remove(victim);
            return Ok(false);
        };

        if page.is_dirty() {
            let written = codec::encode_rows(resident_rows(self.index()?, page))
                .and_then(|data| self.disk_scheduler.schedule_write_sync(page.file_name(), data));
            if let Err(e) = written {
                warn!(
                    table = %self.table,
                    page = victim.as_u32(),
                    error = %e,
                    "failed to write page, keeping it resident"
                );
                return Ok(false);
            }
        }

        let index = self
            .index
            .as_mut()
            .ok_or_else(|| StrataError::TableDropped(self.table.clone()))?;
        for key in page.entries() {
            index.replace(key, Slot::Evicted(victim))?;
        }

        self.pages.remove(&victim);
        self.replacer.remove(victim);
        debug!(table = %self.table, page = victim.as_u32(), "evicted page");
        Ok(true)
    }

    /// Reads an evicted page back and reinstates its rows in the index.
    fn resurrect(&mut self, page_id: PageId, primary_index: usize) -> Result<()> {
        if self.pages.len() >= self.max_resident_pages {
            self.evict_page()?;
        }

        let file_name = DiskManager::page_file_name(&self.database, &self.table, page_id);
        let data = self.disk_scheduler.schedule_read_sync(&file_name)?;
        let rows = codec::decode_rows(&data)?;

        let mut page = TablePage::new(&self.database, &self.table, page_id);
        let index = self
            .index
            .as_mut()
            .ok_or_else(|| StrataError::TableDropped(self.table.clone()))?;
        for mut row in rows {
            row.set_position(page_id);
            let key = primary_key(&row, primary_index)?.clone();
            page.insert_entry(key.clone(), row.byte_size());
            index.replace(&key, Slot::Resident(row))?;
        }

        self.pages.insert(page_id, page);
        self.resurrections += 1;
        self.touch(page_id, false);
        debug!(table = %self.table, page = page_id.as_u32(), "resurrected page");
        Ok(())
    }

    /// Stamps a page as just visited, pinning it if requested.
    fn touch(&mut self, page_id: PageId, pin: bool) {
        let timestamp = self.replacer.record_access(page_id);
        if let Some(page) = self.pages.get_mut(&page_id) {
            page.set_last_visit(timestamp);
            if pin && !page.is_pinned() {
                page.set_pinned(true);
                self.replacer.set_evictable(page_id, false);
            }
        }
    }
}

fn primary_key(row: &Row, primary_index: usize) -> Result<&Entry> {
    row.entry(primary_index).ok_or_else(|| {
        StrataError::SchemaNotMatch(format!(
            "row has {} columns, primary key is column {}",
            row.len(),
            primary_index
        ))
    })
}

/// Rows of `page` in membership order.
fn resident_rows<'a>(
    index: &'a OrderedIndex<Entry, Slot>,
    page: &'a TablePage,
) -> impl Iterator<Item = &'a Row> + 'a {
    page.entries()
        .iter()
        .filter_map(move |key| match index.get(key) {
            Ok(Slot::Resident(row)) => Some(row),
            _ => None,
        })
}
