use std::collections::HashMap;

use crate::common::{PageId, Timestamp};

/// Tracks access recency for a single resident page
#[derive(Debug)]
struct PageAccessInfo {
    /// Logical time of the most recent access
    last_access: Timestamp,
    /// Whether this page may currently be evicted
    is_evictable: bool,
}

/// Pin-aware LRU replacement policy.
///
/// Each access stamps the page with the next value of a logical clock. The
/// victim is the evictable page with the smallest stamp; pinned pages are
/// never chosen. Pages are evictable from their first access until pinned.
#[derive(Debug, Default)]
pub struct LruReplacer {
    /// Current logical time (monotonically increasing)
    current_timestamp: Timestamp,
    /// Access information for each tracked page
    page_info: HashMap<PageId, PageAccessInfo>,
    /// Number of evictable pages
    num_evictable: usize,
}

impl LruReplacer {
    /// Creates an empty replacer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an access to `page_id` and returns its new timestamp.
    pub fn record_access(&mut self, page_id: PageId) -> Timestamp {
        self.current_timestamp += 1;
        let timestamp = self.current_timestamp;

        let num_evictable = &mut self.num_evictable;
        self.page_info
            .entry(page_id)
            .or_insert_with(|| {
                *num_evictable += 1;
                PageAccessInfo {
                    last_access: timestamp,
                    is_evictable: true,
                }
            })
            .last_access = timestamp;

        timestamp
    }

    /// Returns the least recently used evictable page without removing it.
    pub fn victim(&self) -> Option<PageId> {
        if self.num_evictable == 0 {
            return None;
        }

        self.page_info
            .iter()
            .filter(|(_, info)| info.is_evictable)
            .min_by_key(|(_, info)| info.last_access)
            .map(|(page_id, _)| *page_id)
    }

    /// Sets whether a page is evictable. Unknown pages are ignored.
    pub fn set_evictable(&mut self, page_id: PageId, is_evictable: bool) {
        if let Some(info) = self.page_info.get_mut(&page_id) {
            if info.is_evictable != is_evictable {
                if is_evictable {
                    self.num_evictable += 1;
                } else {
                    self.num_evictable -= 1;
                }
                info.is_evictable = is_evictable;
            }
        }
    }

    /// Stops tracking a page, e.g. after it has been evicted.
    pub fn remove(&mut self, page_id: PageId) {
        if let Some(info) = self.page_info.remove(&page_id) {
            if info.is_evictable {
                self.num_evictable -= 1;
            }
        }
    }

    /// Forgets every page. The clock keeps running.
    pub fn clear(&mut self) {
        self.page_info.clear();
        self.num_evictable = 0;
    }

    /// Returns the number of evictable pages.
    pub fn size(&self) -> usize {
        self.num_evictable
    }

    /// Returns the current logical time.
    pub fn now(&self) -> Timestamp {
        self.current_timestamp
    }
}
