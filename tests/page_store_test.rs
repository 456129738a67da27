//! Integration tests for the page store: paging, eviction and resurrection

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use strata::common::{PageId, StorageConfig, StrataError};
use strata::storage::disk::{DiskManager, DiskScheduler};
use strata::storage::PageStore;
use strata::tuple::Entry;
use tempfile::TempDir;

const PK: usize = 0;

fn create_store(budget: usize, cap: usize) -> (PageStore, Arc<DiskManager>, TempDir) {
    let dir = TempDir::new().unwrap();
    let dm = Arc::new(DiskManager::new(dir.path()).unwrap());
    let scheduler = Arc::new(DiskScheduler::new(Arc::clone(&dm)));
    let config = StorageConfig::new(dir.path())
        .with_page_byte_budget(budget)
        .with_max_resident_pages(cap);
    (PageStore::new("db", "t", &config, scheduler), dm, dir)
}

/// A row whose display form `d, abcdefg` is exactly 10 bytes.
fn row(id: i32) -> Vec<Entry> {
    assert!((0..10).contains(&id));
    vec![Entry::Int(id), Entry::from("abcdefg")]
}

#[test]
fn test_page_store_fills_pages_to_budget() {
    let (mut store, _dm, _dir) = create_store(30, 100);
    for id in 0..10 {
        store.insert_row(row(id), PK, false).unwrap();
    }
    // three rows per page
    assert_eq!(store.page_count(), 4);
    assert_eq!(store.resident_page_count(), 4);
    assert_eq!(store.len(), 10);
}

#[test]
fn test_page_store_cap_of_one() {
    let (mut store, dm, _dir) = create_store(30, 1);
    for id in 0..10 {
        store.insert_row(row(id), PK, false).unwrap();
    }
    assert_eq!(store.page_count(), 4);
    assert_eq!(store.resident_page_count(), 1);
    assert_eq!(dm.list_table_pages("db", "t").unwrap().len(), 3);

    // row 0 lives on the first page, evicted long ago
    let fetched = store.get_row(&Entry::Int(0), PK).unwrap();
    assert_eq!(fetched.entries(), row(0).as_slice());
    assert_eq!(store.resurrection_count(), 1);

    // its page mates come along
    store.get_row(&Entry::Int(2), PK).unwrap();
    assert_eq!(store.resurrection_count(), 1);
    assert_eq!(store.resident_page_count(), 1);
}

#[test]
fn test_page_store_random_access_survives_eviction() {
    let (mut store, _dm, _dir) = create_store(30, 2);
    let mut ids: Vec<i32> = (0..10).collect();
    let mut rng = StdRng::seed_from_u64(7);
    ids.shuffle(&mut rng);
    for id in &ids {
        store.insert_row(row(*id), PK, false).unwrap();
    }

    ids.shuffle(&mut rng);
    for id in &ids {
        let fetched = store.get_row(&Entry::Int(*id), PK).unwrap();
        assert_eq!(fetched.entries(), row(*id).as_slice());
        assert!(store.resident_page_count() <= 2);
    }
}

#[test]
fn test_page_store_duplicate_insert_changes_nothing() {
    let (mut store, _dm, _dir) = create_store(30, 1);
    for id in 0..5 {
        store.insert_row(row(id), PK, false).unwrap();
    }
    // page 1 holds 0..3 and is evicted, page 2 holds 3 and 4
    let open_page = PageId::new(2);
    assert!(!store.is_resident(PageId::new(1)));
    let pages = store.page_count();
    let size = store.page(open_page).unwrap().size();
    let entries = store.page(open_page).unwrap().entries().to_vec();
    assert_eq!(size, 20);

    for id in [1, 4] {
        assert!(matches!(
            store.insert_row(row(id), PK, false),
            Err(StrataError::DuplicateKey(_))
        ));
    }
    assert_eq!(store.page_count(), pages);
    assert_eq!(store.resident_page_count(), 1);
    assert_eq!(store.resurrection_count(), 0);
    assert_eq!(store.page(open_page).unwrap().size(), size);
    assert_eq!(store.page(open_page).unwrap().entries(), entries.as_slice());
    assert_eq!(store.resident_bytes(), size);
    assert_eq!(store.len(), 5);
    assert_eq!(store.keys().unwrap(), (0..5).map(Entry::Int).collect::<Vec<_>>());

    // the failed inserts left room for exactly one more row
    store.insert_row(row(5), PK, false).unwrap();
    assert_eq!(store.page_count(), pages);
    assert_eq!(store.page(open_page).unwrap().size(), 30);
}

#[test]
fn test_page_store_pinned_pages_stay_resident() {
    let (mut store, _dm, _dir) = create_store(30, 1);
    for id in 0..6 {
        store.insert_row(row(id), PK, true).unwrap();
    }
    // every page pinned, so the cap is exceeded
    assert_eq!(store.resident_page_count(), 2);
    assert_eq!(store.pinned_page_count(), 2);

    // one eviction per new page, so the overshoot shrinks back gradually
    store.unpin();
    store.insert_row(row(6), PK, false).unwrap();
    assert_eq!(store.pinned_page_count(), 0);
    assert_eq!(store.resident_page_count(), 2);
    assert!(store.get_row(&Entry::Int(0), PK).is_ok());
    assert_eq!(store.resident_page_count(), 2);
}
