// ConcurrentTable suite.
//
// Core invariants exercised:
// - Lock discipline: readers never observe a half-applied write section.
// - Scoped views: objects detached from a section fail with StaleView in any
//   later section.
// - Batched traversal under the read lock visits every pair once.
use slot_table::{ConcurrentTable, ScopedAccess, TableError};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

// Test: writers update two keys in one section; readers check they agree.
// Verifies: no reader sees a torn pair of values.
#[test]
fn readers_never_see_torn_writes() {
    let table = Arc::new(ConcurrentTable::<&'static str, u64>::new());
    table.insert("left", 0);
    table.insert("right", 0);

    let writers: Vec<_> = (0..4)
        .map(|_| {
            let t = Arc::clone(&table);
            thread::spawn(move || {
                for _ in 0..500 {
                    t.with_write_lock(|v| {
                        let next = v.get("left").unwrap().copied().unwrap_or(0) + 1;
                        v.insert("left", next).unwrap();
                        v.insert("right", next).unwrap();
                    });
                }
            })
        })
        .collect();
    let readers: Vec<_> = (0..4)
        .map(|_| {
            let t = Arc::clone(&table);
            thread::spawn(move || {
                for _ in 0..500 {
                    t.with_read_lock(|v| {
                        let l = v.get("left").unwrap().copied();
                        let r = v.get("right").unwrap().copied();
                        assert_eq!(l, r, "torn read");
                    });
                }
            })
        })
        .collect();
    for h in writers.into_iter().chain(readers) {
        h.join().expect("thread panicked");
    }
    assert_eq!(table.get_cloned("left"), Some(2000));
}

// Test: a scoped entry smuggled out of its section.
// Verifies: StaleView for reads and writes in later sections.
#[test]
fn detached_entry_is_stale_after_section() {
    let table: ConcurrentTable<String, u32> = ConcurrentTable::new();
    table.insert("k".to_string(), 1);
    let entry = table.with_read_lock(|v| v.scoped_entry("k").unwrap().unwrap());
    assert!(!entry.is_live());
    table.with_read_lock(|v| {
        assert!(matches!(entry.value(&*v), Err(TableError::StaleView)));
    });
    table.with_write_lock(|v| {
        assert!(matches!(entry.set_value(v, 5), Err(TableError::StaleView)));
    });
    assert_eq!(table.get_cloned("k"), Some(1));
}

// Test: generic section logic over ScopedAccess.
#[test]
fn scoped_access_is_generic() {
    fn bump<A: ScopedAccess<u32, u32>>(view: &mut A, key: u32) -> Result<(), TableError> {
        let cur = view.get(&key)?.copied().unwrap_or(0);
        view.insert(key, cur + 1)?;
        Ok(())
    }
    let table: ConcurrentTable<u32, u32> = ConcurrentTable::new();
    table.with_write_lock(|v| bump(v, 7)).unwrap();
    table.with_write_lock(|v| bump(v, 7)).unwrap();
    let err = table.with_read_lock(|v| bump(v, 7));
    assert!(matches!(err, Err(TableError::UnsupportedMutation)));
    assert_eq!(table.get_cloned(&7), Some(2));
    assert!(table.with_read_lock(|v| v.contains_key(&7)).unwrap());
}

// Test: parallel traversal through the guard.
#[test]
fn par_for_each_under_read_lock() {
    let table: ConcurrentTable<u32, u32> = ConcurrentTable::new();
    for k in 0..2_000 {
        table.insert(k, 1);
    }
    let hits = AtomicUsize::new(0);
    table.par_for_each(|_, v| {
        hits.fetch_add(*v as usize, Ordering::Relaxed);
    });
    assert_eq!(hits.load(Ordering::Relaxed), 2_000);
    assert_eq!(table.len(), 2_000);
}

// Test: write-section cursor and key set.
#[test]
fn write_section_cursor_and_key_set() {
    let table: ConcurrentTable<u32, u32> = ConcurrentTable::new();
    for k in 0..20 {
        table.insert(k, k);
    }
    table.with_write_lock(|v| {
        let mut c = v.cursor().unwrap();
        while let Ok((k, _)) = c.next() {
            if k % 2 == 1 {
                c.remove().unwrap();
            }
        }
        drop(c);
        let mut keys = v.key_set().unwrap();
        keys.retain(|k| *k < 10).unwrap();
    });
    let inner = table.into_inner();
    let mut keys: Vec<u32> = inner.keys().copied().collect();
    keys.sort_unstable();
    assert_eq!(keys, vec![0, 2, 4, 6, 8]);
}
