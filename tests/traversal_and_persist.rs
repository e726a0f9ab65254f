// Traversal, batching and persistence suite.
//
// Core invariants exercised:
// - Batch completeness: for any section count, the sections together visit
//   every pair exactly once, chained pairs included.
// - Traversal tiers: contiguous, indexed and cursor sources give the same
//   results for the same elements.
// - Persisted form: decoding rebuilds an equal table and rejects a body whose
//   pair count disagrees with the header.
use slot_table::persist::{read_from, write_to};
use slot_table::traversal::{self, Strategy, Traversable, DIRECT_THRESHOLD};
use slot_table::{section_bounds, SlotTable, TableConfig, TableError};
use std::collections::{BTreeSet, LinkedList, VecDeque};

fn lcg(mut s: u64) -> impl FnMut() -> u64 {
    move || {
        s = s.wrapping_mul(6364136223846793005).wrapping_add(1);
        s
    }
}

// Test: every section count from 1 to the cell count.
// Verifies: the union of sections equals the table, with no duplicates.
#[test]
fn sections_partition_the_table() {
    let mut next = lcg(11);
    let mut t: SlotTable<u64, u64> = SlotTable::new();
    for _ in 0..300 {
        let k = next() % 1_000;
        t.insert(k, k);
    }
    let cells = t.slot_array_len();
    for count in [1, 2, 3, 7, 16, 63, cells / 2, cells - 1, cells] {
        let mut seen = Vec::new();
        for i in 0..count {
            t.batch_for_each(i, count, |k, _| seen.push(*k)).unwrap();
        }
        assert_eq!(seen.len(), t.len(), "count {count}");
        let unique: BTreeSet<u64> = seen.into_iter().collect();
        assert_eq!(unique.len(), t.len(), "count {count}");
    }
}

// Test: section bounds for the documented example of ten cells in three parts.
#[test]
fn section_bounds_example() {
    let parts: Vec<_> = (0..3).map(|i| section_bounds(10, i, 3).unwrap()).collect();
    assert_eq!(parts, vec![0..4, 4..6, 6..10]);
    assert!(matches!(
        section_bounds(10, 3, 3),
        Err(TableError::InvalidArgument { .. })
    ));
}

// Test: batch_count derives from the cell array, never below one.
#[test]
fn batch_count_tracks_capacity() {
    let t: SlotTable<u32, u32> =
        SlotTable::with_config(TableConfig::new().initial_capacity(64)).unwrap();
    assert_eq!(t.slot_array_len(), 128);
    assert_eq!(t.batch_count(32), 4);
    assert_eq!(t.batch_count(1_000), 1);
    assert_eq!(t.batch_count(0), 128);
}

// Test: the three tiers over the same elements.
// Assumes: contiguous vectors above DIRECT_THRESHOLD report the direct tier.
// Verifies: every operation agrees across tiers.
#[test]
fn tiers_agree() {
    let n = DIRECT_THRESHOLD as u32 + 20;
    let v: Vec<u32> = (0..n).collect();
    // Split across the ring buffer's wrap point so no single slice covers it.
    let mut dq = VecDeque::with_capacity(n as usize);
    for x in n / 2..n {
        dq.push_back(x);
    }
    for x in (0..n / 2).rev() {
        dq.push_front(x);
    }
    let ll: LinkedList<u32> = v.iter().copied().collect();
    assert!(matches!(v.strategy(), Strategy::Contiguous(_)));
    assert!(matches!(dq.strategy(), Strategy::Indexed(_)));
    assert!(matches!(ll.strategy(), Strategy::Cursor(_)));

    let even = |x: &u32| x % 2 == 0;
    let expect = traversal::count(&v, even);
    assert_eq!(traversal::count(&dq, even), expect);
    assert_eq!(traversal::count(&ll, even), expect);
    assert_eq!(
        traversal::select(&dq, even),
        traversal::select(&ll, even)
    );
    assert_eq!(traversal::reject(&v, even).len(), n as usize - expect);
    assert_eq!(traversal::detect(&ll, |x: &u32| *x > 50), Some(&51));
    assert!(traversal::all_satisfy(&dq, |x: &u32| *x < n));
    assert!(!traversal::any_satisfy(&v, |x: &u32| *x >= n));
    let sum = traversal::inject_into(0u64, &ll, |acc, x: &u32| acc + *x as u64);
    assert_eq!(sum, (0..n as u64).sum::<u64>());
    let doubled = traversal::collect(&dq, |x: &u32| x * 2);
    assert_eq!(doubled, traversal::collect(&v, |x: &u32| x * 2));

    let mut indices = Vec::new();
    traversal::for_each_with_index(&ll, |_: &u32, i| indices.push(i));
    assert_eq!(indices, (0..n as usize).collect::<Vec<_>>());
}

// Test: a table's key set is a traversal source.
#[test]
fn key_set_is_traversable() {
    let t: SlotTable<u32, ()> = (0..40).map(|k| (k, ())).collect();
    let keys = t.key_set();
    assert_eq!(traversal::count(&keys, |k: &u32| *k < 10), 10);
    let mut total = 0u32;
    traversal::for_each(&keys, |k: &u32| total += k);
    assert_eq!(total, (0..40).sum::<u32>());
}

// Test: bincode round trip through the reader/writer helpers.
#[test]
fn persisted_table_round_trips() {
    let mut next = lcg(3);
    let mut t: SlotTable<String, u64> =
        SlotTable::with_config(TableConfig::new().load_factor(0.5)).unwrap();
    for _ in 0..200 {
        let n = next();
        t.insert(format!("k{:016x}", n), n);
    }
    let mut buf = Vec::new();
    write_to(&mut buf, &t).unwrap();
    let back: SlotTable<String, u64> = read_from(buf.as_slice()).unwrap();
    assert_eq!(back, t);
    assert_eq!(back.load_factor(), 0.5);
}

// Test: JSON form with a short body.
// Verifies: decoding fails and names both counts.
#[test]
fn short_body_is_rejected() {
    let err = serde_json::from_str::<SlotTable<String, u32>>(r#"[2,0.75,["a",1]]"#).unwrap_err();
    assert!(err.to_string().contains("declared 2 pairs, found 1"));
    let empty: SlotTable<String, u32> = serde_json::from_str("[0,0.75]").unwrap();
    assert!(empty.is_empty());
}
