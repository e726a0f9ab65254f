//! Section partitioning of the cell array for batched traversal.
//!
//! The logical cell array has `L = 2 * capacity` cells. `S` sections split it
//! into runs of `L / S` cells; the last section absorbs the remainder and any
//! odd boundary moves forward one cell so every section starts on a key cell.
//! A section owns the primary slots whose key cell it covers, together with
//! their chains.

use crate::error::{Result, TableError};
use crate::slot::Slot;
use crate::slot_table::SlotTable;
use core::ops::Range;
use rayon::prelude::*;

/// Cell range `[start, end)` of section `index` out of `count` over `cell_len`
/// cells. Both ends are even.
pub fn section_bounds(cell_len: usize, index: usize, count: usize) -> Result<Range<usize>> {
    if count == 0 {
        return Err(TableError::invalid_argument("section count must be positive"));
    }
    if index >= count {
        return Err(TableError::invalid_argument(format!(
            "section index {index} out of range for {count} sections"
        )));
    }
    Ok(section_range(cell_len, index, count))
}

/// `section_bounds` for arguments already known to be in range.
fn section_range(cell_len: usize, index: usize, count: usize) -> Range<usize> {
    let size = cell_len / count;
    let start = even_up(index * size).min(cell_len);
    let end = if index + 1 == count {
        cell_len
    } else {
        even_up((index + 1) * size).min(cell_len)
    };
    start..end
}

#[inline]
fn even_up(cell: usize) -> usize {
    cell + (cell & 1)
}

impl<K, V, S> SlotTable<K, V, S> {
    /// Number of sections for batches of roughly `target_batch_size` cells.
    /// A zero target is treated as one.
    pub fn batch_count(&self, target_batch_size: usize) -> usize {
        (self.slot_array_len() / target_batch_size.max(1)).max(1)
    }

    /// Visit every pair whose primary slot lies in section `section_index`
    /// of `section_count`, descending into chains.
    pub fn batch_for_each<F>(&self, section_index: usize, section_count: usize, mut f: F) -> Result<()>
    where
        F: FnMut(&K, &V),
    {
        let cells = section_bounds(self.slot_array_len(), section_index, section_count)?;
        self.visit_slots(cells.start / 2..cells.end / 2, &mut f);
        Ok(())
    }

    /// Drive every section on the rayon pool, one section per worker.
    pub fn par_for_each<F>(&self, f: F)
    where
        F: Fn(&K, &V) + Sync,
        K: Sync,
        V: Sync,
        S: Sync,
    {
        let sections = rayon::current_num_threads().max(1);
        let cell_len = self.slot_array_len();
        (0..sections).into_par_iter().for_each(|i| {
            let cells = section_range(cell_len, i, sections);
            self.visit_slots(cells.start / 2..cells.end / 2, &mut |k: &K, v: &V| f(k, v));
        });
    }

    fn visit_slots(&self, range: Range<usize>, f: &mut dyn FnMut(&K, &V)) {
        for slot in &self.slots[range] {
            match slot {
                Slot::Empty => {}
                Slot::Pair(b) => f(&b.key, &b.value),
                Slot::Chained(c) => {
                    for b in c.iter() {
                        f(&b.key, &b.value);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{ConstBuildHasher, IdentityBuildHasher};
    use crate::TableConfig;
    use std::collections::BTreeSet;

    #[test]
    fn bounds_start_on_key_cells() {
        // L = 16, S = 3: size 5, boundaries 5 and 10 become 6 and 10.
        assert_eq!(section_bounds(16, 0, 3).unwrap(), 0..6);
        assert_eq!(section_bounds(16, 1, 3).unwrap(), 6..10);
        assert_eq!(section_bounds(16, 2, 3).unwrap(), 10..16);
    }

    #[test]
    fn more_sections_than_cells_leaves_leading_sections_empty() {
        assert_eq!(section_bounds(4, 0, 8).unwrap(), 0..0);
        assert_eq!(section_bounds(4, 7, 8).unwrap(), 0..4);
    }

    #[test]
    fn bad_arguments_are_rejected() {
        assert!(matches!(
            section_bounds(16, 0, 0),
            Err(TableError::InvalidArgument { .. })
        ));
        assert!(matches!(
            section_bounds(16, 3, 3),
            Err(TableError::InvalidArgument { .. })
        ));
        let t: SlotTable<u32, u32> = SlotTable::new();
        assert!(t.batch_for_each(0, 0, |_, _| {}).is_err());
        assert!(t.batch_for_each(5, 2, |_, _| {}).is_err());
    }

    #[test]
    fn batch_count_has_a_floor_of_one() {
        let t: SlotTable<u32, u32> = SlotTable::with_capacity(8).unwrap();
        assert_eq!(t.slot_array_len(), 16);
        assert_eq!(t.batch_count(4), 4);
        assert_eq!(t.batch_count(100), 1);
        assert_eq!(t.batch_count(0), 16);
    }

    /// Invariant: the union of all sections equals one full traversal.
    #[test]
    fn sections_cover_every_pair_once() {
        let t: SlotTable<u32, u32> = (0..50).map(|k| (k, k)).collect();
        let cells = t.slot_array_len();
        for count in 1..=cells {
            let mut seen = Vec::new();
            for i in 0..count {
                t.batch_for_each(i, count, |k, _| seen.push(*k)).unwrap();
            }
            assert_eq!(seen.len(), 50, "S = {count}");
            let unique: BTreeSet<u32> = seen.into_iter().collect();
            assert_eq!(unique.len(), 50);
        }
    }

    fn sweep<K, V, S>(t: &SlotTable<K, V, S>) -> usize
    where
        K: Ord + Clone,
    {
        let cells = t.slot_array_len();
        for count in 1..=cells {
            let mut seen = Vec::new();
            for i in 0..count {
                t.batch_for_each(i, count, |k, _| seen.push(k.clone())).unwrap();
            }
            assert_eq!(seen.len(), t.len(), "S = {count}");
            let unique: BTreeSet<K> = seen.into_iter().collect();
            assert_eq!(unique.len(), t.len(), "S = {count}");
        }
        cells
    }

    /// Invariant: completeness holds for every section count when most pairs
    /// sit in chains.
    #[test]
    fn sections_cover_chained_pairs_for_every_count() {
        // One chain holding every pair.
        let mut one = SlotTable::with_config_and_hasher(
            TableConfig::new().initial_capacity(32),
            ConstBuildHasher,
        )
        .unwrap();
        for k in 0..20u32 {
            one.insert(k, k);
        }
        assert!(matches!(one.slots[0], Slot::Chained(_)));
        assert_eq!(sweep(&one), 64);

        // Eight chains of five spread over the array. The identity hasher keeps
        // the last `u32` written, so a tuple key hashes to its second field.
        let mut many = SlotTable::with_config_and_hasher(
            TableConfig::new().initial_capacity(64),
            IdentityBuildHasher,
        )
        .unwrap();
        for i in 0..40u32 {
            many.insert((i, (i % 8) << 3), i);
        }
        many.assert_consistent();
        assert_eq!(many.capacity(), 64);
        let chains = many
            .slots
            .iter()
            .filter(|s| matches!(s, Slot::Chained(_)))
            .count();
        assert_eq!(chains, 8);
        assert_eq!(sweep(&many), 128);
    }

    #[test]
    fn chains_stay_in_their_section() {
        let mut t = SlotTable::with_config_and_hasher(
            TableConfig::new().initial_capacity(64),
            ConstBuildHasher,
        )
        .unwrap();
        for k in 0..5u32 {
            t.insert(k, k);
        }
        let mut first = 0;
        t.batch_for_each(0, 4, |_, _| first += 1).unwrap();
        assert_eq!(first, 5);
        let mut rest = 0;
        for i in 1..4 {
            t.batch_for_each(i, 4, |_, _| rest += 1).unwrap();
        }
        assert_eq!(rest, 0);
    }

    #[test]
    fn par_for_each_visits_everything() {
        use std::sync::atomic::{AtomicU64, Ordering};
        let t: SlotTable<u64, u64> = (0..1000).map(|k| (k, k)).collect();
        let sum = AtomicU64::new(0);
        t.par_for_each(|_, v| {
            sum.fetch_add(*v, Ordering::Relaxed);
        });
        assert_eq!(sum.load(Ordering::Relaxed), (0..1000).sum::<u64>());
    }
}
