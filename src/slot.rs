//! Slot contents and overflow chains.
//!
//! A slot is a tagged variant rather than a pair of raw cells holding marker
//! objects: `Empty`, a single `Pair`, or a `Chained` overflow array. Keys and
//! values stay adjacent inside a `Bucket`, both in primary slots and in chains.

use core::borrow::Borrow;

/// Pairs added to a chain each time it runs out of room.
pub(crate) const CHAIN_GROWTH: usize = 2;

/// One key/value pair plus the spread hash it was placed with.
#[derive(Clone, Debug)]
pub(crate) struct Bucket<K, V> {
    pub(crate) hash: u32,
    pub(crate) key: K,
    pub(crate) value: V,
}

impl<K, V> Bucket<K, V> {
    pub(crate) fn new(hash: u32, key: K, value: V) -> Self {
        Self { hash, key, value }
    }

    /// Identity first, then cached hash and equality.
    #[inline]
    pub(crate) fn matches<Q>(&self, hash: u32, q: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Eq,
    {
        let k: &Q = self.key.borrow();
        core::ptr::eq(k, q) || (self.hash == hash && k == q)
    }
}

#[derive(Clone, Debug)]
pub(crate) enum Slot<K, V> {
    Empty,
    Pair(Bucket<K, V>),
    Chained(Chain<K, V>),
}

impl<K, V> Slot<K, V> {
    pub(crate) fn take(&mut self) -> Slot<K, V> {
        core::mem::replace(self, Slot::Empty)
    }
}

/// Overflow array for pairs that collided on one primary slot.
///
/// Invariant: live cells form a prefix; the first `None` terminates the chain
/// and no live cell follows it.
#[derive(Clone, Debug)]
pub(crate) struct Chain<K, V> {
    cells: Vec<Option<Bucket<K, V>>>,
}

impl<K, V> Chain<K, V> {
    /// Fresh chain with room for two pairs, holding `first`.
    pub(crate) fn with_pair(first: Bucket<K, V>) -> Self {
        let mut cells = Vec::with_capacity(CHAIN_GROWTH);
        cells.push(Some(first));
        cells.resize_with(CHAIN_GROWTH, || None);
        Self { cells }
    }

    pub(crate) fn len(&self) -> usize {
        self.cells
            .iter()
            .position(Option::is_none)
            .unwrap_or(self.cells.len())
    }

    /// Allocated pair cells, live or vacant.
    #[cfg(test)]
    pub(crate) fn cell_count(&self) -> usize {
        self.cells.len()
    }

    pub(crate) fn get(&self, i: usize) -> Option<&Bucket<K, V>> {
        self.cells.get(i).and_then(Option::as_ref)
    }

    pub(crate) fn get_mut(&mut self, i: usize) -> Option<&mut Bucket<K, V>> {
        self.cells.get_mut(i).and_then(Option::as_mut)
    }

    pub(crate) fn position<Q>(&self, hash: u32, q: &Q) -> Option<usize>
    where
        K: Borrow<Q>,
        Q: ?Sized + Eq,
    {
        self.iter().position(|b| b.matches(hash, q))
    }

    /// Append into the first vacant cell, growing by `CHAIN_GROWTH` pairs when
    /// every cell is live.
    pub(crate) fn push(&mut self, bucket: Bucket<K, V>) {
        let at = self.len();
        if at == self.cells.len() {
            self.cells.reserve_exact(CHAIN_GROWTH);
            self.cells.resize_with(at + CHAIN_GROWTH, || None);
        }
        self.cells[at] = Some(bucket);
    }

    /// Remove cell `i` by moving the last live pair into it. O(chain length)
    /// and keeps the live prefix gap-free.
    pub(crate) fn swap_remove(&mut self, i: usize) -> Bucket<K, V> {
        let last = self.len() - 1;
        let removed = self.cells[i]
            .take()
            .expect("chain cell below the live length must be occupied");
        if i != last {
            self.cells[i] = self.cells[last].take();
        }
        removed
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &Bucket<K, V>> {
        self.cells.iter().map_while(Option::as_ref)
    }

    pub(crate) fn cells(&self) -> &[Option<Bucket<K, V>>] {
        &self.cells
    }

    pub(crate) fn cells_mut(&mut self) -> &mut [Option<Bucket<K, V>>] {
        &mut self.cells
    }

    pub(crate) fn into_cells(self) -> Vec<Option<Bucket<K, V>>> {
        self.cells
    }

    pub(crate) fn into_buckets(self) -> impl Iterator<Item = Bucket<K, V>> {
        self.cells.into_iter().map_while(|c| c)
    }

    /// Sole remaining pair, when the chain holds exactly one.
    pub(crate) fn take_single(&mut self) -> Option<Bucket<K, V>> {
        if self.len() == 1 {
            self.cells[0].take()
        } else {
            None
        }
    }

    #[cfg(test)]
    pub(crate) fn is_compact(&self) -> bool {
        let live = self.len();
        self.cells[live..].iter().all(Option::is_none)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn b(k: u32) -> Bucket<u32, u32> {
        Bucket::new(0, k, k * 10)
    }

    #[test]
    fn fresh_chain_has_room_for_two() {
        let c = Chain::with_pair(b(1));
        assert_eq!(c.len(), 1);
        assert_eq!(c.cell_count(), CHAIN_GROWTH);
    }

    #[test]
    fn push_grows_by_two_pairs() {
        let mut c = Chain::with_pair(b(1));
        c.push(b(2));
        assert_eq!(c.cell_count(), 2);
        c.push(b(3));
        assert_eq!(c.cell_count(), 4);
        assert_eq!(c.len(), 3);
        c.push(b(4));
        assert_eq!(c.cell_count(), 4);
        c.push(b(5));
        assert_eq!(c.cell_count(), 6);
        let keys: Vec<u32> = c.iter().map(|b| b.key).collect();
        assert_eq!(keys, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn swap_remove_moves_last_into_hole() {
        let mut c = Chain::with_pair(b(1));
        for k in 2..=5 {
            c.push(b(k));
        }
        let removed = c.swap_remove(1);
        assert_eq!(removed.key, 2);
        let keys: Vec<u32> = c.iter().map(|b| b.key).collect();
        assert_eq!(keys, vec![1, 5, 3, 4]);
        assert!(c.is_compact());

        // Removing the last live cell only vacates it.
        let removed = c.swap_remove(3);
        assert_eq!(removed.key, 4);
        let keys: Vec<u32> = c.iter().map(|b| b.key).collect();
        assert_eq!(keys, vec![1, 5, 3]);
        assert!(c.is_compact());
    }

    #[test]
    fn take_single_only_for_one_pair() {
        let mut c = Chain::with_pair(b(1));
        c.push(b(2));
        assert!(c.take_single().is_none());
        c.swap_remove(0);
        assert_eq!(c.take_single().map(|b| b.key), Some(2));
        assert_eq!(c.len(), 0);
    }

    #[test]
    fn identity_match_short_circuits() {
        let bucket = Bucket::new(7, "k".to_string(), 1);
        let key: &String = &bucket.key;
        // Wrong hash, but the very same key object still matches.
        assert!(bucket.matches(99, key));
        assert!(bucket.matches(7, "k"));
        assert!(!bucket.matches(99, "k"));
    }
}
