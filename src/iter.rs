//! Borrowing and owning iterators over a `SlotTable`.
//!
//! Traversal order is primary slots ascending, descending into each chain in
//! chain order. Every iterator knows the exact number of pairs left.

use crate::slot::{Bucket, Slot};
use core::iter::FusedIterator;

/// Yields every live bucket under a slot slice.
struct Buckets<'a, K, V> {
    slots: core::slice::Iter<'a, Slot<K, V>>,
    chain: core::slice::Iter<'a, Option<Bucket<K, V>>>,
    remaining: usize,
}

impl<'a, K, V> Buckets<'a, K, V> {
    fn new(slots: &'a [Slot<K, V>], remaining: usize) -> Self {
        Self {
            slots: slots.iter(),
            chain: Default::default(),
            remaining,
        }
    }
}

impl<'a, K, V> Iterator for Buckets<'a, K, V> {
    type Item = &'a Bucket<K, V>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        loop {
            if let Some(Some(b)) = self.chain.next() {
                self.remaining -= 1;
                return Some(b);
            }
            match self.slots.next()? {
                Slot::Empty => {}
                Slot::Pair(b) => {
                    self.remaining -= 1;
                    return Some(b);
                }
                Slot::Chained(c) => self.chain = c.cells().iter(),
            }
        }
    }
}

struct BucketsMut<'a, K, V> {
    slots: core::slice::IterMut<'a, Slot<K, V>>,
    chain: core::slice::IterMut<'a, Option<Bucket<K, V>>>,
    remaining: usize,
}

impl<'a, K, V> BucketsMut<'a, K, V> {
    fn new(slots: &'a mut [Slot<K, V>], remaining: usize) -> Self {
        Self {
            slots: slots.iter_mut(),
            chain: Default::default(),
            remaining,
        }
    }
}

impl<'a, K, V> Iterator for BucketsMut<'a, K, V> {
    type Item = &'a mut Bucket<K, V>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        loop {
            if let Some(Some(b)) = self.chain.next() {
                self.remaining -= 1;
                return Some(b);
            }
            match self.slots.next()? {
                Slot::Empty => {}
                Slot::Pair(b) => {
                    self.remaining -= 1;
                    return Some(b);
                }
                Slot::Chained(c) => self.chain = c.cells_mut().iter_mut(),
            }
        }
    }
}

/// Iterator over `(&K, &V)`.
pub struct Iter<'a, K, V> {
    inner: Buckets<'a, K, V>,
}

impl<'a, K, V> Iter<'a, K, V> {
    pub(crate) fn new(slots: &'a [Slot<K, V>], len: usize) -> Self {
        Self {
            inner: Buckets::new(slots, len),
        }
    }
}

impl<'a, K, V> Clone for Iter<'a, K, V> {
    fn clone(&self) -> Self {
        Self {
            inner: Buckets {
                slots: self.inner.slots.clone(),
                chain: self.inner.chain.clone(),
                remaining: self.inner.remaining,
            },
        }
    }
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|b| (&b.key, &b.value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.inner.remaining, Some(self.inner.remaining))
    }
}

impl<K, V> ExactSizeIterator for Iter<'_, K, V> {}
impl<K, V> FusedIterator for Iter<'_, K, V> {}

/// Iterator over `(&K, &mut V)`.
pub struct IterMut<'a, K, V> {
    inner: BucketsMut<'a, K, V>,
}

impl<'a, K, V> IterMut<'a, K, V> {
    pub(crate) fn new(slots: &'a mut [Slot<K, V>], len: usize) -> Self {
        Self {
            inner: BucketsMut::new(slots, len),
        }
    }
}

impl<'a, K, V> Iterator for IterMut<'a, K, V> {
    type Item = (&'a K, &'a mut V);

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|b| (&b.key, &mut b.value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.inner.remaining, Some(self.inner.remaining))
    }
}

impl<K, V> ExactSizeIterator for IterMut<'_, K, V> {}
impl<K, V> FusedIterator for IterMut<'_, K, V> {}

pub struct Keys<'a, K, V> {
    inner: Iter<'a, K, V>,
}

impl<'a, K, V> Keys<'a, K, V> {
    pub(crate) fn new(inner: Iter<'a, K, V>) -> Self {
        Self { inner }
    }
}

impl<'a, K, V> Iterator for Keys<'a, K, V> {
    type Item = &'a K;

    fn next(&mut self) -> Option<&'a K> {
        self.inner.next().map(|(k, _)| k)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> ExactSizeIterator for Keys<'_, K, V> {}

pub struct Values<'a, K, V> {
    inner: Iter<'a, K, V>,
}

impl<'a, K, V> Values<'a, K, V> {
    pub(crate) fn new(inner: Iter<'a, K, V>) -> Self {
        Self { inner }
    }
}

impl<'a, K, V> Iterator for Values<'a, K, V> {
    type Item = &'a V;

    fn next(&mut self) -> Option<&'a V> {
        self.inner.next().map(|(_, v)| v)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> ExactSizeIterator for Values<'_, K, V> {}

pub struct ValuesMut<'a, K, V> {
    inner: IterMut<'a, K, V>,
}

impl<'a, K, V> ValuesMut<'a, K, V> {
    pub(crate) fn new(inner: IterMut<'a, K, V>) -> Self {
        Self { inner }
    }
}

impl<'a, K, V> Iterator for ValuesMut<'a, K, V> {
    type Item = &'a mut V;

    fn next(&mut self) -> Option<&'a mut V> {
        self.inner.next().map(|(_, v)| v)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> ExactSizeIterator for ValuesMut<'_, K, V> {}

/// Owning iterator; consumes the table.
pub struct IntoIter<K, V> {
    slots: std::vec::IntoIter<Slot<K, V>>,
    chain: std::vec::IntoIter<Option<Bucket<K, V>>>,
    remaining: usize,
}

impl<K, V> IntoIter<K, V> {
    pub(crate) fn new(slots: Box<[Slot<K, V>]>, len: usize) -> Self {
        Self {
            slots: slots.into_vec().into_iter(),
            chain: Vec::new().into_iter(),
            remaining: len,
        }
    }
}

impl<K, V> Iterator for IntoIter<K, V> {
    type Item = (K, V);

    fn next(&mut self) -> Option<(K, V)> {
        if self.remaining == 0 {
            return None;
        }
        loop {
            if let Some(Some(b)) = self.chain.next() {
                self.remaining -= 1;
                return Some((b.key, b.value));
            }
            match self.slots.next()? {
                Slot::Empty => {}
                Slot::Pair(b) => {
                    self.remaining -= 1;
                    return Some((b.key, b.value));
                }
                Slot::Chained(c) => self.chain = c.into_cells().into_iter(),
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> ExactSizeIterator for IntoIter<K, V> {}

#[cfg(test)]
mod tests {
    use crate::test_support::{ConstBuildHasher, IdentityBuildHasher};
    use crate::{SlotTable, TableConfig};

    #[test]
    fn traversal_order_is_slots_then_chain() {
        // Identity hashing: keys below the capacity land in their own slot;
        // 8 and 16 collide with 0 and extend slot 0's chain.
        let mut t = SlotTable::with_config_and_hasher(
            TableConfig::new().initial_capacity(8).load_factor(1.0),
            IdentityBuildHasher,
        )
        .unwrap();
        for k in [3u32, 0, 8, 5] {
            t.insert(k, ());
        }
        let order: Vec<u32> = t.keys().copied().collect();
        assert_eq!(order, vec![0, 8, 3, 5]);
    }

    #[test]
    fn exact_size_tracks_remaining() {
        let mut t = SlotTable::with_hasher(ConstBuildHasher);
        for k in 0..4u32 {
            t.insert(k, k);
        }
        let mut it = t.iter();
        assert_eq!(it.len(), 4);
        it.next();
        assert_eq!(it.len(), 3);
        assert_eq!(it.clone().count(), 3);
        assert_eq!(t.values().sum::<u32>(), 6);
    }

    #[test]
    fn iter_mut_updates_are_visible() {
        let mut t: SlotTable<String, i32> = SlotTable::new();
        for (i, k) in ["k1", "k2", "k3"].iter().enumerate() {
            t.insert(k.to_string(), i as i32);
        }
        for (_k, v) in t.iter_mut() {
            *v += 10;
        }
        for v in t.values_mut() {
            *v *= 2;
        }
        assert_eq!(t.get("k1"), Some(&20));
        assert_eq!(t.get("k2"), Some(&22));
        assert_eq!(t.get("k3"), Some(&24));
    }

    #[test]
    fn into_iter_yields_every_pair_once() {
        let mut t = SlotTable::with_hasher(ConstBuildHasher);
        for k in 0..5u32 {
            t.insert(k, k * 2);
        }
        t.insert(100, 200);
        let mut pairs: Vec<(u32, u32)> = t.into_iter().collect();
        pairs.sort_unstable();
        assert_eq!(pairs, vec![(0, 0), (1, 2), (2, 4), (3, 6), (4, 8), (100, 200)]);
    }
}
