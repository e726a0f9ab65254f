//! SlotTable: flat-array hash table with per-slot overflow chains.

use crate::config::{max_size_for, TableConfig, MAX_CAPACITY};
use crate::cursor::Cursor;
use crate::error::Result;
use crate::iter::{IntoIter, Iter, IterMut, Keys, Values, ValuesMut};
use crate::slot::{Bucket, Chain, Slot};
use core::borrow::Borrow;
use core::fmt;
use core::hash::{BuildHasher, Hash, Hasher};
use core::ops::Index;
use core::sync::atomic::{AtomicU64, Ordering};
use hashbrown::hash_map::DefaultHashBuilder;
use std::collections::hash_map::DefaultHasher;

static NEXT_TABLE_ID: AtomicU64 = AtomicU64::new(1);

fn next_table_id() -> u64 {
    NEXT_TABLE_ID.fetch_add(1, Ordering::Relaxed)
}

/// Fold a 64-bit hash to 32 bits and spread its high bits into the low
/// bits, so keys whose hashes differ only in high bits still land apart.
#[inline]
pub(crate) fn spread(h: u64) -> u32 {
    let mut h = (h ^ (h >> 32)) as u32;
    h ^= (h >> 20) ^ (h >> 12);
    h ^ (h >> 7) ^ (h >> 4)
}

/// Position of a live pair: a primary slot, or a cell inside that slot's chain.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) enum Location {
    Primary(usize),
    Chain(usize, usize),
}

/// Hash table storing pairs inline in one slot array, with overflow chains
/// for collisions.
///
/// Not internally synchronized; wrap it in a
/// [`ConcurrentTable`](crate::ConcurrentTable) for shared use.
pub struct SlotTable<K, V, S = DefaultHashBuilder> {
    pub(crate) hasher: S,
    pub(crate) slots: Box<[Slot<K, V>]>,
    pub(crate) occupied: usize,
    load_factor: f32,
    max_size: usize,
    id: u64,
    generation: u64,
}

impl<K, V> SlotTable<K, V, DefaultHashBuilder> {
    pub fn new() -> Self {
        Self::with_hasher(DefaultHashBuilder::default())
    }

    /// Table with room for at least `capacity` primary slots.
    pub fn with_capacity(capacity: usize) -> Result<Self> {
        Self::with_config(TableConfig::new().initial_capacity(capacity))
    }

    pub fn with_config(config: TableConfig) -> Result<Self> {
        Self::with_config_and_hasher(config, DefaultHashBuilder::default())
    }
}

impl<K, V> Default for SlotTable<K, V, DefaultHashBuilder> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, S> SlotTable<K, V, S> {
    pub fn with_hasher(hasher: S) -> Self {
        Self::build(TableConfig::default(), hasher)
    }

    pub fn with_capacity_and_hasher(capacity: usize, hasher: S) -> Result<Self> {
        Self::with_config_and_hasher(TableConfig::new().initial_capacity(capacity), hasher)
    }

    pub fn with_config_and_hasher(config: TableConfig, hasher: S) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(config, hasher))
    }

    fn build(config: TableConfig, hasher: S) -> Self {
        let capacity = config.slot_capacity();
        Self {
            hasher,
            slots: empty_slots(capacity),
            occupied: 0,
            load_factor: config.load_factor,
            max_size: max_size_for(capacity, config.load_factor),
            id: next_table_id(),
            generation: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.occupied
    }

    pub fn is_empty(&self) -> bool {
        self.occupied == 0
    }

    /// Number of primary slots.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn load_factor(&self) -> f32 {
        self.load_factor
    }

    /// Pair count above which the next insertion doubles the table.
    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Length of the logical key/value cell array: two cells per slot.
    pub fn slot_array_len(&self) -> usize {
        self.slots.len() * 2
    }

    pub fn hasher(&self) -> &S {
        &self.hasher
    }

    pub(crate) fn id(&self) -> u64 {
        self.id
    }

    pub(crate) fn generation(&self) -> u64 {
        self.generation
    }

    /// Drop every pair, keeping the current capacity. Entry handles taken
    /// before the clear become stale.
    pub fn clear(&mut self) {
        for slot in self.slots.iter_mut() {
            *slot = Slot::Empty;
        }
        self.occupied = 0;
        self.generation = self.generation.wrapping_add(1);
    }

    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter::new(&self.slots, self.occupied)
    }

    pub fn iter_mut(&mut self) -> IterMut<'_, K, V> {
        IterMut::new(&mut self.slots, self.occupied)
    }

    pub fn keys(&self) -> Keys<'_, K, V> {
        Keys::new(self.iter())
    }

    pub fn values(&self) -> Values<'_, K, V> {
        Values::new(self.iter())
    }

    pub fn values_mut(&mut self) -> ValuesMut<'_, K, V> {
        ValuesMut::new(self.iter_mut())
    }

    /// Cursor supporting removal of the pair it last returned.
    pub fn cursor(&mut self) -> Cursor<'_, K, V, S> {
        Cursor::new(self, None)
    }

    /// Visit every pair in traversal order.
    pub fn for_each<F>(&self, mut f: F)
    where
        F: FnMut(&K, &V),
    {
        for (k, v) in self.iter() {
            f(k, v);
        }
    }

    /// Visit every pair along with its position in traversal order.
    pub fn for_each_with_index<F>(&self, mut f: F)
    where
        F: FnMut(&K, &V, usize),
    {
        for (i, (k, v)) in self.iter().enumerate() {
            f(k, v, i);
        }
    }

    pub fn for_each_key<F: FnMut(&K)>(&self, mut f: F) {
        self.for_each(|k, _| f(k));
    }

    pub fn for_each_value<F: FnMut(&V)>(&self, mut f: F) {
        self.for_each(|_, v| f(v));
    }

    /// Linear scan over every value.
    pub fn contains_value(&self, value: &V) -> bool
    where
        V: PartialEq,
    {
        self.values().any(|v| v == value)
    }

    /// Keep only the pairs for which `f` returns true.
    pub fn retain<F>(&mut self, mut f: F)
    where
        F: FnMut(&K, &mut V) -> bool,
    {
        let mut cursor = self.cursor();
        while let Ok((k, v)) = cursor.next() {
            if !f(k, v) {
                cursor
                    .remove()
                    .expect("cursor holds the pair it just returned");
            }
        }
    }

    /// Sum over pairs of `hash(key) ^ hash(value)`, using a seedless hasher
    /// so equal tables agree regardless of their `BuildHasher`.
    pub fn content_hash(&self) -> u64
    where
        K: Hash,
        V: Hash,
    {
        self.iter().fold(0u64, |acc, (k, v)| {
            acc.wrapping_add(fixed_hash(k) ^ fixed_hash(v))
        })
    }

    /// Panics when a structural invariant is broken.
    #[cfg(test)]
    pub(crate) fn assert_consistent(&self) {
        let mask = self.slots.len() - 1;
        let mut live = 0;
        for (idx, slot) in self.slots.iter().enumerate() {
            match slot {
                Slot::Empty => {}
                Slot::Pair(b) => {
                    assert_eq!(b.hash as usize & mask, idx, "pair in the wrong slot");
                    live += 1;
                }
                Slot::Chained(c) => {
                    assert!(c.is_compact(), "gap inside chain at slot {idx}");
                    assert!(c.len() >= 2, "chain at slot {idx} should have collapsed");
                    for b in c.iter() {
                        assert_eq!(b.hash as usize & mask, idx, "chained pair in the wrong slot");
                    }
                    live += c.len();
                }
            }
        }
        assert_eq!(live, self.occupied, "occupied count drifted");
        assert!(self.max_size < self.slots.len());
        assert!(self.slots.len().is_power_of_two());
    }

    pub(crate) fn bucket_at(&self, loc: Location) -> &Bucket<K, V> {
        match (loc, &self.slots[loc.slot()]) {
            (Location::Primary(_), Slot::Pair(b)) => b,
            (Location::Chain(_, i), Slot::Chained(c)) => {
                c.get(i).expect("chain location must point at a live cell")
            }
            _ => panic!("location {loc:?} does not match slot layout"),
        }
    }

    pub(crate) fn bucket_at_mut(&mut self, loc: Location) -> &mut Bucket<K, V> {
        match (loc, &mut self.slots[loc.slot()]) {
            (Location::Primary(_), Slot::Pair(b)) => b,
            (Location::Chain(_, i), Slot::Chained(c)) => {
                c.get_mut(i).expect("chain location must point at a live cell")
            }
            _ => panic!("location {loc:?} does not match slot layout"),
        }
    }

    /// Unlink the pair at `loc`, compacting its chain.
    pub(crate) fn remove_at(&mut self, loc: Location) -> Bucket<K, V> {
        let slot = &mut self.slots[loc.slot()];
        let bucket = match loc {
            Location::Primary(_) => match slot.take() {
                Slot::Pair(b) => b,
                _ => panic!("primary location must hold a pair"),
            },
            Location::Chain(_, i) => remove_chain_cell(slot, i),
        };
        self.occupied -= 1;
        bucket
    }

    /// Place a bucket whose key is known to be absent.
    fn place(slots: &mut [Slot<K, V>], bucket: Bucket<K, V>) -> Location {
        let idx = bucket.hash as usize & (slots.len() - 1);
        let slot = &mut slots[idx];
        match &mut *slot {
            Slot::Empty => {
                *slot = Slot::Pair(bucket);
                Location::Primary(idx)
            }
            Slot::Chained(chain) => {
                let at = chain.len();
                chain.push(bucket);
                Location::Chain(idx, at)
            }
            Slot::Pair(_) => {
                let Slot::Pair(existing) = slot.take() else {
                    unreachable!("slot matched as a pair")
                };
                log::trace!("slot {idx} demoted to an overflow chain");
                let mut chain = Chain::with_pair(existing);
                chain.push(bucket);
                *slot = Slot::Chained(chain);
                Location::Chain(idx, 1)
            }
        }
    }

    /// Double the slot array. Pairs are re-placed from their cached hashes
    /// into a fresh array that replaces the live one once fully populated.
    fn grow(&mut self) {
        let old_capacity = self.slots.len();
        if old_capacity >= MAX_CAPACITY {
            log::warn!("slot table at maximum capacity {old_capacity}; chains absorb further pairs");
            self.max_size = usize::MAX;
            return;
        }
        let new_capacity = old_capacity * 2;
        log::debug!(
            "growing slot table {} -> {} slots ({} pairs)",
            old_capacity,
            new_capacity,
            self.occupied
        );

        let mut fresh = empty_slots(new_capacity);
        let mut placed = 0usize;
        let old = core::mem::take(&mut self.slots);
        for slot in old.into_vec() {
            match slot {
                Slot::Empty => {}
                Slot::Pair(b) => {
                    Self::place(&mut fresh, b);
                    placed += 1;
                }
                Slot::Chained(chain) => {
                    for b in chain.into_buckets() {
                        Self::place(&mut fresh, b);
                        placed += 1;
                    }
                }
            }
        }
        debug_assert_eq!(placed, self.occupied);
        self.slots = fresh;
        self.occupied = placed;
        self.max_size = max_size_for(new_capacity, self.load_factor);
    }
}

impl<K, V, S> SlotTable<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    #[inline]
    pub(crate) fn hash_of<Q>(&self, q: &Q) -> u32
    where
        Q: ?Sized + Hash,
    {
        spread(self.hasher.hash_one(q))
    }

    #[inline]
    fn index_for(&self, hash: u32) -> usize {
        hash as usize & (self.slots.len() - 1)
    }

    pub(crate) fn locate<Q>(&self, q: &Q) -> Option<Location>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let hash = self.hash_of(q);
        let idx = self.index_for(hash);
        match &self.slots[idx] {
            Slot::Empty => None,
            Slot::Pair(b) => b.matches(hash, q).then_some(Location::Primary(idx)),
            Slot::Chained(c) => c.position(hash, q).map(|i| Location::Chain(idx, i)),
        }
    }

    /// Insert or overwrite; returns the previous value for `key`.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        let hash = self.hash_of(&key);
        let idx = self.index_for(hash);
        match &mut self.slots[idx] {
            Slot::Pair(b) if b.matches(hash, &key) => {
                return Some(core::mem::replace(&mut b.value, value));
            }
            Slot::Chained(chain) => {
                if let Some(i) = chain.position(hash, &key) {
                    let b = chain.get_mut(i).expect("position returned a live cell");
                    return Some(core::mem::replace(&mut b.value, value));
                }
            }
            _ => {}
        }
        Self::place(&mut self.slots, Bucket::new(hash, key, value));
        self.occupied += 1;
        if self.occupied > self.max_size {
            self.grow();
        }
        None
    }

    /// Value for `key`, inserting `default()` first when absent.
    pub fn get_or_insert_with<F>(&mut self, key: K, default: F) -> &mut V
    where
        F: FnOnce() -> V,
    {
        if let Some(loc) = self.locate(&key) {
            return &mut self.bucket_at_mut(loc).value;
        }
        let hash = self.hash_of(&key);
        // Grow ahead of placement so the returned location stays valid; the
        // resulting capacity matches insert-then-grow.
        if self.occupied + 1 > self.max_size {
            self.grow();
        }
        let loc = Self::place(&mut self.slots, Bucket::new(hash, key, default()));
        self.occupied += 1;
        &mut self.bucket_at_mut(loc).value
    }

    pub fn get<Q>(&self, q: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.locate(q).map(|loc| &self.bucket_at(loc).value)
    }

    pub fn get_mut<Q>(&mut self, q: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let loc = self.locate(q)?;
        Some(&mut self.bucket_at_mut(loc).value)
    }

    pub fn get_key_value<Q>(&self, q: &Q) -> Option<(&K, &V)>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.locate(q).map(|loc| {
            let b = self.bucket_at(loc);
            (&b.key, &b.value)
        })
    }

    pub fn contains_key<Q>(&self, q: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.locate(q).is_some()
    }

    pub fn remove<Q>(&mut self, q: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.remove_entry(q).map(|(_, v)| v)
    }

    pub fn remove_entry<Q>(&mut self, q: &Q) -> Option<(K, V)>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let loc = self.locate(q)?;
        let b = self.remove_at(loc);
        Some((b.key, b.value))
    }
}

/// Remove chain cell `i` from `slot`. An emptied chain restores the slot to
/// `Empty`; a chain left with one pair collapses into a plain `Pair`.
pub(crate) fn remove_chain_cell<K, V>(slot: &mut Slot<K, V>, i: usize) -> Bucket<K, V> {
    let (removed, remaining) = match &mut *slot {
        Slot::Chained(chain) => {
            let removed = chain.swap_remove(i);
            (removed, chain.len())
        }
        _ => panic!("chain removal on a slot without a chain"),
    };
    match remaining {
        0 => *slot = Slot::Empty,
        1 => {
            let single = match &mut *slot {
                Slot::Chained(chain) => chain.take_single(),
                _ => None,
            };
            if let Some(single) = single {
                *slot = Slot::Pair(single);
            }
        }
        _ => {}
    }
    removed
}

impl Location {
    pub(crate) fn slot(&self) -> usize {
        match *self {
            Location::Primary(s) | Location::Chain(s, _) => s,
        }
    }
}

fn empty_slots<K, V>(capacity: usize) -> Box<[Slot<K, V>]> {
    core::iter::repeat_with(|| Slot::Empty).take(capacity).collect()
}

fn fixed_hash<T: ?Sized + Hash>(t: &T) -> u64 {
    let mut h = DefaultHasher::new();
    t.hash(&mut h);
    h.finish()
}

impl<K, V, S> Clone for SlotTable<K, V, S>
where
    K: Clone,
    V: Clone,
    S: Clone,
{
    fn clone(&self) -> Self {
        Self {
            hasher: self.hasher.clone(),
            slots: self.slots.clone(),
            occupied: self.occupied,
            load_factor: self.load_factor,
            max_size: self.max_size,
            id: next_table_id(),
            generation: 0,
        }
    }
}

impl<K, V, S> fmt::Debug for SlotTable<K, V, S>
where
    K: fmt::Debug,
    V: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K, V, S1, S2> PartialEq<SlotTable<K, V, S2>> for SlotTable<K, V, S1>
where
    K: Eq + Hash,
    V: PartialEq,
    S1: BuildHasher,
    S2: BuildHasher,
{
    fn eq(&self, other: &SlotTable<K, V, S2>) -> bool {
        self.len() == other.len()
            && self
                .iter()
                .all(|(k, v)| other.get(k).map_or(false, |ov| v == ov))
    }
}

impl<K, V, S> Eq for SlotTable<K, V, S>
where
    K: Eq + Hash,
    V: Eq,
    S: BuildHasher,
{
}

impl<K, V, S1, S2> PartialEq<std::collections::HashMap<K, V, S2>> for SlotTable<K, V, S1>
where
    K: Eq + Hash,
    V: PartialEq,
    S1: BuildHasher,
    S2: BuildHasher,
{
    fn eq(&self, other: &std::collections::HashMap<K, V, S2>) -> bool {
        self.len() == other.len() && self.iter().all(|(k, v)| other.get(k) == Some(v))
    }
}

impl<K, V, S1, S2> PartialEq<hashbrown::HashMap<K, V, S2>> for SlotTable<K, V, S1>
where
    K: Eq + Hash,
    V: PartialEq,
    S1: BuildHasher,
    S2: BuildHasher,
{
    fn eq(&self, other: &hashbrown::HashMap<K, V, S2>) -> bool {
        self.len() == other.len() && self.iter().all(|(k, v)| other.get(k) == Some(v))
    }
}

impl<K, V, S> Hash for SlotTable<K, V, S>
where
    K: Hash,
    V: Hash,
{
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.content_hash());
    }
}

impl<K, Q, V, S> Index<&Q> for SlotTable<K, V, S>
where
    K: Eq + Hash + Borrow<Q>,
    Q: ?Sized + Eq + Hash,
    S: BuildHasher,
{
    type Output = V;

    fn index(&self, key: &Q) -> &V {
        self.get(key).expect("key not present in slot table")
    }
}

impl<K, V, S> Extend<(K, V)> for SlotTable<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (k, v) in iter {
            self.insert(k, v);
        }
    }
}

impl<K, V, S> FromIterator<(K, V)> for SlotTable<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher + Default,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut table = Self::with_hasher(S::default());
        table.extend(iter);
        table
    }
}

impl<'a, K, V, S> IntoIterator for &'a SlotTable<K, V, S> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, K, V, S> IntoIterator for &'a mut SlotTable<K, V, S> {
    type Item = (&'a K, &'a mut V);
    type IntoIter = IterMut<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}

impl<K, V, S> IntoIterator for SlotTable<K, V, S> {
    type Item = (K, V);
    type IntoIter = IntoIter<K, V>;

    fn into_iter(self) -> Self::IntoIter {
        IntoIter::new(self.slots, self.occupied)
    }
}
