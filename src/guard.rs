//! Reader/writer guarded table with scoped views.
//!
//! All access goes through closures. A view lives only for the closure it is
//! handed to: its lifetime keeps borrowed references inside the section, and
//! its scope flag turns anything detached from it (cursors, key sets,
//! [`ScopedEntry`] handles) stale once the section ends. The flag is cleared
//! before the lock is released, also when the closure unwinds.

use crate::config::TableConfig;
use crate::cursor::Cursor;
use crate::error::{Result, TableError};
use crate::scope::{ScopeFlag, ScopeGuard};
use crate::slot_table::SlotTable;
use crate::iter::{Iter, IterMut};
use crate::views::{EntrySet, KeySet, TableRef, ValuesView};
use core::borrow::Borrow;
use core::hash::{BuildHasher, Hash};
use hashbrown::hash_map::DefaultHashBuilder;
use parking_lot::RwLock;
use std::sync::Arc;

/// Operations shared by read and write views, so section logic can be
/// written once over either.
pub trait ScopedAccess<K, V> {
    fn len(&self) -> Result<usize>;

    fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    fn get<Q>(&self, q: &Q) -> Result<Option<&V>>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq;

    fn contains_key<Q>(&self, q: &Q) -> Result<bool>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        Ok(self.get(q)?.is_some())
    }

    fn insert(&mut self, key: K, value: V) -> Result<Option<V>>;

    fn remove<Q>(&mut self, q: &Q) -> Result<Option<V>>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq;

    fn clear(&mut self) -> Result<()>;

    fn for_each<F: FnMut(&K, &V)>(&self, f: F) -> Result<()>;

    /// Liveness flag of the enclosing section.
    fn scope(&self) -> &ScopeFlag;
}

/// View handed to `with_read_lock`. Mutators fail with `UnsupportedMutation`.
pub struct ReadView<'a, K, V, S> {
    table: &'a SlotTable<K, V, S>,
    flag: Arc<ScopeFlag>,
}

/// View handed to `with_write_lock`.
pub struct WriteView<'a, K, V, S> {
    table: &'a mut SlotTable<K, V, S>,
    flag: Arc<ScopeFlag>,
}

impl<'a, K, V, S> ScopedAccess<K, V> for ReadView<'a, K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    fn len(&self) -> Result<usize> {
        self.flag.check()?;
        Ok(self.table.len())
    }

    fn get<Q>(&self, q: &Q) -> Result<Option<&V>>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.flag.check()?;
        Ok(self.table.get(q))
    }

    fn insert(&mut self, _key: K, _value: V) -> Result<Option<V>> {
        self.flag.check()?;
        Err(TableError::UnsupportedMutation)
    }

    fn remove<Q>(&mut self, _q: &Q) -> Result<Option<V>>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.flag.check()?;
        Err(TableError::UnsupportedMutation)
    }

    fn clear(&mut self) -> Result<()> {
        self.flag.check()?;
        Err(TableError::UnsupportedMutation)
    }

    fn for_each<F: FnMut(&K, &V)>(&self, f: F) -> Result<()> {
        self.flag.check()?;
        self.table.for_each(f);
        Ok(())
    }

    fn scope(&self) -> &ScopeFlag {
        &self.flag
    }
}

impl<'a, K, V, S> ScopedAccess<K, V> for WriteView<'a, K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    fn len(&self) -> Result<usize> {
        self.flag.check()?;
        Ok(self.table.len())
    }

    fn get<Q>(&self, q: &Q) -> Result<Option<&V>>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.flag.check()?;
        Ok(self.table.get(q))
    }

    fn insert(&mut self, key: K, value: V) -> Result<Option<V>> {
        self.flag.check()?;
        Ok(self.table.insert(key, value))
    }

    fn remove<Q>(&mut self, q: &Q) -> Result<Option<V>>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.flag.check()?;
        Ok(self.table.remove(q))
    }

    fn clear(&mut self) -> Result<()> {
        self.flag.check()?;
        self.table.clear();
        Ok(())
    }

    fn for_each<F: FnMut(&K, &V)>(&self, f: F) -> Result<()> {
        self.flag.check()?;
        self.table.for_each(f);
        Ok(())
    }

    fn scope(&self) -> &ScopeFlag {
        &self.flag
    }
}

impl<'a, K, V, S> ReadView<'a, K, V, S> {
    pub fn key_set(&self) -> Result<KeySet<'_, K, V, S>> {
        self.flag.check()?;
        Ok(KeySet::new(
            TableRef::Shared(self.table),
            Some(Arc::clone(&self.flag)),
        ))
    }

    pub fn values_view(&self) -> Result<ValuesView<'_, K, V, S>> {
        self.flag.check()?;
        Ok(ValuesView::new(
            TableRef::Shared(self.table),
            Some(Arc::clone(&self.flag)),
        ))
    }

    pub fn entry_set(&self) -> Result<EntrySet<'_, K, V, S>> {
        self.flag.check()?;
        Ok(EntrySet::new(
            TableRef::Shared(self.table),
            Some(Arc::clone(&self.flag)),
        ))
    }

    pub fn iter(&self) -> Result<Iter<'_, K, V>> {
        self.flag.check()?;
        Ok(self.table.iter())
    }
}

impl<'a, K, V, S> ReadView<'a, K, V, S>
where
    K: Eq + Hash + Clone,
    S: BuildHasher,
{
    /// Detach a handle to `q`'s entry, usable only within this section.
    pub fn scoped_entry<Q>(&self, q: &Q) -> Result<Option<ScopedEntry<K>>>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.flag.check()?;
        Ok(ScopedEntry::detach(self.table, q, &self.flag))
    }
}

impl<'a, K, V, S> WriteView<'a, K, V, S> {
    pub fn key_set(&mut self) -> Result<KeySet<'_, K, V, S>> {
        self.flag.check()?;
        Ok(KeySet::new(
            TableRef::Exclusive(&mut *self.table),
            Some(Arc::clone(&self.flag)),
        ))
    }

    pub fn cursor(&mut self) -> Result<Cursor<'_, K, V, S>> {
        self.flag.check()?;
        Ok(Cursor::new(&mut *self.table, Some(Arc::clone(&self.flag))))
    }

    pub fn values_view(&mut self) -> Result<ValuesView<'_, K, V, S>> {
        self.flag.check()?;
        Ok(ValuesView::new(
            TableRef::Exclusive(&mut *self.table),
            Some(Arc::clone(&self.flag)),
        ))
    }

    pub fn entry_set(&mut self) -> Result<EntrySet<'_, K, V, S>> {
        self.flag.check()?;
        Ok(EntrySet::new(
            TableRef::Exclusive(&mut *self.table),
            Some(Arc::clone(&self.flag)),
        ))
    }

    pub fn iter(&self) -> Result<Iter<'_, K, V>> {
        self.flag.check()?;
        Ok(self.table.iter())
    }

    pub fn iter_mut(&mut self) -> Result<IterMut<'_, K, V>> {
        self.flag.check()?;
        Ok(self.table.iter_mut())
    }

    /// Keep only the pairs for which `f` returns true.
    pub fn retain<F>(&mut self, f: F) -> Result<()>
    where
        F: FnMut(&K, &mut V) -> bool,
    {
        self.flag.check()?;
        self.table.retain(f);
        Ok(())
    }
}

impl<'a, K, V, S> WriteView<'a, K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    pub fn get_mut<Q>(&mut self, q: &Q) -> Result<Option<&mut V>>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.flag.check()?;
        Ok(self.table.get_mut(q))
    }

    pub fn get_or_insert_with<F>(&mut self, key: K, default: F) -> Result<&mut V>
    where
        F: FnOnce() -> V,
    {
        self.flag.check()?;
        Ok(self.table.get_or_insert_with(key, default))
    }

    pub fn scoped_entry<Q>(&self, q: &Q) -> Result<Option<ScopedEntry<K>>>
    where
        K: Clone + Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.flag.check()?;
        Ok(ScopedEntry::detach(&*self.table, q, &self.flag))
    }
}

/// Key handle detached from a view. Every use checks that it is presented
/// to the very section it came from, while that section is still running.
#[derive(Clone, Debug)]
pub struct ScopedEntry<K> {
    key: K,
    flag: Arc<ScopeFlag>,
}

impl<K> ScopedEntry<K> {
    fn detach<V, S, Q>(table: &SlotTable<K, V, S>, q: &Q, flag: &Arc<ScopeFlag>) -> Option<Self>
    where
        K: Eq + Hash + Clone + Borrow<Q>,
        Q: ?Sized + Hash + Eq,
        S: BuildHasher,
    {
        table.get_key_value(q).map(|(k, _)| ScopedEntry {
            key: k.clone(),
            flag: Arc::clone(flag),
        })
    }

    pub fn key(&self) -> Result<&K> {
        self.flag.check()?;
        Ok(&self.key)
    }

    pub fn is_live(&self) -> bool {
        self.flag.is_live()
    }

    /// Current value in `view`; `StaleEntry` once the key is gone.
    pub fn value<'v, V, A>(&self, view: &'v A) -> Result<&'v V>
    where
        A: ScopedAccess<K, V>,
        K: Eq + Hash,
    {
        self.flag.check_same(view.scope())?;
        view.get(&self.key)?.ok_or(TableError::StaleEntry)
    }

    /// Overwrite the value; returns the previous one.
    pub fn set_value<V, S>(&self, view: &mut WriteView<'_, K, V, S>, value: V) -> Result<V>
    where
        K: Eq + Hash,
        S: BuildHasher,
    {
        self.flag.check_same(view.scope())?;
        let slot = view.get_mut(&self.key)?.ok_or(TableError::StaleEntry)?;
        Ok(core::mem::replace(slot, value))
    }
}

/// One `SlotTable` behind a `parking_lot::RwLock`.
pub struct ConcurrentTable<K, V, S = DefaultHashBuilder> {
    inner: RwLock<SlotTable<K, V, S>>,
}

impl<K, V> ConcurrentTable<K, V, DefaultHashBuilder> {
    pub fn new() -> Self {
        Self::from_table(SlotTable::new())
    }

    pub fn with_config(config: TableConfig) -> Result<Self> {
        Ok(Self::from_table(SlotTable::with_config(config)?))
    }
}

impl<K, V> Default for ConcurrentTable<K, V, DefaultHashBuilder> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, S> From<SlotTable<K, V, S>> for ConcurrentTable<K, V, S> {
    fn from(table: SlotTable<K, V, S>) -> Self {
        Self::from_table(table)
    }
}

impl<K, V, S> ConcurrentTable<K, V, S> {
    pub fn from_table(table: SlotTable<K, V, S>) -> Self {
        Self {
            inner: RwLock::new(table),
        }
    }

    /// Run `f` under the shared lock.
    pub fn with_read_lock<R, F>(&self, f: F) -> R
    where
        F: FnOnce(&mut ReadView<'_, K, V, S>) -> R,
    {
        let lock = self.inner.read();
        let scope = ScopeGuard::enter();
        let mut view = ReadView {
            table: &lock,
            flag: Arc::clone(scope.flag()),
        };
        f(&mut view)
    }

    /// Run `f` under the exclusive lock.
    pub fn with_write_lock<R, F>(&self, f: F) -> R
    where
        F: FnOnce(&mut WriteView<'_, K, V, S>) -> R,
    {
        let mut lock = self.inner.write();
        let scope = ScopeGuard::enter();
        let mut view = WriteView {
            table: &mut lock,
            flag: Arc::clone(scope.flag()),
        };
        f(&mut view)
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }

    pub fn into_inner(self) -> SlotTable<K, V, S> {
        self.inner.into_inner()
    }

    /// Batched parallel traversal, holding the read lock throughout.
    pub fn par_for_each<F>(&self, f: F)
    where
        F: Fn(&K, &V) + Sync,
        K: Sync,
        V: Sync,
        S: Sync,
    {
        self.inner.read().par_for_each(f);
    }
}

impl<K, V, S> ConcurrentTable<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    pub fn get_cloned<Q>(&self, q: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
        V: Clone,
    {
        self.inner.read().get(q).cloned()
    }

    pub fn contains_key<Q>(&self, q: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.inner.read().contains_key(q)
    }

    pub fn insert(&self, key: K, value: V) -> Option<V> {
        self.inner.write().insert(key, value)
    }

    pub fn remove<Q>(&self, q: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.inner.write().remove(q)
    }
}
