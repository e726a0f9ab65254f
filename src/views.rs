//! Live key, value and entry views over a table.
//!
//! Views are facades, not copies: reads go straight to the table and
//! mutations remove pairs from it. A view built from a shared borrow rejects
//! every mutation with `UnsupportedMutation`.

use crate::error::{Result, TableError};
use crate::iter::{Iter, Keys, Values};
use crate::scope::{check_opt, ScopeFlag};
use crate::slot_table::SlotTable;
use core::borrow::Borrow;
use core::hash::{BuildHasher, Hash};
use std::sync::Arc;

pub(crate) enum TableRef<'a, K, V, S> {
    Shared(&'a SlotTable<K, V, S>),
    Exclusive(&'a mut SlotTable<K, V, S>),
}

impl<'a, K, V, S> TableRef<'a, K, V, S> {
    fn get(&self) -> &SlotTable<K, V, S> {
        match self {
            TableRef::Shared(t) => *t,
            TableRef::Exclusive(t) => &**t,
        }
    }

    fn get_mut(&mut self) -> Result<&mut SlotTable<K, V, S>> {
        match self {
            TableRef::Shared(_) => Err(TableError::UnsupportedMutation),
            TableRef::Exclusive(t) => Ok(&mut **t),
        }
    }
}

/// Keys of a table.
pub struct KeySet<'a, K, V, S> {
    table: TableRef<'a, K, V, S>,
    scope: Option<Arc<ScopeFlag>>,
}

impl<'a, K, V, S> KeySet<'a, K, V, S> {
    pub(crate) fn new(table: TableRef<'a, K, V, S>, scope: Option<Arc<ScopeFlag>>) -> Self {
        Self { table, scope }
    }

    pub fn len(&self) -> usize {
        self.table.get().len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.get().is_empty()
    }

    pub fn iter(&self) -> Keys<'_, K, V> {
        self.table.get().keys()
    }

    pub fn contains<Q>(&self, q: &Q) -> bool
    where
        K: Eq + Hash + Borrow<Q>,
        Q: ?Sized + Hash + Eq,
        S: BuildHasher,
    {
        self.table.get().contains_key(q)
    }

    /// Remove `q`'s pair; `Ok(false)` when absent.
    pub fn remove<Q>(&mut self, q: &Q) -> Result<bool>
    where
        K: Eq + Hash + Borrow<Q>,
        Q: ?Sized + Hash + Eq,
        S: BuildHasher,
    {
        check_opt(&self.scope)?;
        Ok(self.table.get_mut()?.remove_entry(q).is_some())
    }

    pub fn retain<F: FnMut(&K) -> bool>(&mut self, mut f: F) -> Result<()> {
        check_opt(&self.scope)?;
        self.table.get_mut()?.retain(|k, _| f(k));
        Ok(())
    }

    pub fn clear(&mut self) -> Result<()> {
        check_opt(&self.scope)?;
        self.table.get_mut()?.clear();
        Ok(())
    }
}

impl<'v, 'a, K, V, S> IntoIterator for &'v KeySet<'a, K, V, S> {
    type Item = &'v K;
    type IntoIter = Keys<'v, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Values of a table. Membership and removal by value scan every pair.
pub struct ValuesView<'a, K, V, S> {
    table: TableRef<'a, K, V, S>,
    scope: Option<Arc<ScopeFlag>>,
}

impl<'a, K, V, S> ValuesView<'a, K, V, S> {
    pub(crate) fn new(table: TableRef<'a, K, V, S>, scope: Option<Arc<ScopeFlag>>) -> Self {
        Self { table, scope }
    }

    pub fn len(&self) -> usize {
        self.table.get().len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.get().is_empty()
    }

    pub fn iter(&self) -> Values<'_, K, V> {
        self.table.get().values()
    }

    /// Linear in the table size.
    pub fn contains(&self, value: &V) -> bool
    where
        V: PartialEq,
    {
        self.table.get().contains_value(value)
    }

    /// Remove the first pair, in traversal order, whose value equals `value`.
    pub fn remove(&mut self, value: &V) -> Result<bool>
    where
        V: PartialEq,
    {
        check_opt(&self.scope)?;
        let table = self.table.get_mut()?;
        let mut cursor = table.cursor();
        while let Ok((_, v)) = cursor.next() {
            if *v == *value {
                cursor.remove()?;
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Remove every pair whose value appears in `values`; returns how many
    /// pairs went. Each pair is compared against the whole slice, so the
    /// worst case is quadratic.
    pub fn remove_all(&mut self, values: &[V]) -> Result<usize>
    where
        V: PartialEq,
    {
        check_opt(&self.scope)?;
        let table = self.table.get_mut()?;
        let before = table.len();
        table.retain(|_, v| !values.contains(v));
        Ok(before - table.len())
    }

    pub fn retain<F: FnMut(&V) -> bool>(&mut self, mut f: F) -> Result<()> {
        check_opt(&self.scope)?;
        self.table.get_mut()?.retain(|_, v| f(v));
        Ok(())
    }
}

/// Key/value pairs of a table.
pub struct EntrySet<'a, K, V, S> {
    table: TableRef<'a, K, V, S>,
    scope: Option<Arc<ScopeFlag>>,
}

impl<'a, K, V, S> EntrySet<'a, K, V, S> {
    pub(crate) fn new(table: TableRef<'a, K, V, S>, scope: Option<Arc<ScopeFlag>>) -> Self {
        Self { table, scope }
    }

    pub fn len(&self) -> usize {
        self.table.get().len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.get().is_empty()
    }

    pub fn iter(&self) -> Iter<'_, K, V> {
        self.table.get().iter()
    }
}

impl<'a, K, V, S> EntrySet<'a, K, V, S>
where
    K: Eq + Hash,
    V: PartialEq,
    S: BuildHasher,
{
    /// True when `key` maps to a value equal to `value`.
    pub fn contains<Q>(&self, key: &Q, value: &V) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.table.get().get(key) == Some(value)
    }

    /// Remove `key` only when it currently maps to `value`.
    pub fn remove<Q>(&mut self, key: &Q, value: &V) -> Result<bool>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        check_opt(&self.scope)?;
        let table = self.table.get_mut()?;
        if table.get(key) != Some(value) {
            return Ok(false);
        }
        Ok(table.remove_entry(key).is_some())
    }
}

impl<K, V, S> SlotTable<K, V, S> {
    pub fn key_set(&self) -> KeySet<'_, K, V, S> {
        KeySet::new(TableRef::Shared(self), None)
    }

    pub fn key_set_mut(&mut self) -> KeySet<'_, K, V, S> {
        KeySet::new(TableRef::Exclusive(self), None)
    }

    pub fn values_view(&self) -> ValuesView<'_, K, V, S> {
        ValuesView::new(TableRef::Shared(self), None)
    }

    pub fn values_view_mut(&mut self) -> ValuesView<'_, K, V, S> {
        ValuesView::new(TableRef::Exclusive(self), None)
    }

    pub fn entry_set(&self) -> EntrySet<'_, K, V, S> {
        EntrySet::new(TableRef::Shared(self), None)
    }

    pub fn entry_set_mut(&mut self) -> EntrySet<'_, K, V, S> {
        EntrySet::new(TableRef::Exclusive(self), None)
    }
}
