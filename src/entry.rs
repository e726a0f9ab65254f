//! Detached entry handles.
//!
//! A handle remembers a key plus the identity and generation of the table it
//! came from. It stays usable while that table keeps the key and has not
//! been cleared since.

use crate::error::{Result, TableError};
use crate::slot_table::SlotTable;
use core::borrow::Borrow;
use core::hash::{BuildHasher, Hash};

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct EntryHandle<K> {
    key: K,
    table_id: u64,
    generation: u64,
}

impl<K> EntryHandle<K> {
    pub fn key(&self) -> &K {
        &self.key
    }

    fn check_owner<V, S>(&self, table: &SlotTable<K, V, S>) -> Result<()> {
        if table.id() != self.table_id {
            return Err(TableError::WrongTable);
        }
        if table.generation() != self.generation {
            return Err(TableError::StaleEntry);
        }
        Ok(())
    }
}

impl<K: Eq + Hash> EntryHandle<K> {
    pub fn value<'t, V, S: BuildHasher>(&self, table: &'t SlotTable<K, V, S>) -> Result<&'t V> {
        self.check_owner(table)?;
        table.get(&self.key).ok_or(TableError::StaleEntry)
    }

    pub fn value_mut<'t, V, S: BuildHasher>(
        &self,
        table: &'t mut SlotTable<K, V, S>,
    ) -> Result<&'t mut V> {
        self.check_owner(table)?;
        table.get_mut(&self.key).ok_or(TableError::StaleEntry)
    }

    /// Overwrite the entry's value; returns the previous one.
    pub fn set_value<V, S: BuildHasher>(&self, table: &mut SlotTable<K, V, S>, value: V) -> Result<V> {
        let slot = self.value_mut(table)?;
        Ok(core::mem::replace(slot, value))
    }

    /// Whether `table` still holds this entry.
    pub fn is_live<V, S: BuildHasher>(&self, table: &SlotTable<K, V, S>) -> bool {
        self.value(table).is_ok()
    }
}

impl<K, V, S> SlotTable<K, V, S>
where
    K: Eq + Hash + Clone,
    S: BuildHasher,
{
    /// Detached handle to `q`'s entry, if present.
    pub fn handle<Q>(&self, q: &Q) -> Option<EntryHandle<K>>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let (k, _) = self.get_key_value(q)?;
        Some(self.handle_for(k))
    }

    /// Handles to every entry, in traversal order.
    pub fn handles(&self) -> Vec<EntryHandle<K>> {
        self.keys().map(|k| self.handle_for(k)).collect()
    }

    fn handle_for(&self, k: &K) -> EntryHandle<K> {
        EntryHandle {
            key: k.clone(),
            table_id: self.id(),
            generation: self.generation(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> SlotTable<String, u32> {
        let mut t = SlotTable::new();
        t.insert("x".to_string(), 1);
        t.insert("y".to_string(), 2);
        t
    }

    #[test]
    fn handle_reads_and_writes_through() {
        let mut t = table();
        let h = t.handle("x").unwrap();
        assert_eq!(h.key(), "x");
        assert_eq!(h.value(&t).unwrap(), &1);
        assert_eq!(h.set_value(&mut t, 10).unwrap(), 1);
        *h.value_mut(&mut t).unwrap() += 1;
        assert_eq!(t.get("x"), Some(&11));
        assert!(t.handle("missing").is_none());
    }

    #[test]
    fn handle_from_another_table_is_rejected() {
        let t = table();
        let other = t.clone();
        let h = t.handle("x").unwrap();
        assert!(matches!(h.value(&other), Err(TableError::WrongTable)));
    }

    #[test]
    fn handle_goes_stale_on_remove_and_clear() {
        let mut t = table();
        let hx = t.handle("x").unwrap();
        let hy = t.handle("y").unwrap();
        t.remove("x");
        assert!(matches!(hx.value(&t), Err(TableError::StaleEntry)));
        assert!(hy.is_live(&t));
        t.clear();
        t.insert("y".to_string(), 5);
        // Same key again, but the clear bumped the generation.
        assert!(matches!(hy.set_value(&mut t, 6), Err(TableError::StaleEntry)));
        assert_eq!(t.get("y"), Some(&5));
    }

    #[test]
    fn handles_cover_every_entry() {
        let t = table();
        let hs = t.handles();
        assert_eq!(hs.len(), 2);
        let sum: u32 = hs.iter().map(|h| *h.value(&t).unwrap()).sum();
        assert_eq!(sum, 3);
    }
}
