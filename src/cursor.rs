//! Cursor that tolerates removal of the pair it last returned.

use crate::error::{Result, TableError};
use crate::scope::{check_opt, ScopeFlag};
use crate::slot::Slot;
use crate::slot_table::{Location, SlotTable};
use std::sync::Arc;

/// Walks a table in traversal order.
///
/// `remove` unlinks the most recently returned pair. Inside a chain the
/// last live pair is moved into the hole, so the cursor steps back onto that
/// cell and still visits the moved pair exactly once.
pub struct Cursor<'a, K, V, S> {
    table: &'a mut SlotTable<K, V, S>,
    scope: Option<Arc<ScopeFlag>>,
    visited: usize,
    position: usize,
    chain_pos: usize,
    last: Option<Location>,
}

impl<'a, K, V, S> Cursor<'a, K, V, S> {
    pub(crate) fn new(table: &'a mut SlotTable<K, V, S>, scope: Option<Arc<ScopeFlag>>) -> Self {
        Self {
            table,
            scope,
            visited: 0,
            position: 0,
            chain_pos: 0,
            last: None,
        }
    }

    pub fn has_next(&self) -> bool {
        self.visited < self.table.occupied
    }

    /// Pairs not yet returned.
    pub fn remaining(&self) -> usize {
        self.table.occupied - self.visited
    }

    /// Advance to the next pair. Fails with `Exhausted` once every pair has
    /// been returned.
    pub fn next(&mut self) -> Result<(&K, &mut V)> {
        check_opt(&self.scope)?;
        if !self.has_next() {
            return Err(TableError::Exhausted);
        }
        let loc = loop {
            match &self.table.slots[self.position] {
                Slot::Empty => self.step_slot(),
                Slot::Pair(_) => {
                    let loc = Location::Primary(self.position);
                    self.step_slot();
                    break loc;
                }
                Slot::Chained(chain) => {
                    if self.chain_pos < chain.len() {
                        let loc = Location::Chain(self.position, self.chain_pos);
                        self.chain_pos += 1;
                        break loc;
                    }
                    self.step_slot();
                }
            }
        };
        self.visited += 1;
        self.last = Some(loc);
        let b = self.table.bucket_at_mut(loc);
        Ok((&b.key, &mut b.value))
    }

    /// Remove the pair returned by the last `next`. Fails with
    /// `InvalidIteratorState` when there is none or it was already removed.
    pub fn remove(&mut self) -> Result<(K, V)> {
        check_opt(&self.scope)?;
        let loc = self.last.take().ok_or(TableError::InvalidIteratorState)?;
        let removed = self.table.remove_at(loc);
        self.visited -= 1;
        if let Location::Chain(p, i) = loc {
            match &self.table.slots[p] {
                // The last live pair now sits in cell i and is unvisited.
                Slot::Chained(_) => {
                    self.position = p;
                    self.chain_pos = i;
                }
                // Collapsed: the survivor was cell 1 (unvisited) only when
                // cell 0 was removed.
                Slot::Pair(_) if i == 0 => {
                    self.position = p;
                    self.chain_pos = 0;
                }
                _ => {
                    self.position = p + 1;
                    self.chain_pos = 0;
                }
            }
        }
        Ok((removed.key, removed.value))
    }

    fn step_slot(&mut self) {
        self.position += 1;
        self.chain_pos = 0;
    }
}
