//! slot-table: a hash table that stores pairs inline in one flat slot
//! array, resolves collisions with small per-slot overflow chains, and
//! exposes removal-tolerant cursors, batched parallel traversal and a
//! reader/writer-lock wrapper whose views cannot outlive their section.
//!
//! Internal Design:
//!
//! Summary
//! - Goal: keep every pair in a single allocation-friendly array with no
//!   per-entry boxing, and layer traversal and locking on top without
//!   weakening the array's layout invariants.
//! - Layers:
//!   - `slot`: the tagged slot (`Empty`, `Pair`, `Chained`) and the overflow
//!     chain with its swap-remove compaction.
//!   - `SlotTable<K, V, S>`: hashing, placement, growth and lookup over the
//!     slot array. Cursors, iterators, views and entry handles read and
//!     mutate it through crate-private locations.
//!   - Batch partitioning: splits the logical cell array into sections that
//!     together cover every pair exactly once; rayon drives them in parallel.
//!   - `ConcurrentTable<K, V, S>`: one table behind a `parking_lot::RwLock`,
//!     accessed only through closures that receive a scoped view.
//!
//! Constraints
//! - Each bucket caches its spread hash; growth re-places pairs from the
//!   cached value and never calls `K: Hash` again.
//! - `max_size < capacity`, so at least one primary slot is always free.
//! - Chains are gap-free, never empty and never hold a single pair; removal
//!   moves the chain's last pair into the hole.
//! - Scoped views borrow the locked table for the closure's duration. Anything
//!   detached from a view carries the section's liveness flag, which is
//!   cleared before the lock is released, on return or on unwind.
//!
//! Identity and staleness
//! - Every table gets a process-unique id; `clear()` bumps a generation
//!   counter. `EntryHandle` captures both and rejects use against another
//!   table (`WrongTable`) or after a clear or removal (`StaleEntry`).
//!
//! Notes and non-goals
//! - No null-key sentinel: a caller that needs an absent key uses
//!   `Option<K>` as the key type.
//! - Value membership (`contains_value`, value-view removal) is a linear scan;
//!   `ValuesView::remove_all` is quadratic in the worst case.
//! - The library installs no logger; it emits through the `log` facade.

mod batch;
mod config;
mod cursor;
mod entry;
mod error;
mod guard;
mod iter;
pub mod persist;
mod scope;
mod slot;
mod slot_table;
mod slot_table_proptest;
#[cfg(test)]
mod test_support;
pub mod traversal;
mod views;

// Public surface
pub use batch::section_bounds;
pub use config::{
    TableConfig, DEFAULT_INITIAL_CAPACITY, DEFAULT_LOAD_FACTOR, MAX_CAPACITY, MIN_LOAD_FACTOR,
};
pub use cursor::Cursor;
pub use entry::EntryHandle;
pub use error::{Result, TableError};
pub use guard::{ConcurrentTable, ReadView, ScopedAccess, ScopedEntry, WriteView};
pub use iter::{IntoIter, Iter, IterMut, Keys, Values, ValuesMut};
pub use scope::ScopeFlag;
pub use slot_table::SlotTable;
pub use traversal::{RandomAccess, Strategy, Traversable};
pub use views::{EntrySet, KeySet, ValuesView};
