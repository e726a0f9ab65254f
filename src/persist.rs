//! Persisted form of a table.
//!
//! A table persists as one sequence: the pair count, the load factor, then
//! every `(key, value)` pair in traversal order. Decoding sizes the table
//! from the header up front, capped at twice the declared count, and rejects
//! a body whose pair count disagrees with the header.

use crate::config::TableConfig;
use crate::error::{Result, TableError};
use crate::slot_table::SlotTable;
use core::fmt;
use core::hash::{BuildHasher, Hash};
use core::marker::PhantomData;
use serde::de::{self, Deserialize, Deserializer, SeqAccess, Visitor};
use serde::ser::{Serialize, SerializeSeq, Serializer};
use std::io::{Read, Write};

/// Upper bound on pairs pre-sized from an untrusted header when the format
/// gives no length hint.
const PRESIZE_LIMIT: usize = 1 << 16;

impl<K, V, S> Serialize for SlotTable<K, V, S>
where
    K: Serialize,
    V: Serialize,
{
    fn serialize<Ser>(&self, serializer: Ser) -> core::result::Result<Ser::Ok, Ser::Error>
    where
        Ser: Serializer,
    {
        let mut seq = serializer.serialize_seq(Some(self.len() + 2))?;
        seq.serialize_element(&self.len())?;
        seq.serialize_element(&self.load_factor())?;
        for pair in self.iter() {
            seq.serialize_element(&pair)?;
        }
        seq.end()
    }
}

impl<'de, K, V, S> Deserialize<'de> for SlotTable<K, V, S>
where
    K: Deserialize<'de> + Eq + Hash,
    V: Deserialize<'de>,
    S: BuildHasher + Default,
{
    fn deserialize<D>(deserializer: D) -> core::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_seq(TableVisitor(PhantomData))
    }
}

struct TableVisitor<K, V, S>(PhantomData<fn() -> (K, V, S)>);

impl<'de, K, V, S> Visitor<'de> for TableVisitor<K, V, S>
where
    K: Deserialize<'de> + Eq + Hash,
    V: Deserialize<'de>,
    S: BuildHasher + Default,
{
    type Value = SlotTable<K, V, S>;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a sequence of pair count, load factor and key/value pairs")
    }

    fn visit_seq<A>(self, mut seq: A) -> core::result::Result<Self::Value, A::Error>
    where
        A: SeqAccess<'de>,
    {
        let declared: usize = seq
            .next_element()?
            .ok_or_else(|| de::Error::invalid_length(0, &self))?;
        let load_factor: f32 = seq
            .next_element()?
            .ok_or_else(|| de::Error::invalid_length(1, &self))?;

        let hinted = seq.size_hint().map(|n| n.saturating_sub(2));
        let presize = declared.min(hinted.unwrap_or(PRESIZE_LIMIT));
        let config = TableConfig::for_persisted(presize, load_factor).map_err(de::Error::custom)?;
        let mut table = SlotTable::with_config_and_hasher(config, S::default())
            .map_err(de::Error::custom)?;

        let mut actual = 0usize;
        while let Some((k, v)) = seq.next_element::<(K, V)>()? {
            table.insert(k, v);
            actual += 1;
        }
        check_count(declared, actual, table.len()).map_err(de::Error::custom)?;
        Ok(table)
    }
}

/// Both the body length and the distinct key count must match the header.
fn check_count(declared: usize, actual: usize, distinct: usize) -> Result<()> {
    if actual != declared {
        return Err(TableError::CorruptPersistedForm { declared, actual });
    }
    if distinct != declared {
        return Err(TableError::CorruptPersistedForm {
            declared,
            actual: distinct,
        });
    }
    Ok(())
}

impl<K, V, S> SlotTable<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher + Default,
{
    /// Rebuild a table from its persisted parts, sized for `declared` pairs
    /// at `load_factor`.
    pub fn from_persisted<I>(declared: usize, load_factor: f32, pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
    {
        let config = TableConfig::for_persisted(declared, load_factor)?;
        let mut table = Self::with_config_and_hasher(config, S::default())?;
        let mut actual = 0usize;
        for (k, v) in pairs {
            table.insert(k, v);
            actual += 1;
        }
        check_count(declared, actual, table.len())?;
        Ok(table)
    }
}

/// Header and body decoded without building a table, so a count mismatch
/// surfaces as a typed error rather than a codec message.
struct RawForm<K, V> {
    declared: usize,
    load_factor: f32,
    pairs: Vec<(K, V)>,
}

impl<'de, K, V> Deserialize<'de> for RawForm<K, V>
where
    K: Deserialize<'de>,
    V: Deserialize<'de>,
{
    fn deserialize<D>(deserializer: D) -> core::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct RawVisitor<K, V>(PhantomData<fn() -> (K, V)>);

        impl<'de, K, V> Visitor<'de> for RawVisitor<K, V>
        where
            K: Deserialize<'de>,
            V: Deserialize<'de>,
        {
            type Value = RawForm<K, V>;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a persisted slot table")
            }

            fn visit_seq<A>(self, mut seq: A) -> core::result::Result<Self::Value, A::Error>
            where
                A: SeqAccess<'de>,
            {
                let declared: usize = seq
                    .next_element()?
                    .ok_or_else(|| de::Error::invalid_length(0, &self))?;
                let load_factor: f32 = seq
                    .next_element()?
                    .ok_or_else(|| de::Error::invalid_length(1, &self))?;
                let mut pairs = Vec::with_capacity(declared.min(PRESIZE_LIMIT));
                while let Some(pair) = seq.next_element::<(K, V)>()? {
                    pairs.push(pair);
                }
                Ok(RawForm {
                    declared,
                    load_factor,
                    pairs,
                })
            }
        }

        deserializer.deserialize_seq(RawVisitor(PhantomData))
    }
}

/// Write `table` to `writer` with bincode.
pub fn write_to<W, K, V, S>(writer: W, table: &SlotTable<K, V, S>) -> Result<()>
where
    W: Write,
    K: serde::Serialize,
    V: serde::Serialize,
{
    bincode::serialize_into(writer, table)?;
    Ok(())
}

/// Read a table written by [`write_to`].
pub fn read_from<R, K, V, S>(reader: R) -> Result<SlotTable<K, V, S>>
where
    R: Read,
    K: serde::de::DeserializeOwned + Eq + Hash,
    V: serde::de::DeserializeOwned,
    S: BuildHasher + Default,
{
    let raw: RawForm<K, V> = bincode::deserialize_from(reader)?;
    log::debug!(
        "read persisted slot table: {} pairs declared, {} present",
        raw.declared,
        raw.pairs.len()
    );
    if raw.pairs.len() != raw.declared {
        return Err(TableError::CorruptPersistedForm {
            declared: raw.declared,
            actual: raw.pairs.len(),
        });
    }
    SlotTable::from_persisted(raw.declared, raw.load_factor, raw.pairs)
}
