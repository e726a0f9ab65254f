#![cfg(test)]

// Property tests for SlotTable kept inside the crate so they can check the
// slot layout directly.

use crate::slot_table::SlotTable;
use crate::test_support::ConstBuildHasher;
use crate::TableConfig;
use core::hash::BuildHasher;
use proptest::prelude::*;
use proptest::test_runner::TestCaseError;
use std::collections::{BTreeSet, HashMap};
use std::fmt;

// Key newtype with Borrow<str> to exercise borrowed lookup.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
struct Key(String);
impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
impl std::borrow::Borrow<str> for Key {
    fn borrow(&self) -> &str {
        &self.0
    }
}

// Pool-indexed operations so shrinking moves toward earlier keys.
#[derive(Clone, Debug)]
enum Op {
    Insert(usize, i32),
    GetOrInsert(usize, i32),
    Remove(usize),
    Get(usize),
    Contains(String),
    Mutate(usize, i32),
    CursorRemoveEvery(usize),
    RetainAbove(i32),
    Clear,
    Iterate,
}

fn key_from(pool: &[String], i: usize) -> Key {
    Key(pool[i].clone())
}

fn arb_scenario() -> impl Strategy<Value = (Vec<String>, Vec<Op>)> {
    proptest::collection::vec("[a-z]{0,5}", 1..=12).prop_flat_map(|pool| {
        let idxs: Vec<usize> = (0..pool.len()).collect();
        let idx = proptest::sample::select(idxs);
        let contains_pool = proptest::sample::select(pool.clone());
        let op = prop_oneof![
            4 => (idx.clone(), any::<i32>()).prop_map(|(i, v)| Op::Insert(i, v)),
            2 => (idx.clone(), any::<i32>()).prop_map(|(i, v)| Op::GetOrInsert(i, v)),
            3 => idx.clone().prop_map(Op::Remove),
            2 => idx.clone().prop_map(Op::Get),
            1 => prop_oneof![contains_pool, "[a-z]{0,5}"].prop_map(Op::Contains),
            2 => (idx.clone(), any::<i32>()).prop_map(|(i, d)| Op::Mutate(i, d)),
            1 => (1usize..4).prop_map(Op::CursorRemoveEvery),
            1 => any::<i32>().prop_map(Op::RetainAbove),
            1 => Just(Op::Clear),
            1 => Just(Op::Iterate),
        ];
        proptest::collection::vec(op, 1..80).prop_map(move |ops| (pool.clone(), ops))
    })
}

fn run<S: BuildHasher>(
    mut sut: SlotTable<Key, i32, S>,
    pool: &[String],
    ops: Vec<Op>,
) -> Result<(), TestCaseError> {
    let mut model: HashMap<Key, i32> = HashMap::new();
    for op in ops {
        match op {
            Op::Insert(i, v) => {
                let k = key_from(pool, i);
                prop_assert_eq!(sut.insert(k.clone(), v), model.insert(k, v));
            }
            Op::GetOrInsert(i, v) => {
                let k = key_from(pool, i);
                let got = *sut.get_or_insert_with(k.clone(), || v);
                prop_assert_eq!(got, *model.entry(k).or_insert(v));
            }
            Op::Remove(i) => {
                let k = key_from(pool, i);
                prop_assert_eq!(sut.remove(&k), model.remove(&k));
                prop_assert!(!sut.contains_key(&k));
            }
            Op::Get(i) => {
                let k = key_from(pool, i);
                prop_assert_eq!(sut.get(&k), model.get(&k));
            }
            Op::Contains(s) => {
                let has_model = model.keys().any(|k| k.0 == s);
                prop_assert_eq!(sut.contains_key(s.as_str()), has_model);
            }
            Op::Mutate(i, d) => {
                let k = key_from(pool, i);
                if let Some(v) = sut.get_mut(&k) {
                    *v = v.saturating_add(d);
                }
                if let Some(v) = model.get_mut(&k) {
                    *v = v.saturating_add(d);
                }
            }
            Op::CursorRemoveEvery(n) => {
                let mut seen = BTreeSet::new();
                let mut cursor = sut.cursor();
                let mut step = 0usize;
                while let Ok((k, _)) = cursor.next() {
                    let k = k.clone();
                    prop_assert!(seen.insert(k.clone()), "cursor revisited {:?}", k);
                    step += 1;
                    if step % n == 0 {
                        let (rk, _) = cursor.remove().expect("remove after next");
                        prop_assert_eq!(&rk, &k);
                        model.remove(&rk);
                    }
                }
                drop(cursor);
                let visited_all = seen.len() == sut.len() + (step / n);
                prop_assert!(visited_all, "cursor skipped a pair");
            }
            Op::RetainAbove(t) => {
                sut.retain(|_, v| *v > t);
                model.retain(|_, v| *v > t);
            }
            Op::Clear => {
                let cap = sut.capacity();
                sut.clear();
                model.clear();
                prop_assert_eq!(sut.capacity(), cap);
            }
            Op::Iterate => {
                let s_keys: BTreeSet<_> = sut.keys().cloned().collect();
                let m_keys: BTreeSet<_> = model.keys().cloned().collect();
                prop_assert_eq!(s_keys, m_keys);
                prop_assert_eq!(sut.iter().len(), model.len());
            }
        }

        // Post-conditions after each op.
        sut.assert_consistent();
        prop_assert_eq!(sut.len(), model.len());
        prop_assert_eq!(sut.is_empty(), model.is_empty());
        prop_assert!(sut == model);
    }
    Ok(())
}

// Property: state-machine equivalence against std::collections::HashMap.
// Invariants exercised across random operation sequences:
// - insert/get/remove parity with the model, including returned old values.
// - Cursor removal visits every pair exactly once and removes exactly the
//   pair last returned.
// - Slot layout stays consistent: each pair sits in its hash slot, chains are
//   gap-free and never shorter than two, `occupied` matches the live count.
proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine((pool, ops) in arb_scenario()) {
        let sut: SlotTable<Key, i32> =
            SlotTable::with_capacity(2).expect("small capacity is valid");
        run(sut, &pool, ops)?;
    }
}

// Property: the same state machine when every key collides, so all pairs
// live in one chain and removal compaction is exercised on each step.
proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine_with_collisions((pool, ops) in arb_scenario()) {
        let sut = SlotTable::with_config_and_hasher(
            TableConfig::new().initial_capacity(4),
            ConstBuildHasher,
        )
        .expect("valid config");
        run(sut, &pool, ops)?;
    }
}

// Property: any load factor keeps `max_size` below capacity and lookups
// stable across every resize.
proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_resize_transparency(lf in 0.05f32..4.0, n in 0u32..300) {
        let mut sut: SlotTable<u32, u32> =
            SlotTable::with_config(TableConfig::new().initial_capacity(1).load_factor(lf))
                .expect("positive load factor");
        for k in 0..n {
            sut.insert(k, k ^ 0xA5A5);
            prop_assert!(sut.max_size() < sut.capacity());
        }
        sut.assert_consistent();
        for k in 0..n {
            prop_assert_eq!(sut.get(&k), Some(&(k ^ 0xA5A5)));
        }
    }
}
