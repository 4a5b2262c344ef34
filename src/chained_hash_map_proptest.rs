#![cfg(test)]

// Property tests for ChainedHashMap kept inside the crate so they can check
// the bucket structure directly.

use crate::hash_strategy::FnHash;
use crate::{ChainedHashMap, MapError};
use proptest::prelude::*;
use std::collections::{BTreeMap, HashMap};

// Pool-indexed operations to improve shrinking: indices shrink to earlier keys,
// pool length shrinks, and op lists shrink in length.
#[derive(Clone, Debug)]
enum OpI {
    Insert(usize, i32),
    Remove(usize),
    Find(usize),
    At(usize),
    IndexDefault(usize, i32),
    Mutate(usize, i32),
    Clear,
    Iterate,
}

fn arb_scenario() -> impl Strategy<Value = (Vec<String>, Vec<OpI>)> {
    proptest::collection::vec("[a-z]{0,4}", 1..=12).prop_flat_map(|pool| {
        let idx = 0..pool.len();
        let op = prop_oneof![
            6 => (idx.clone(), any::<i32>()).prop_map(|(i, v)| OpI::Insert(i, v)),
            4 => idx.clone().prop_map(OpI::Remove),
            2 => idx.clone().prop_map(OpI::Find),
            2 => idx.clone().prop_map(OpI::At),
            2 => (idx.clone(), any::<i32>()).prop_map(|(i, v)| OpI::IndexDefault(i, v)),
            2 => (idx.clone(), any::<i32>()).prop_map(|(i, d)| OpI::Mutate(i, d)),
            1 => Just(OpI::Clear),
            1 => Just(OpI::Iterate),
        ];
        proptest::collection::vec(op, 1..80).prop_map(move |ops| (pool.clone(), ops))
    })
}

// Property: state-machine equivalence against std::collections::HashMap with
// first-writer-wins inserts.
// Invariants exercised across random operation sequences:
// - Inserting an existing key never overwrites; `insert` reports whether it inserted.
// - `find`/`at`/`get` agree with the model; `at` fails exactly on absent keys.
// - `get_or_insert_default` inserts exactly one entry on absence.
// - Full iteration yields each live entry exactly once and its count equals `len`.
// - After every op: bucket_count >= 1, len == sum of chain lengths, and each
//   entry sits in the bucket its stored hash selects.
proptest! {
    #![proptest_config(ProptestConfig { cases: 128, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine((pool, ops) in arb_scenario()) {
        let mut sut: ChainedHashMap<String, i32> = ChainedHashMap::new();
        let mut model: HashMap<String, i32> = HashMap::new();

        for op in ops {
            match op {
                OpI::Insert(i, v) => {
                    let k = pool[i].clone();
                    let fresh = !model.contains_key(&k);
                    prop_assert_eq!(sut.insert(k.clone(), v), fresh);
                    model.entry(k).or_insert(v);
                }
                OpI::Remove(i) => {
                    let k = &pool[i];
                    prop_assert_eq!(sut.remove(k.as_str()), model.remove(k));
                    prop_assert!(sut.find(k.as_str()).is_end());
                }
                OpI::Find(i) => {
                    let k = &pool[i];
                    let c = sut.find(k.as_str());
                    prop_assert_eq!(c.value(), model.get(k));
                    prop_assert_eq!(c.is_end(), !model.contains_key(k));
                    if let Some(found) = c.key() {
                        prop_assert_eq!(found, k);
                    }
                }
                OpI::At(i) => {
                    let k = &pool[i];
                    let len = sut.len();
                    match model.get(k) {
                        Some(v) => prop_assert_eq!(sut.at(k.as_str()), Ok::<_, MapError>(v)),
                        None => prop_assert_eq!(sut.at(k.as_str()), Err(MapError::KeyNotFound)),
                    }
                    prop_assert_eq!(sut.len(), len, "at must never insert");
                }
                OpI::IndexDefault(i, v) => {
                    let k = pool[i].clone();
                    let before = sut.len();
                    let existed = model.contains_key(&k);
                    let got = sut.get_or_insert_default(k.clone());
                    *got = got.wrapping_add(v);
                    let slot = model.entry(k).or_default();
                    *slot = slot.wrapping_add(v);
                    prop_assert_eq!(sut.len(), before + usize::from(!existed));
                }
                OpI::Mutate(i, d) => {
                    let k = &pool[i];
                    if let Some(v) = sut.get_mut(k.as_str()) {
                        *v = v.wrapping_add(d);
                    }
                    if let Some(v) = model.get_mut(k) {
                        *v = v.wrapping_add(d);
                    }
                }
                OpI::Clear => {
                    sut.clear();
                    model.clear();
                    prop_assert_eq!(sut.bucket_count(), 1);
                }
                OpI::Iterate => {
                    let seen: BTreeMap<String, i32> =
                        sut.iter().map(|(k, v)| (k.clone(), *v)).collect();
                    let expected: BTreeMap<String, i32> =
                        model.iter().map(|(k, v)| (k.clone(), *v)).collect();
                    prop_assert_eq!(seen, expected);
                }
            }

            sut.buckets.check_invariants();
            prop_assert_eq!(sut.len(), model.len());
            prop_assert_eq!(sut.is_empty(), model.is_empty());
            prop_assert_eq!(sut.iter().count(), sut.len());
            prop_assert!(sut.bucket_count() >= 1);
        }
    }
}

// Property: the grow/shrink thresholds hold after every mutation regardless
// of key distribution. A deliberately weak hash (key mod 7) piles entries
// into few chains without affecting the policy, which only looks at len.
proptest! {
    #[test]
    fn prop_load_factor_bounds(ops in proptest::collection::vec((any::<bool>(), 0u64..64), 1..200)) {
        let mut m: ChainedHashMap<u64, (), FnHash<fn(&u64) -> u64>> =
            ChainedHashMap::with_hasher(FnHash::new(mod_seven as fn(&u64) -> u64));
        for (insert, k) in ops {
            if insert {
                m.insert(k, ());
                // Growth keeps len <= bucket_count.
                prop_assert!(m.len() <= m.bucket_count());
            } else if m.remove(&k).is_some() {
                // Shrink leaves the load above a quarter, except at the
                // one-bucket floor.
                prop_assert!(m.len() * 4 > m.bucket_count() || m.bucket_count() == 1);
            }
            m.buckets.check_invariants();
        }
    }
}

fn mod_seven(k: &u64) -> u64 {
    k % 7
}

// Property: clones are deep and independent, and compare equal to their
// source by key/value content.
proptest! {
    #[test]
    fn prop_clone_independence(
        entries in proptest::collection::vec((0u16..500, any::<i64>()), 0..100),
        extra in 500u16..1000,
    ) {
        let a: ChainedHashMap<u16, i64> = entries.iter().copied().collect();
        let mut b = a.clone();
        prop_assert!(a == b);
        prop_assert_eq!(a.len(), b.len());
        for (k, v) in a.iter() {
            prop_assert_eq!(b.get(k), Some(v));
        }

        b.insert(extra, 0);
        if let Some(&(k, _)) = entries.first() {
            b.remove(&k);
        }
        let rebuilt: ChainedHashMap<u16, i64> = entries.iter().copied().collect();
        prop_assert!(a == rebuilt, "mutating the clone must not touch the source");
        prop_assert!(!a.contains_key(&extra));
    }
}
