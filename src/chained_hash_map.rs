//! ChainedHashMap: public API over `Buckets`, hashing with a pluggable
//! `HashStrategy` and guarding user-code callbacks against reentrancy.

use crate::buckets::{Buckets, Entry, Position};
use crate::cursor::{Cursor, CursorMut};
use crate::error::MapError;
use crate::hash_strategy::{DefaultHashBuilder, HashStrategy};
use crate::iter::{IntoIter, Iter, IterMut, Keys, Values, ValuesMut};
use crate::reentrancy::DebugReentrancy;
use core::borrow::Borrow;
use core::fmt;
use core::ops::Index;
use tracing::debug;

/// A map from unique keys to values, stored in a bucket array of
/// collision chains.
///
/// `insert` never overwrites: the first value stored under a key stays
/// until the key is removed. Iteration visits buckets in index order and
/// each chain in insertion order.
pub struct ChainedHashMap<K, V, S = DefaultHashBuilder> {
    hasher: S,
    pub(crate) buckets: Buckets<K, V>,
    reentrancy: DebugReentrancy,
}

impl<K, V> ChainedHashMap<K, V> {
    /// Empty map with one bucket and the default hash strategy.
    pub fn new() -> Self {
        Self::with_hasher(DefaultHashBuilder::default())
    }
}

impl<K, V> Default for ChainedHashMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, S> ChainedHashMap<K, V, S> {
    /// Empty map with one bucket that hashes keys with `hasher`.
    pub fn with_hasher(hasher: S) -> Self {
        Self {
            hasher,
            buckets: Buckets::new(),
            reentrancy: DebugReentrancy::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.len() == 0
    }

    /// The configured hash strategy.
    pub fn hasher(&self) -> &S {
        &self.hasher
    }

    /// Current length of the bucket array; always at least 1.
    pub fn bucket_count(&self) -> usize {
        self.buckets.bucket_count()
    }

    /// `len() / bucket_count()`.
    pub fn load_factor(&self) -> f64 {
        self.len() as f64 / self.bucket_count() as f64
    }

    /// Drops every entry and resets to a single empty bucket.
    pub fn clear(&mut self) {
        debug!(len = self.len(), "clearing map");
        self.buckets.clear();
    }

    /// Read-only cursor at the first entry, or at `end()` when empty.
    pub fn begin(&self) -> Cursor<'_, K, V, S> {
        Cursor::new(self, self.buckets.first())
    }

    /// Read-only past-the-end cursor.
    pub fn end(&self) -> Cursor<'_, K, V, S> {
        Cursor::new(self, self.buckets.end())
    }

    /// Mutable cursor at the first entry, or past-the-end when empty.
    pub fn begin_mut(&mut self) -> CursorMut<'_, K, V, S> {
        let pos = self.buckets.first();
        CursorMut::new(self, pos)
    }

    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter::new(&self.buckets)
    }

    pub fn iter_mut(&mut self) -> IterMut<'_, K, V> {
        IterMut::new(&mut self.buckets)
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

    fn locate<Q>(&self, q: &Q) -> Option<Position>
    where
        K: Borrow<Q>,
        Q: ?Sized + Eq,
        S: HashStrategy<Q>,
    {
        let hash = self.hasher.hash_key(q);
        self.buckets.locate(hash, |k| k.borrow() == q)
    }

    /// Cursor at the entry for `q`, or `end()` if there is none.
    pub fn find<Q>(&self, q: &Q) -> Cursor<'_, K, V, S>
    where
        K: Borrow<Q>,
        Q: ?Sized + Eq,
        S: HashStrategy<Q>,
    {
        let pos = {
            let _g = self.reentrancy.enter("find");
            self.locate(q).unwrap_or_else(|| self.buckets.end())
        };
        Cursor::new(self, pos)
    }

    /// Mutable cursor at the entry for `q`, or past-the-end if there is none.
    pub fn find_mut<Q>(&mut self, q: &Q) -> CursorMut<'_, K, V, S>
    where
        K: Borrow<Q>,
        Q: ?Sized + Eq,
        S: HashStrategy<Q>,
    {
        let pos = {
            let _g = self.reentrancy.enter("find_mut");
            self.locate(q).unwrap_or_else(|| self.buckets.end())
        };
        CursorMut::new(self, pos)
    }

    pub fn contains_key<Q>(&self, q: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Eq,
        S: HashStrategy<Q>,
    {
        let _g = self.reentrancy.enter("contains_key");
        self.locate(q).is_some()
    }

    pub fn get<Q>(&self, q: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Eq,
        S: HashStrategy<Q>,
    {
        let _g = self.reentrancy.enter("get");
        let pos = self.locate(q)?;
        self.buckets.entry(pos).map(|e| &e.value)
    }

    pub fn get_mut<Q>(&mut self, q: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Eq,
        S: HashStrategy<Q>,
    {
        let pos = {
            let _g = self.reentrancy.enter("get_mut");
            self.locate(q)?
        };
        self.buckets.entry_mut(pos).map(|e| &mut e.value)
    }

    /// Value stored under `q`. Never inserts.
    ///
    /// # Errors
    /// `MapError::KeyNotFound` when no entry has a key equal to `q`.
    pub fn at<Q>(&self, q: &Q) -> Result<&V, MapError>
    where
        K: Borrow<Q>,
        Q: ?Sized + Eq,
        S: HashStrategy<Q>,
    {
        let _g = self.reentrancy.enter("at");
        self.locate(q)
            .and_then(|pos| self.buckets.entry(pos))
            .map(|e| &e.value)
            .ok_or(MapError::KeyNotFound)
    }

    /// Removes the entry for `q` and returns its value; `None` (and no
    /// change) when the key is absent. May shrink the bucket array.
    pub fn remove<Q>(&mut self, q: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Eq,
        S: HashStrategy<Q>,
    {
        self.remove_entry(q).map(|(_, v)| v)
    }

    /// Like `remove`, also handing back the stored key.
    pub fn remove_entry<Q>(&mut self, q: &Q) -> Option<(K, V)>
    where
        K: Borrow<Q>,
        Q: ?Sized + Eq,
        S: HashStrategy<Q>,
    {
        let pos = {
            let _g = self.reentrancy.enter("remove");
            self.locate(q)?
        };
        // Unlinked before returning, so K/V drops see a consistent map.
        let Entry { key, value, .. } = self.buckets.remove(pos);
        Some((key, value))
    }
}

impl<K, V, S> ChainedHashMap<K, V, S>
where
    K: Eq,
    S: HashStrategy<K>,
{
    /// Builds a map from `iter` in order; a key seen again keeps its first
    /// value.
    pub fn from_iter_with_hasher<I>(iter: I, hasher: S) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
    {
        let mut m = Self::with_hasher(hasher);
        m.extend(iter);
        m
    }

    /// Inserts `key -> value` unless an entry with an equal key exists, in
    /// which case nothing changes and `value` is dropped. Returns whether a
    /// new entry was created. May grow the bucket array.
    pub fn insert(&mut self, key: K, value: V) -> bool {
        let hash = {
            let _g = self.reentrancy.enter("insert");
            let hash = self.hasher.hash_key(&key);
            if self.buckets.locate(hash, |k| *k == key).is_some() {
                return false;
            }
            hash
        };
        self.buckets.push(Entry { key, value, hash });
        true
    }

    /// Mutable access to the value for `key`, inserting `V::default()`
    /// first if the key is absent.
    pub fn get_or_insert_default(&mut self, key: K) -> &mut V
    where
        V: Default,
    {
        self.get_or_insert_with(key, V::default)
    }

    /// Mutable access to the value for `key`, inserting `default()` first
    /// if the key is absent. `default` only runs on insertion.
    pub fn get_or_insert_with<F>(&mut self, key: K, default: F) -> &mut V
    where
        F: FnOnce() -> V,
    {
        let (hash, found) = {
            let _g = self.reentrancy.enter("get_or_insert");
            let hash = self.hasher.hash_key(&key);
            (hash, self.buckets.locate(hash, |k| *k == key))
        };
        let pos = match found {
            Some(pos) => pos,
            None => self.buckets.push(Entry {
                key,
                value: default(),
                hash,
            }),
        };
        &mut self
            .buckets
            .entry_mut(pos)
            .expect("position must refer to a live entry")
            .value
    }
}

impl<K, Q, V, S> Index<&Q> for ChainedHashMap<K, V, S>
where
    K: Borrow<Q>,
    Q: ?Sized + Eq,
    S: HashStrategy<Q>,
{
    type Output = V;

    /// # Panics
    /// If the key is absent. Use `at` for a fallible lookup.
    fn index(&self, q: &Q) -> &V {
        match self.at(q) {
            Ok(v) => v,
            Err(e) => panic!("{e}"),
        }
    }
}

impl<K, V, S> Clone for ChainedHashMap<K, V, S>
where
    K: Eq + Clone,
    V: Clone,
    S: HashStrategy<K> + Clone,
{
    /// Deep copy by re-inserting every entry into a fresh one-bucket map,
    /// so the clone's bucket layout may differ from the source's.
    fn clone(&self) -> Self {
        Self::from_iter_with_hasher(
            self.iter().map(|(k, v)| (k.clone(), v.clone())),
            self.hasher.clone(),
        )
    }

    fn clone_from(&mut self, source: &Self) {
        self.clear();
        self.hasher = source.hasher.clone();
        self.extend(source.iter().map(|(k, v)| (k.clone(), v.clone())));
    }
}

impl<K, V, S> FromIterator<(K, V)> for ChainedHashMap<K, V, S>
where
    K: Eq,
    S: HashStrategy<K> + Default,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self::from_iter_with_hasher(iter, S::default())
    }
}

impl<K, V, const N: usize> From<[(K, V); N]> for ChainedHashMap<K, V>
where
    K: Eq + core::hash::Hash,
{
    fn from(pairs: [(K, V); N]) -> Self {
        Self::from_iter(pairs)
    }
}

impl<K, V, S> Extend<(K, V)> for ChainedHashMap<K, V, S>
where
    K: Eq,
    S: HashStrategy<K>,
{
    /// Inserts in iteration order with first-writer-wins semantics.
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (k, v) in iter {
            self.insert(k, v);
        }
    }
}

impl<K, V, S> PartialEq for ChainedHashMap<K, V, S>
where
    K: Eq,
    V: PartialEq,
    S: HashStrategy<K>,
{
    /// Equal key/value sets; bucket layout is not compared.
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().all(|(k, v)| other.get(k) == Some(v))
    }
}

impl<K, V, S> Eq for ChainedHashMap<K, V, S>
where
    K: Eq,
    V: Eq,
    S: HashStrategy<K>,
{
}

impl<K, V, S> fmt::Debug for ChainedHashMap<K, V, S>
where
    K: fmt::Debug,
    V: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<'a, K, V, S> IntoIterator for &'a ChainedHashMap<K, V, S> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, K, V, S> IntoIterator for &'a mut ChainedHashMap<K, V, S> {
    type Item = (&'a K, &'a mut V);
    type IntoIter = IterMut<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}

impl<K, V, S> IntoIterator for ChainedHashMap<K, V, S> {
    type Item = (K, V);
    type IntoIter = IntoIter<K, V>;

    fn into_iter(self) -> Self::IntoIter {
        IntoIter::new(self.buckets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash_strategy::FnHash;
    use std::cell::Cell;
    use std::collections::BTreeSet;

    type IdentityHash = FnHash<fn(&u64) -> u64>;

    fn identity(k: &u64) -> u64 {
        *k
    }

    fn constant_hash(_: &String) -> u64 {
        0
    }

    fn identity_map<V>() -> ChainedHashMap<u64, V, IdentityHash> {
        ChainedHashMap::with_hasher(FnHash::new(identity as fn(&u64) -> u64))
    }

    /// Invariant: a later insert of an existing key leaves the first value.
    #[test]
    fn first_writer_wins() {
        let mut m: ChainedHashMap<String, i32> = ChainedHashMap::new();
        assert!(m.insert("k".to_string(), 1));
        assert!(!m.insert("k".to_string(), 2));
        assert_eq!(m.len(), 1);
        assert_eq!(m.get("k"), Some(&1));
    }

    /// Invariant: borrowed lookup works (store `String`, query with `&str`).
    #[test]
    fn borrowed_lookup_with_str() {
        let mut m: ChainedHashMap<String, i32> = ChainedHashMap::new();
        m.insert("hello".to_string(), 1);
        assert!(m.contains_key("hello"));
        assert!(!m.contains_key("world"));
        assert_eq!(m.find("hello").value(), Some(&1));
        assert!(m.find("world").is_end());
        assert_eq!(m["hello"], 1);
    }

    /// Scenario: three inserts from a one-bucket start grow the table and
    /// every key stays reachable.
    #[test]
    fn three_inserts_grow_and_stay_findable() {
        let mut m: ChainedHashMap<i32, &str> = ChainedHashMap::new();
        assert_eq!(m.bucket_count(), 1);
        m.insert(1, "a");
        m.insert(2, "b");
        m.insert(3, "c");
        assert_eq!(m.len(), 3);
        assert!(m.bucket_count() >= m.len());
        assert_eq!(m.find(&2).value(), Some(&"b"));
    }

    /// Invariant: growth fires when len exceeds the bucket count and the
    /// load factor never exceeds 1 after an insert returns.
    #[test]
    fn load_factor_stays_at_most_one() {
        let mut m = identity_map();
        for k in 0..500u64 {
            m.insert(k, ());
            assert!(m.load_factor() <= 1.0, "load factor {}", m.load_factor());
        }
    }

    /// Invariant: remove returns the stored value and makes find yield end.
    #[test]
    fn remove_then_find_is_end() {
        let mut m: ChainedHashMap<u32, String> = ChainedHashMap::new();
        m.insert(7, "seven".to_string());
        assert_eq!(m.remove(&7), Some("seven".to_string()));
        assert!(m.find(&7).is_end());
        assert_eq!(m.find(&7), m.end());
        assert_eq!(m.remove(&7), None);
        assert!(m.is_empty());
    }

    /// Scenario: insert 1..=100 then remove in the same order.
    #[test]
    fn insert_then_remove_all_shrinks_to_one_bucket() {
        let mut m: ChainedHashMap<u32, u32> = ChainedHashMap::new();
        for k in 1..=100 {
            m.insert(k, k);
        }
        let peak = m.bucket_count();
        assert!(peak >= 100);
        for k in 1..=100 {
            assert_eq!(m.remove(&k), Some(k));
            m.buckets.check_invariants();
        }
        assert!(m.is_empty());
        assert_eq!(m.bucket_count(), 1);
    }

    /// Invariant: indexing an absent key inserts exactly one default entry.
    #[test]
    fn get_or_insert_default_inserts_once() {
        let mut m: ChainedHashMap<&str, Vec<i32>> = ChainedHashMap::new();
        m.get_or_insert_default("xs").push(1);
        assert_eq!(m.len(), 1);
        m.get_or_insert_default("xs").push(2);
        assert_eq!(m.len(), 1);
        assert_eq!(m.at(&"xs"), Ok(&vec![1, 2]));
    }

    /// Invariant: the returned reference points at the new entry even when
    /// the insertion grew the bucket array.
    #[test]
    fn get_or_insert_default_survives_growth() {
        let mut m = identity_map::<u64>();
        for k in 0..40u64 {
            let before = m.bucket_count();
            *m.get_or_insert_default(k) = k + 100;
            if m.bucket_count() != before {
                assert_eq!(m.get(&k), Some(&(k + 100)));
            }
        }
        for k in 0..40u64 {
            assert_eq!(m[&k], k + 100);
        }
    }

    #[test]
    fn get_or_insert_with_is_lazy() {
        let mut m: ChainedHashMap<&str, i32> = ChainedHashMap::new();
        let calls = Cell::new(0);
        *m.get_or_insert_with("k", || {
            calls.set(calls.get() + 1);
            5
        }) += 1;
        let v = *m.get_or_insert_with("k", || {
            calls.set(calls.get() + 1);
            99
        });
        assert_eq!(v, 6);
        assert_eq!(calls.get(), 1, "default must not run for a present key");
    }

    /// Invariant: `at` fails on absence and never inserts.
    #[test]
    fn at_reports_key_not_found_without_inserting() {
        let mut m: ChainedHashMap<i32, i32> = ChainedHashMap::new();
        assert_eq!(m.at(&1), Err(MapError::KeyNotFound));
        assert_eq!(m.len(), 0);
        m.insert(1, 10);
        assert_eq!(m.at(&1), Ok(&10));
        assert_eq!(m.len(), 1);
    }

    #[test]
    #[should_panic(expected = "key not found")]
    fn index_panics_on_absent_key() {
        let m: ChainedHashMap<i32, i32> = ChainedHashMap::new();
        let _ = m[&3];
    }

    /// Invariant: iteration order is bucket order then chain order.
    #[test]
    fn iteration_follows_bucket_then_chain_order() {
        let mut m = identity_map();
        for k in [1u64, 2, 3, 4, 12] {
            m.insert(k, k * 10);
        }
        assert_eq!(m.bucket_count(), 10);
        let keys: Vec<u64> = m.keys().copied().collect();
        assert_eq!(keys, vec![1, 2, 12, 3, 4]);
        let values: Vec<u64> = m.values().copied().collect();
        assert_eq!(values, vec![10, 20, 120, 30, 40]);
    }

    /// Invariant: all keys colliding in one bucket stay distinguishable.
    #[test]
    fn collisions_resolve_by_equality() {
        let mut m: ChainedHashMap<String, i32, FnHash<fn(&String) -> u64>> =
            ChainedHashMap::with_hasher(FnHash::new(constant_hash as fn(&String) -> u64));
        for (i, k) in ["a", "b", "c", "d"].into_iter().enumerate() {
            m.insert(k.to_string(), i as i32);
        }
        assert_eq!(m.len(), 4);
        assert_eq!(m.bucket_count(), 4);
        assert_eq!(m.get(&"c".to_string()), Some(&2));
        assert_eq!(m.remove(&"b".to_string()), Some(1));
        assert_eq!(m.get(&"d".to_string()), Some(&3));
        assert!(m.find(&"b".to_string()).is_end());
        m.buckets.check_invariants();
    }

    /// Invariant: clear drops everything and resets to one bucket.
    #[test]
    fn clear_resets() {
        let mut m: ChainedHashMap<i32, i32> = (0..50).map(|i| (i, i)).collect();
        assert!(m.bucket_count() > 1);
        m.clear();
        assert!(m.is_empty());
        assert_eq!(m.bucket_count(), 1);
        assert_eq!(m.begin(), m.end());
        m.insert(1, 1);
        assert_eq!(m.len(), 1);
    }

    /// Scenario: building from a list with a repeated key keeps the first.
    #[test]
    fn from_array_first_occurrence_wins() {
        let m = ChainedHashMap::from([(1, 1), (1, 2)]);
        assert_eq!(m.len(), 1);
        assert_eq!(m.at(&1), Ok(&1));
    }

    /// Invariant: a clone is an independent deep copy with equal entries.
    #[test]
    fn clone_is_independent() {
        let a: ChainedHashMap<String, i32> = [("x", 1), ("y", 2), ("z", 3)]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect();
        let mut b = a.clone();
        assert_eq!(a, b);
        *b.get_mut("x").unwrap() = 100;
        b.remove("y");
        b.insert("w".to_string(), 4);
        assert_eq!(a.get("x"), Some(&1));
        assert_eq!(a.get("y"), Some(&2));
        assert!(!a.contains_key("w"));
        assert_ne!(a, b);
    }

    #[test]
    fn clone_from_replaces_contents() {
        let a: ChainedHashMap<i32, i32> = (0..10).map(|i| (i, i * i)).collect();
        let mut b: ChainedHashMap<i32, i32> = (100..200).map(|i| (i, i)).collect();
        b.clone_from(&a);
        assert_eq!(a, b);
        let keys: BTreeSet<i32> = b.keys().copied().collect();
        assert_eq!(keys, (0..10).collect());
    }

    #[test]
    fn debug_renders_as_map() {
        let mut m = identity_map();
        m.insert(2u64, "b");
        m.insert(1u64, "a");
        assert_eq!(format!("{:?}", m), r#"{1: "a", 2: "b"}"#);
    }

    #[test]
    fn owned_into_iter_yields_every_pair() {
        let m: ChainedHashMap<i32, i32> = (0..20).map(|i| (i, -i)).collect();
        let mut pairs: Vec<(i32, i32)> = m.into_iter().collect();
        pairs.sort_unstable();
        assert_eq!(pairs, (0..20).map(|i| (i, -i)).collect::<Vec<_>>());
    }

    /// Invariant (debug-only): re-entering the map from `K: Eq` during a
    /// probe panics due to the reentrancy guard.
    #[cfg(debug_assertions)]
    #[test]
    fn reentrancy_panics_from_eq_during_find() {
        struct ReentryKey {
            id: u64,
            map: *const ChainedHashMap<ReentryKey, i32, FnHash<fn(&ReentryKey) -> u64>>,
        }
        impl PartialEq for ReentryKey {
            fn eq(&self, other: &Self) -> bool {
                if !other.map.is_null() {
                    // Attempt to re-enter the same map during probing.
                    unsafe {
                        let m = &*other.map;
                        let _ = m.len();
                        let _ = m.contains_key(self);
                    }
                }
                self.id == other.id
            }
        }
        impl Eq for ReentryKey {}

        fn zero(_: &ReentryKey) -> u64 {
            0
        }
        let mut m: ChainedHashMap<ReentryKey, i32, FnHash<fn(&ReentryKey) -> u64>> =
            ChainedHashMap::with_hasher(FnHash::new(zero as fn(&ReentryKey) -> u64));
        m.insert(
            ReentryKey {
                id: 1,
                map: core::ptr::null(),
            },
            1,
        );
        let query = ReentryKey {
            id: 2,
            map: &m as *const _,
        };
        let res = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _ = m.find(&query);
        }));
        assert!(res.is_err(), "expected reentrancy to panic in debug builds");
    }
}
