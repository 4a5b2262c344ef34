//! Buckets: the bucket array, size counter and grow/shrink policy.
//!
//! This layer never hashes. Callers hand in the hash of a key and
//! `Buckets` decides where the entry lives; each entry keeps its hash so
//! that a rehash can redistribute without calling back into user code.

use core::mem;
use tracing::trace;

#[derive(Debug)]
pub(crate) struct Entry<K, V> {
    pub(crate) key: K,
    pub(crate) value: V,
    pub(crate) hash: u64,
}

/// Entries sharing one bucket index, in insertion order.
#[derive(Debug)]
pub(crate) struct Chain<K, V> {
    entries: Vec<Entry<K, V>>,
}

impl<K, V> Chain<K, V> {
    const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn get(&self, index: usize) -> Option<&Entry<K, V>> {
        self.entries.get(index)
    }

    pub(crate) fn get_mut(&mut self, index: usize) -> Option<&mut Entry<K, V>> {
        self.entries.get_mut(index)
    }

    pub(crate) fn iter_mut(&mut self) -> core::slice::IterMut<'_, Entry<K, V>> {
        self.entries.iter_mut()
    }

    pub(crate) fn into_entries(self) -> Vec<Entry<K, V>> {
        self.entries
    }

    fn position<F>(&self, hash: u64, mut is_match: F) -> Option<usize>
    where
        F: FnMut(&K) -> bool,
    {
        self.entries
            .iter()
            .position(|e| e.hash == hash && is_match(&e.key))
    }
}

/// A (bucket index, chain index) pair.
///
/// The past-the-end position is canonical: the last bucket, at that
/// bucket's chain length. Every way of running off the end lands there.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Position {
    pub(crate) bucket: usize,
    pub(crate) index: usize,
}

#[derive(Debug)]
pub(crate) struct Buckets<K, V> {
    chains: Vec<Chain<K, V>>,
    len: usize,
}

impl<K, V> Buckets<K, V> {
    pub(crate) fn new() -> Self {
        Self {
            chains: vec![Chain::new()],
            len: 0,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.len
    }

    pub(crate) fn bucket_count(&self) -> usize {
        self.chains.len()
    }

    pub(crate) fn chains_mut(&mut self) -> &mut [Chain<K, V>] {
        &mut self.chains
    }

    pub(crate) fn into_chains(self) -> Vec<Chain<K, V>> {
        self.chains
    }

    #[inline]
    fn index_for(hash: u64, bucket_count: usize) -> usize {
        (hash % bucket_count as u64) as usize
    }

    /// Finds the entry whose stored hash is `hash` and whose key satisfies
    /// `is_match`. Only the chain of `hash`'s bucket is scanned.
    pub(crate) fn locate<F>(&self, hash: u64, is_match: F) -> Option<Position>
    where
        F: FnMut(&K) -> bool,
    {
        let bucket = Self::index_for(hash, self.chains.len());
        self.chains[bucket]
            .position(hash, is_match)
            .map(|index| Position { bucket, index })
    }

    pub(crate) fn entry(&self, pos: Position) -> Option<&Entry<K, V>> {
        self.chains.get(pos.bucket)?.get(pos.index)
    }

    pub(crate) fn entry_mut(&mut self, pos: Position) -> Option<&mut Entry<K, V>> {
        self.chains.get_mut(pos.bucket)?.get_mut(pos.index)
    }

    /// Appends a new entry. The caller has checked that no live entry has an
    /// equal key. Returns where the entry ended up, after any growth.
    pub(crate) fn push(&mut self, entry: Entry<K, V>) -> Position {
        self.len += 1;
        if self.len > self.chains.len() {
            self.rehash(self.len * 2);
        }
        let bucket = Self::index_for(entry.hash, self.chains.len());
        let chain = &mut self.chains[bucket];
        chain.entries.push(entry);
        Position {
            bucket,
            index: chain.len() - 1,
        }
    }

    /// Unlinks the entry at `pos`, shrinking the bucket array if the load
    /// factor fell to a quarter or below.
    pub(crate) fn remove(&mut self, pos: Position) -> Entry<K, V> {
        let entry = self.chains[pos.bucket].entries.remove(pos.index);
        self.len -= 1;
        if self.len * 4 <= self.chains.len() {
            self.rehash(self.len * 2);
        }
        entry
    }

    pub(crate) fn clear(&mut self) {
        self.chains = vec![Chain::new()];
        self.len = 0;
    }

    /// Rebuilds the bucket array with `target` buckets (at least one) and
    /// redistributes every entry by its stored hash.
    ///
    /// The old array is moved out first, so redistribution walks a snapshot
    /// and never observes a half-built table.
    fn rehash(&mut self, target: usize) {
        let target = target.max(1);
        let from = self.chains.len();
        if target == from {
            return;
        }
        let mut fresh = Vec::with_capacity(target);
        fresh.resize_with(target, Chain::new);
        let old = mem::replace(&mut self.chains, fresh);
        for entry in old.into_iter().flat_map(Chain::into_entries) {
            let bucket = Self::index_for(entry.hash, target);
            self.chains[bucket].entries.push(entry);
        }
        trace!(from, to = target, len = self.len, "rehashed buckets");
    }

    pub(crate) fn end(&self) -> Position {
        let bucket = self.chains.len() - 1;
        Position {
            bucket,
            index: self.chains[bucket].len(),
        }
    }

    pub(crate) fn first(&self) -> Position {
        self.first_from(0)
    }

    /// First entry in bucket `start` or later, else the end position.
    fn first_from(&self, start: usize) -> Position {
        self.chains
            .iter()
            .enumerate()
            .skip(start)
            .find(|(_, c)| !c.is_empty())
            .map(|(bucket, _)| Position { bucket, index: 0 })
            .unwrap_or_else(|| self.end())
    }

    /// Steps one entry forward: within the chain if possible, else to the
    /// head of the next non-empty chain, else to the end position. The end
    /// position advances to itself.
    pub(crate) fn advance(&self, pos: Position) -> Position {
        let chain_len = self.chains[pos.bucket].len();
        if pos.index >= chain_len {
            return self.end();
        }
        if pos.index + 1 < chain_len {
            return Position {
                bucket: pos.bucket,
                index: pos.index + 1,
            };
        }
        self.first_from(pos.bucket + 1)
    }

    /// Panics if the structural invariants do not hold.
    #[cfg(test)]
    pub(crate) fn check_invariants(&self) {
        assert!(!self.chains.is_empty(), "bucket array must never be empty");
        let total: usize = self.chains.iter().map(Chain::len).sum();
        assert_eq!(total, self.len, "size counter drifted from chain lengths");
        for (bucket, chain) in self.chains.iter().enumerate() {
            for e in &chain.entries {
                assert_eq!(
                    Self::index_for(e.hash, self.chains.len()),
                    bucket,
                    "entry stored in the wrong bucket"
                );
            }
        }
    }
}
