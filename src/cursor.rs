//! Cursors: explicit (bucket, chain index) positions into a
//! `ChainedHashMap`.
//!
//! A cursor either points at a live entry or is past-the-end. Every way of
//! running off the end produces the same canonical end position, so a
//! cursor advanced past the last entry compares equal to `map.end()`.
//!
//! Cursors borrow the map. Any structural mutation may relocate every
//! entry, and the borrow checker rejects holding a cursor across one.

use crate::buckets::Position;
use crate::chained_hash_map::ChainedHashMap;
use core::fmt;

/// Read-only cursor.
///
/// Two cursors are equal iff they belong to the same map instance and sit
/// at the same bucket and chain index.
pub struct Cursor<'a, K, V, S> {
    map: &'a ChainedHashMap<K, V, S>,
    pos: Position,
}

impl<'a, K, V, S> Cursor<'a, K, V, S> {
    pub(crate) fn new(map: &'a ChainedHashMap<K, V, S>, pos: Position) -> Self {
        Self { map, pos }
    }

    pub fn is_end(&self) -> bool {
        self.map.buckets.entry(self.pos).is_none()
    }

    /// Bucket the cursor sits in. For the end cursor this is the last bucket.
    pub fn bucket(&self) -> usize {
        self.pos.bucket
    }

    pub fn key(&self) -> Option<&'a K> {
        self.get().map(|(k, _)| k)
    }

    pub fn value(&self) -> Option<&'a V> {
        self.get().map(|(_, v)| v)
    }

    /// The entry under the cursor; `None` at the end.
    pub fn get(&self) -> Option<(&'a K, &'a V)> {
        self.map
            .buckets
            .entry(self.pos)
            .map(|e| (&e.key, &e.value))
    }

    /// Steps to the next entry in bucket-then-chain order. The end cursor
    /// stays at the end.
    pub fn move_next(&mut self) {
        self.pos = self.map.buckets.advance(self.pos);
    }
}

impl<K, V, S> Clone for Cursor<'_, K, V, S> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<K, V, S> Copy for Cursor<'_, K, V, S> {}

impl<K, V, S> PartialEq for Cursor<'_, K, V, S> {
    fn eq(&self, other: &Self) -> bool {
        core::ptr::eq(self.map, other.map) && self.pos == other.pos
    }
}

impl<K, V, S> Eq for Cursor<'_, K, V, S> {}

impl<K, V, S> fmt::Debug for Cursor<'_, K, V, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cursor")
            .field("bucket", &self.pos.bucket)
            .field("index", &self.pos.index)
            .field("end", &self.is_end())
            .finish()
    }
}

/// Mutable cursor: like `Cursor`, with write access to values.
///
/// Keys stay immutable. Converts one way into a `Cursor` via `From`.
pub struct CursorMut<'a, K, V, S> {
    map: &'a mut ChainedHashMap<K, V, S>,
    pos: Position,
}

impl<'a, K, V, S> CursorMut<'a, K, V, S> {
    pub(crate) fn new(map: &'a mut ChainedHashMap<K, V, S>, pos: Position) -> Self {
        Self { map, pos }
    }

    pub fn is_end(&self) -> bool {
        self.map.buckets.entry(self.pos).is_none()
    }

    pub fn bucket(&self) -> usize {
        self.pos.bucket
    }

    pub fn key(&self) -> Option<&K> {
        self.map.buckets.entry(self.pos).map(|e| &e.key)
    }

    pub fn value(&self) -> Option<&V> {
        self.map.buckets.entry(self.pos).map(|e| &e.value)
    }

    pub fn value_mut(&mut self) -> Option<&mut V> {
        self.map.buckets.entry_mut(self.pos).map(|e| &mut e.value)
    }

    /// The entry under the cursor with a mutable value; `None` at the end.
    pub fn get_mut(&mut self) -> Option<(&K, &mut V)> {
        self.map
            .buckets
            .entry_mut(self.pos)
            .map(|e| (&e.key, &mut e.value))
    }

    /// Consumes the cursor, keeping the value borrow for the map's lifetime.
    pub fn into_value_mut(self) -> Option<&'a mut V> {
        self.map.buckets.entry_mut(self.pos).map(|e| &mut e.value)
    }

    pub fn move_next(&mut self) {
        self.pos = self.map.buckets.advance(self.pos);
    }

    /// Read-only view at the same position, borrowing this cursor.
    pub fn as_cursor(&self) -> Cursor<'_, K, V, S> {
        Cursor::new(&*self.map, self.pos)
    }
}

impl<'a, K, V, S> From<CursorMut<'a, K, V, S>> for Cursor<'a, K, V, S> {
    fn from(c: CursorMut<'a, K, V, S>) -> Self {
        let CursorMut { map, pos } = c;
        Cursor::new(map, pos)
    }
}

impl<K, V, S> fmt::Debug for CursorMut<'_, K, V, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CursorMut")
            .field("bucket", &self.pos.bucket)
            .field("index", &self.pos.index)
            .field("end", &self.is_end())
            .finish()
    }
}
