//! chained-hashmap: a single-threaded associative container backed by a
//! resizable array of collision chains (separate chaining).
//!
//! Internal Design:
//!
//! Summary
//! - Goal: amortized O(1) insert/lookup/remove with a layout simple enough
//!   that a bucket-then-chain traversal can be expressed as a small cursor.
//! - Layers:
//!   - `Buckets<K, V>`: the bucket array, the size counter and the
//!     grow/shrink policy. Knows nothing about hashing.
//!   - `ChainedHashMap<K, V, S>`: public API. Hashes keys with the
//!     configured `HashStrategy`, guards entry points against reentrancy
//!     and delegates structure changes to `Buckets`.
//!   - `Cursor` / `CursorMut`: (bucket index, chain index, map identity)
//!     positions; the standard iterators reuse the same advance logic.
//!
//! Constraints
//! - Single-threaded: no locking or atomics. The map is `Send` when its
//!   contents are, so callers can wrap it in a mutex or hand it to another
//!   thread, but it is never `Sync`.
//! - `bucket_count() >= 1` at all times and `len()` equals the sum of the
//!   chain lengths.
//! - Unique keys. `insert` is first-writer-wins: an existing value is
//!   never overwritten.
//!
//! Rehashing
//! - Grow when `len > bucket_count` after an insert; target `len * 2`.
//! - Shrink when `len * 4 <= bucket_count` after a removal; target
//!   `max(len * 2, 1)`. A rehash to the current bucket count is skipped.
//! - The asymmetric thresholds keep alternating insert/remove at a
//!   boundary from rehashing every time.
//! - Each entry stores the hash computed at insertion. Rehashing
//!   redistributes with the stored hash and never calls back into the
//!   `HashStrategy`.
//!
//! Cursor and iterator invalidation
//! - Any structural mutation may move every entry. Cursors and iterators
//!   borrow the map, so the borrow checker rejects using one across an
//!   `insert`, `remove` or `clear`.
//!
//! Reentrancy policy
//! - Entry points that run user code (`HashStrategy::hash_key`, `K: Eq`)
//!   take a debug-only guard. Re-entering the same map from that user code
//!   panics in debug builds and is a no-op in release builds.

mod buckets;
mod chained_hash_map;
mod chained_hash_map_proptest;
pub mod cursor;
mod error;
pub mod hash_strategy;
pub mod iter;
mod reentrancy;

// Public surface
pub use chained_hash_map::ChainedHashMap;
pub use cursor::{Cursor, CursorMut};
pub use error::MapError;
pub use hash_strategy::{DefaultHashBuilder, FnHash, HashStrategy};
