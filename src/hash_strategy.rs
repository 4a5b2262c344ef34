//! Pluggable hashing for `ChainedHashMap`.

use core::fmt;
use core::hash::{BuildHasher, Hash};

/// Strategy used when no hasher is given explicitly.
pub use hashbrown::hash_map::DefaultHashBuilder;

/// Maps a key to the integer its bucket is derived from.
///
/// Keys that compare equal must hash equally. The map does not verify
/// this; a strategy that breaks it makes lookups miss entries but leaves
/// the bucket structure consistent.
pub trait HashStrategy<Q: ?Sized> {
    fn hash_key(&self, key: &Q) -> u64;
}

impl<Q, B> HashStrategy<Q> for B
where
    Q: ?Sized + Hash,
    B: BuildHasher,
{
    #[inline]
    fn hash_key(&self, key: &Q) -> u64 {
        self.hash_one(key)
    }
}

/// Adapts a plain function or closure `Fn(&Q) -> u64` into a `HashStrategy`.
///
/// ```
/// use chained_hashmap::{ChainedHashMap, FnHash};
///
/// let mut m = ChainedHashMap::with_hasher(FnHash::new(|k: &u64| *k));
/// m.insert(7u64, "seven");
/// assert_eq!(m.at(&7).unwrap(), &"seven");
/// ```
#[derive(Clone, Copy, Default)]
pub struct FnHash<F>(F);

impl<F> FnHash<F> {
    pub const fn new(f: F) -> Self {
        FnHash(f)
    }

    pub fn into_inner(self) -> F {
        self.0
    }
}

impl<Q, F> HashStrategy<Q> for FnHash<F>
where
    Q: ?Sized,
    F: Fn(&Q) -> u64,
{
    #[inline]
    fn hash_key(&self, key: &Q) -> u64 {
        (self.0)(key)
    }
}

impl<F> fmt::Debug for FnHash<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FnHash(..)")
    }
}
