use crate::shards_map::{ShardsMap, UpdateAction};
use crate::{Enumerable, EnumerableWithKey, Map, Nullable, SafeMap, Sizer};
use std::borrow::Borrow;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::atomic::{AtomicIsize, AtomicUsize, Ordering};
use std::sync::OnceLock;

/// A thread-safe hashmap without a global lock, with approximate size
/// bookkeeping.
///
/// Entries live in a sharded store where each shard synchronizes on its own,
/// so point operations on different keys rarely contend. Two atomic counters
/// sit on top of the store:
///
/// * `cached_size`, adjusted by removals and by `load_or_store` insertions;
/// * `pending_stores`, counting [`store`](Map::store) calls since the last
///   resynchronization, because a plain store cannot tell an insert from an
///   overwrite.
///
/// [`Sizer::size`] answers from `cached_size` while it is trustworthy and
/// rescans the store otherwise. Under concurrent mutation, and after stores
/// of new keys that do not yet outnumber the cached count, the answer may be
/// stale in either direction until the next rescan. [`Map::exact_size`]
/// always rescans; after it runs on a quiescent map, `size` is exact again.
///
/// Null values (see [`Nullable`]) are never stored.
///
/// # Examples
/// ```
/// use safemap::{Map, OptimisticMap, Sizer};
///
/// let map = OptimisticMap::<&str, Option<u32>>::new();
/// map.store("a", Some(1));
/// map.store("b", None); // ignored
/// assert!(!map.exist("b"));
/// assert_eq!(map.size(), 1);
/// ```
#[derive(Debug)]
pub struct OptimisticMap<K, V> {
    map: ShardsMap<K, V>,
    cached_size: AtomicIsize,
    pending_stores: AtomicUsize,
}

/// Returns the default number of shards to use for the `OptimisticMap`.
fn default_shard_amount() -> usize {
    static DEFAULT_SHARD_AMOUNT: OnceLock<usize> = OnceLock::new();
    *DEFAULT_SHARD_AMOUNT.get_or_init(|| {
        (std::thread::available_parallelism().map_or(1, usize::from) * 4).next_power_of_two()
    })
}

impl<K: Eq + Hash, V> Default for OptimisticMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Eq + Hash, V> OptimisticMap<K, V> {
    /// Creates a new `OptimisticMap` with the default number of shards.
    pub fn new() -> Self {
        Self::with_capacity_and_shard_amount(0, default_shard_amount())
    }

    /// Creates a new `OptimisticMap` with the specified initial capacity and the default number of shards.
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_capacity_and_shard_amount(capacity, default_shard_amount())
    }

    /// Creates a new `OptimisticMap` with the specified initial capacity and number of shards.
    ///
    /// # Arguments
    ///
    /// * `capacity` - The initial capacity of the hashmap.
    /// * `shard_amount` - The number of shards to create.
    pub fn with_capacity_and_shard_amount(capacity: usize, shard_amount: usize) -> Self {
        Self {
            map: ShardsMap::with_capacity_and_shard_amount(capacity, shard_amount),
            cached_size: AtomicIsize::new(0),
            pending_stores: AtomicUsize::new(0),
        }
    }

    /// Returns the number of shards entries are spread over.
    pub fn shard_amount(&self) -> usize {
        self.map.shard_amount()
    }

    /// Counts the entries and resets both counters to the result.
    ///
    /// Not excluded against concurrent mutators: entries changed during the
    /// scan may or may not be counted, and two racing rescans simply both
    /// write their result.
    fn resync(&self) -> usize {
        let count = self.map.len();
        self.pending_stores.store(0, Ordering::Release);
        self.cached_size.store(count as isize, Ordering::Release);
        log::trace!("optimistic map resynchronized, {count} entries");
        count
    }
}

impl<K: Eq + Hash, V> Sizer for OptimisticMap<K, V> {
    /// Returns the approximate number of entries.
    ///
    /// Rescans the store when the cached count is negative or when more
    /// stores happened since the last rescan than the cached count; otherwise
    /// returns the cached count as is. Must not back exactness-dependent
    /// logic such as capacity limits.
    fn size(&self) -> usize {
        let cached = self.cached_size.load(Ordering::Acquire);
        if cached < 0 || self.pending_stores.load(Ordering::Acquire) > cached as usize {
            return self.resync();
        }
        cached as usize
    }
}

impl<K, V> EnumerableWithKey<K, V> for OptimisticMap<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    fn each<F>(&self, mut func: F)
    where
        F: FnMut(&K, &V),
    {
        self.map.range(|k, v| {
            func(k, v);
            true
        });
    }
}

impl<K, V> Enumerable<V> for OptimisticMap<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    fn each_value<F>(&self, mut func: F)
    where
        F: FnMut(&V),
    {
        self.map.range(|_, v| {
            func(v);
            true
        });
    }
}

impl<K, V> Map<K, V> for OptimisticMap<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone + Nullable,
{
    /// Inserts or overwrites the value for `key`; a null `value` is ignored.
    fn store(&self, key: K, value: V) {
        if value.is_null() {
            return;
        }
        self.map.insert(key, value);
        self.pending_stores.fetch_add(1, Ordering::AcqRel);
    }

    fn load<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        self.map.get(key)
    }

    fn exist<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        self.map.contains_key(key)
    }

    fn delete<Q>(&self, key: &Q)
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        if self.map.remove(key).is_some() {
            self.cached_size.fetch_sub(1, Ordering::AcqRel);
        }
    }

    /// Deletes every key visible to a sweep, then zeroes both counters.
    ///
    /// Best effort: entries stored while the sweep runs may survive it, and
    /// the counters then under-report until the next rescan.
    fn delete_all(&self) {
        let mut removed = 0usize;
        self.map.range(|k, _| {
            if self.map.remove(k).is_some() {
                removed += 1;
            }
            true
        });
        self.cached_size.store(0, Ordering::Release);
        self.pending_stores.store(0, Ordering::Release);
        log::debug!("optimistic map cleared, {removed} entries removed");
    }

    /// Visits entries until `func` returns `false`.
    ///
    /// No lock is held while `func` runs, so it may call back into this map.
    /// Entries stored or deleted during the traversal may or may not be seen.
    fn range<F>(&self, func: F)
    where
        F: FnMut(&K, &V) -> bool,
    {
        self.map.range(func);
    }

    fn keys(&self) -> Vec<K> {
        let mut keys = Vec::with_capacity(self.size());
        self.each(|k, _| keys.push(k.clone()));
        keys
    }

    fn values(&self) -> Vec<V> {
        let mut values = Vec::with_capacity(self.size());
        self.each_value(|v| values.push(v.clone()));
        values
    }

    /// Counts the entries by scanning every shard, refreshing the cached size.
    fn exact_size(&self) -> usize {
        self.resync()
    }

    fn data(&self) -> HashMap<K, V> {
        let mut data = HashMap::with_capacity(self.size());
        self.each(|k, v| {
            data.insert(k.clone(), v.clone());
        });
        data
    }
}

impl<K, V> SafeMap<K, V> for OptimisticMap<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone + Nullable,
{
    /// Returns the existing value, or stores `value` if the key is absent.
    ///
    /// A null `value` is never stored and comes back as `(value, false)`.
    fn load_or_store(&self, key: K, value: V) -> (V, bool) {
        if value.is_null() {
            return (value, false);
        }
        let (actual, loaded) = self.map.update(key, |current| match current {
            Some(actual) => (UpdateAction::Keep, (actual.clone(), true)),
            None => (UpdateAction::Replace(value.clone()), (value, false)),
        });
        if !loaded {
            self.cached_size.fetch_add(1, Ordering::AcqRel);
        }
        (actual, loaded)
    }

    fn load_and_delete<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        let value = self.map.remove(key);
        if value.is_some() {
            self.cached_size.fetch_sub(1, Ordering::AcqRel);
        }
        value
    }
}
