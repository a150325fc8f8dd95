use crate::futex::RwLock;
use crate::{Enumerable, EnumerableWithKey, Map, SafeMap, Sizer};
use foldhash::fast::RandomState;
use std::borrow::Borrow;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::hash::Hash;

/// A thread-safe hashmap guarded by a single reader/writer lock.
///
/// Lookups and enumerations share the lock; every mutation takes it
/// exclusively. All operations are linearizable and [`Sizer::size`] is exact,
/// at the cost of serializing writers against each other and against readers.
///
/// # Examples
/// ```
/// use safemap::{Map, RwLockMap, SafeMap, Sizer};
///
/// let map = RwLockMap::<String, u32>::new();
/// map.store("a".into(), 1);
/// map.store("b".into(), 2);
/// assert_eq!(map.size(), 2);
///
/// assert_eq!(map.load_or_store("a".into(), 9), (1, true));
/// assert_eq!(map.load_and_delete("a"), Some(1));
/// assert!(!map.exist("a"));
/// ```
#[derive(Debug)]
pub struct RwLockMap<K, V> {
    map: RwLock<HashMap<K, V, RandomState>>,
}

impl<K: Eq + Hash, V> Default for RwLockMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Eq + Hash, V> RwLockMap<K, V> {
    /// Creates an empty `RwLockMap`.
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Creates an empty `RwLockMap` able to hold `capacity` entries without
    /// reallocating.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            map: RwLock::new(HashMap::with_capacity_and_hasher(
                capacity,
                RandomState::default(),
            )),
        }
    }

    /// Consumes the map and returns its storage without copying.
    pub fn into_inner(self) -> HashMap<K, V, RandomState> {
        self.map.into_inner()
    }
}

impl<K, V> Sizer for RwLockMap<K, V> {
    fn size(&self) -> usize {
        self.map.read().len()
    }
}

impl<K, V> EnumerableWithKey<K, V> for RwLockMap<K, V> {
    /// Calls `func` for every entry while holding the read lock.
    ///
    /// **Locking behaviour:** Deadlock if `func` writes to this map, or reads
    /// from it while another thread is waiting to write.
    fn each<F>(&self, mut func: F)
    where
        F: FnMut(&K, &V),
    {
        self.map.read().iter().for_each(|(k, v)| func(k, v));
    }
}

impl<K, V> Enumerable<V> for RwLockMap<K, V> {
    /// Calls `func` for every value while holding the read lock.
    ///
    /// **Locking behaviour:** same as [`EnumerableWithKey::each`].
    fn each_value<F>(&self, func: F)
    where
        F: FnMut(&V),
    {
        self.map.read().values().for_each(func);
    }
}

impl<K, V> Map<K, V> for RwLockMap<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    fn store(&self, key: K, value: V) {
        self.map.write().insert(key, value);
    }

    fn load<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        self.map.read().get(key).cloned()
    }

    fn exist<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        self.map.read().contains_key(key)
    }

    fn delete<Q>(&self, key: &Q)
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        self.map.write().remove(key);
    }

    fn delete_all(&self) {
        self.map.write().clear();
    }

    /// Visits entries while holding the read lock for the whole traversal, so
    /// no writer can interleave and the entries seen form one consistent state.
    ///
    /// **Locking behaviour:** Deadlock if `func` writes to this map, or reads
    /// from it while another thread is waiting to write.
    ///
    /// # Examples
    /// ```
    /// use safemap::{Map, RwLockMap};
    ///
    /// let map = RwLockMap::<u32, u32>::new();
    /// (0..10).for_each(|i| map.store(i, i));
    ///
    /// let mut seen = 0;
    /// map.range(|_, _| {
    ///     seen += 1;
    ///     seen < 3
    /// });
    /// assert_eq!(seen, 3);
    /// ```
    fn range<F>(&self, mut func: F)
    where
        F: FnMut(&K, &V) -> bool,
    {
        let map = self.map.read();
        for (k, v) in map.iter() {
            if !func(k, v) {
                break;
            }
        }
    }

    fn keys(&self) -> Vec<K> {
        self.map.read().keys().cloned().collect()
    }

    fn values(&self) -> Vec<V> {
        self.map.read().values().cloned().collect()
    }

    fn exact_size(&self) -> usize {
        self.size()
    }

    fn data(&self) -> HashMap<K, V> {
        let map = self.map.read();
        let mut data = HashMap::with_capacity(map.len());
        data.extend(map.iter().map(|(k, v)| (k.clone(), v.clone())));
        data
    }
}

impl<K, V> SafeMap<K, V> for RwLockMap<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    fn load_or_store(&self, key: K, value: V) -> (V, bool) {
        match self.map.write().entry(key) {
            Entry::Occupied(entry) => (entry.get().clone(), true),
            Entry::Vacant(entry) => {
                entry.insert(value.clone());
                (value, false)
            }
        }
    }

    fn load_and_delete<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        self.map.write().remove(key)
    }
}
