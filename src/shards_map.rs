use crate::futex::RwLock;
use foldhash::fast::{FixedState, RandomState};
use std::borrow::Borrow;
use std::collections::HashMap;
use std::hash::{BuildHasher, Hash};

/// Represents the action to be taken on a value in the `ShardMap`.
pub enum UpdateAction<V> {
    /// Keep the current value (or absence) unchanged.
    Keep,
    /// Insert or overwrite with the provided new value.
    Replace(V),
}

/// A thread-safe hashmap shard.
///
/// This struct wraps a `HashMap` protected by a reader/writer lock: lookups
/// share the lock, mutations take it exclusively.
#[derive(Debug)]
pub struct ShardMap<K, V> {
    /// The underlying hashmap protected by a `RwLock`.
    map: RwLock<HashMap<K, V, RandomState>>,
}

impl<K, V> ShardMap<K, V>
where
    K: Eq + Hash,
{
    /// Creates a new `ShardMap` with the specified initial capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            map: RwLock::new(HashMap::with_capacity_and_hasher(
                capacity,
                RandomState::default(),
            )),
        }
    }

    pub fn len(&self) -> usize {
        self.map.read().len()
    }

    pub fn get<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
        V: Clone,
    {
        self.map.read().get(key).cloned()
    }

    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        self.map.read().contains_key(key)
    }

    pub fn insert(&self, key: K, value: V) -> Option<V> {
        self.map.write().insert(key, value)
    }

    pub fn remove<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        self.map.write().remove(key)
    }

    /// Updates the value associated with the given key using the provided function.
    ///
    /// The function runs under the shard's write lock, so the decision it makes
    /// is atomic with respect to every other operation on the same key.
    ///
    /// # Arguments
    ///
    /// * `key` - The key to update.
    /// * `func` - A function that takes an `Option<&V>` and returns a tuple containing the action to take and the result.
    ///
    /// # Returns
    ///
    /// The result returned by the provided function.
    pub fn update<F, R>(&self, key: K, func: F) -> R
    where
        F: FnOnce(Option<&V>) -> (UpdateAction<V>, R),
    {
        let mut map = self.map.write();
        let (action, ret) = func(map.get(&key));
        if let UpdateAction::Replace(value) = action {
            map.insert(key, value);
        }
        ret
    }

    /// Copies the shard's entries out under a read lock.
    pub fn snapshot(&self) -> Vec<(K, V)>
    where
        K: Clone,
        V: Clone,
    {
        self.map
            .read()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

/// A collection of `ShardMap` instances, providing sharded access to a hashmap.
///
/// Every key lives in exactly one shard, so single-key operations only contend
/// with operations on keys hashing to the same shard.
#[derive(Debug)]
pub struct ShardsMap<K, V> {
    /// The vector of `ShardMap` instances.
    shards: Vec<ShardMap<K, V>>,
}

impl<K, V> ShardsMap<K, V>
where
    K: Eq + Hash,
{
    /// Creates a new `ShardsMap` with the specified capacity and number of shards.
    ///
    /// # Arguments
    ///
    /// * `capacity` - The total initial capacity of the hashmap.
    /// * `shard_amount` - The number of shards to create, at least one.
    ///
    /// # Returns
    ///
    /// A new `ShardsMap` instance.
    pub fn with_capacity_and_shard_amount(capacity: usize, shard_amount: usize) -> Self {
        let shard_amount = shard_amount.max(1);
        let shard_capacity = capacity / shard_amount;
        Self {
            shards: (0..shard_amount)
                .map(|_| ShardMap::with_capacity(shard_capacity))
                .collect::<Vec<_>>(),
        }
    }

    pub fn shard_amount(&self) -> usize {
        self.shards.len()
    }

    /// Sums the shard lengths, locking one shard at a time.
    pub fn len(&self) -> usize {
        self.shards.iter().map(|s| s.len()).sum()
    }

    pub fn get<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
        V: Clone,
    {
        self.shard(key).get(key)
    }

    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        self.shard(key).contains_key(key)
    }

    pub fn insert(&self, key: K, value: V) -> Option<V> {
        self.shard(&key).insert(key, value)
    }

    pub fn remove<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        self.shard(key).remove(key)
    }

    /// Updates the value associated with the given key using the provided function.
    ///
    /// See [`ShardMap::update`].
    pub fn update<F, R>(&self, key: K, func: F) -> R
    where
        F: FnOnce(Option<&V>) -> (UpdateAction<V>, R),
    {
        self.shard(&key).update(key, func)
    }

    /// Visits entries shard by shard until `func` returns `false`.
    ///
    /// Each shard is snapshotted under its read lock and visited with no lock
    /// held, so `func` may freely mutate this map. Changes to shards not yet
    /// reached are observed, changes to shards already copied are not.
    pub fn range<F>(&self, mut func: F)
    where
        K: Clone,
        V: Clone,
        F: FnMut(&K, &V) -> bool,
    {
        for shard in &self.shards {
            for (k, v) in shard.snapshot() {
                if !func(&k, &v) {
                    return;
                }
            }
        }
    }

    #[inline(always)]
    fn shard<Q>(&self, key: &Q) -> &ShardMap<K, V>
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        let idx = FixedState::default().hash_one(key) as usize % self.shards.len();
        &self.shards[idx]
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[test]
    fn test_shards_map() {
        let shards_map = ShardsMap::<u32, u32>::with_capacity_and_shard_amount(256, 16);
        assert_eq!(shards_map.len(), 0);
        assert_eq!(shards_map.shard_amount(), 16);

        shards_map.update(1, |v| {
            assert_eq!(v, None);
            (UpdateAction::Replace(1), ())
        });
        assert_eq!(shards_map.len(), 1);
        shards_map.update(2, |v| {
            assert_eq!(v, None);
            (UpdateAction::Keep, ())
        });
        assert_eq!(shards_map.remove(&3), None);
        assert_eq!(shards_map.len(), 1);

        assert_eq!(shards_map.insert(1, 2), Some(1));
        shards_map.update(1, |v| {
            assert_eq!(v.copied(), Some(2));
            (UpdateAction::Keep, ())
        });
        assert_eq!(shards_map.get(&1), Some(2));
        assert!(shards_map.contains_key(&1));
        assert_eq!(shards_map.remove(&1), Some(2));
        assert_eq!(shards_map.len(), 0);
        assert_eq!(shards_map.remove(&1), None);
    }

    #[test]
    fn test_shards_map_borrowed_keys() {
        let shards_map = ShardsMap::<String, String>::with_capacity_and_shard_amount(256, 16);
        shards_map.insert("hello".to_string(), "world".to_string());
        assert_eq!(shards_map.get("hello").as_deref(), Some("world"));
        assert!(shards_map.contains_key("hello"));
        assert_eq!(shards_map.remove("hello").as_deref(), Some("world"));
        assert_eq!(shards_map.get("hello"), None);
    }

    #[test]
    fn test_shards_map_zero_shards() {
        let shards_map = ShardsMap::<u32, u32>::with_capacity_and_shard_amount(0, 0);
        assert_eq!(shards_map.shard_amount(), 1);
        shards_map.insert(1, 1);
        assert_eq!(shards_map.len(), 1);
    }

    #[test]
    fn test_shards_map_range_allows_mutation() {
        let shards_map = ShardsMap::<u32, u32>::with_capacity_and_shard_amount(256, 4);
        for i in 0..100 {
            shards_map.insert(i, i);
        }
        let mut visited = 0;
        shards_map.range(|k, _| {
            shards_map.remove(k);
            visited += 1;
            true
        });
        assert_eq!(visited, 100);
        assert_eq!(shards_map.len(), 0);

        for i in 0..100 {
            shards_map.insert(i, i);
        }
        let mut visited = 0;
        shards_map.range(|_, _| {
            visited += 1;
            visited < 10
        });
        assert_eq!(visited, 10);
    }

    #[test]
    fn test_shards_map_concurrent_update() {
        let shards_map = Arc::new(ShardsMap::<u32, usize>::with_capacity_and_shard_amount(
            256, 16,
        ));
        const N: usize = 1 << 12;
        const M: usize = 8;

        shards_map.insert(1, 0);

        let threads = (0..M)
            .map(|_| {
                let shards_map = shards_map.clone();
                std::thread::spawn(move || {
                    for _ in 0..N {
                        shards_map.update(1, |v| {
                            let next = v.copied().unwrap() + 1;
                            (UpdateAction::Replace(next), ())
                        });
                    }
                })
            })
            .collect::<Vec<_>>();
        threads.into_iter().for_each(|t| t.join().unwrap());

        assert_eq!(shards_map.get(&1), Some(N * M));
    }
}
