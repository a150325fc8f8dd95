use std::borrow::Borrow;
use std::collections::HashMap;
use std::hash::Hash;
use std::rc::Rc;
use std::sync::Arc;

/// Anything that can report how many elements it holds.
pub trait Sizer {
    /// Returns the number of elements.
    ///
    /// For [`OptimisticMap`](crate::OptimisticMap) this is an approximation
    /// under concurrent mutation; see [`Map::exact_size`].
    fn size(&self) -> usize;
}

/// Read-only enumeration over values, the capability generic conversion
/// helpers depend on.
pub trait Enumerable<V>: Sizer {
    /// Calls `func` once for every value.
    fn each_value<F>(&self, func: F)
    where
        F: FnMut(&V);
}

/// Read-only enumeration over key-value pairs.
pub trait EnumerableWithKey<K, V>: Sizer {
    /// Calls `func` once for every entry.
    fn each<F>(&self, func: F)
    where
        F: FnMut(&K, &V);
}

/// The operations every concurrent map supports.
///
/// All methods take `&self`; implementations synchronize internally, so a map
/// is shared between threads with a plain `Arc`. Absence is never an error:
/// lookups return `Option`, removals of missing keys do nothing.
///
/// # Examples
/// ```
/// use safemap::{Map, OptimisticMap, RwLockMap, Sizer};
///
/// fn fill<M: Map<String, u32>>(map: &M) {
///     map.store("a".to_string(), 1);
///     map.store("b".to_string(), 2);
/// }
///
/// let locked = RwLockMap::new();
/// let optimistic = OptimisticMap::new();
/// fill(&locked);
/// fill(&optimistic);
/// assert_eq!(locked.size(), 2);
/// assert_eq!(optimistic.load("a"), Some(1));
/// ```
pub trait Map<K, V>: EnumerableWithKey<K, V> {
    /// Inserts or overwrites the value for `key`.
    ///
    /// A concurrent reader observes either the previous value or the new one.
    fn store(&self, key: K, value: V);

    /// Returns a copy of the value for `key`, if present.
    fn load<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized;

    /// Returns the value for `key`, or `V::default()` when absent.
    fn get<Q>(&self, key: &Q) -> V
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
        V: Default,
    {
        self.load(key).unwrap_or_default()
    }

    /// Reports whether `key` currently has a value.
    fn exist<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized;

    /// Removes `key` if present.
    fn delete<Q>(&self, key: &Q)
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized;

    /// Removes every entry.
    fn delete_all(&self);

    /// Visits entries in unspecified order until `func` returns `false`.
    ///
    /// Whether mutations made concurrently with the traversal are observed
    /// depends on the implementation.
    fn range<F>(&self, func: F)
    where
        F: FnMut(&K, &V) -> bool;

    /// Returns the keys present at the time of the call, each at most once.
    fn keys(&self) -> Vec<K>;

    /// Returns the values present at the time of the call, one per key.
    fn values(&self) -> Vec<V>;

    /// Returns the exact number of entries, scanning storage if needed.
    ///
    /// Unlike [`Sizer::size`], this never answers from cached bookkeeping.
    fn exact_size(&self) -> usize;

    /// Returns an independent copy of all entries.
    fn data(&self) -> HashMap<K, V>;
}

/// A [`Map`] with atomic compound operations.
pub trait SafeMap<K, V>: Map<K, V> {
    /// Returns the existing value and `true` if `key` is present; otherwise
    /// stores `value` and returns it with `false`.
    ///
    /// Of any number of concurrent callers racing on the same absent key,
    /// exactly one observes `false`.
    fn load_or_store(&self, key: K, value: V) -> (V, bool);

    /// Removes `key` and returns its value, if present.
    fn load_and_delete<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized;
}

/// Values that may represent "nothing".
///
/// [`OptimisticMap`](crate::OptimisticMap) refuses to store null values, so
/// presence of a key always implies a meaningful value. Most types are never
/// null and can rely on the default method:
///
/// ```
/// use safemap::Nullable;
///
/// struct Session {
///     id: u64,
/// }
///
/// impl Nullable for Session {}
/// ```
pub trait Nullable {
    /// Returns `true` when the value stands for "nothing".
    fn is_null(&self) -> bool {
        false
    }
}

impl<T> Nullable for Option<T> {
    fn is_null(&self) -> bool {
        self.is_none()
    }
}

macro_rules! impl_never_null {
    ($($ty:ty),* $(,)?) => {
        $(impl Nullable for $ty {})*
    };
}

impl_never_null!(
    (),
    bool,
    char,
    u8,
    u16,
    u32,
    u64,
    u128,
    usize,
    i8,
    i16,
    i32,
    i64,
    i128,
    isize,
    f32,
    f64,
    String,
);

impl<T: ?Sized> Nullable for &T {}
impl<T> Nullable for Vec<T> {}
impl<T: ?Sized> Nullable for Box<T> {}
impl<T: ?Sized> Nullable for Rc<T> {}
impl<T: ?Sized> Nullable for Arc<T> {}

impl<K, V, S> Sizer for HashMap<K, V, S> {
    fn size(&self) -> usize {
        self.len()
    }
}

impl<K, V, S> EnumerableWithKey<K, V> for HashMap<K, V, S> {
    fn each<F>(&self, mut func: F)
    where
        F: FnMut(&K, &V),
    {
        self.iter().for_each(|(k, v)| func(k, v));
    }
}

impl<K, V, S> Enumerable<V> for HashMap<K, V, S> {
    fn each_value<F>(&self, func: F)
    where
        F: FnMut(&V),
    {
        self.values().for_each(func);
    }
}
