use crate::Nullable;
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Objects that can be restored to a default state for reuse.
pub trait Reset {
    /// Clears the object so the next user sees it as freshly made.
    fn reset(&mut self);
}

impl<T: Reset> Reset for Option<T> {
    fn reset(&mut self) {
        if let Some(inner) = self {
            inner.reset();
        }
    }
}

impl<T> Reset for Vec<T> {
    fn reset(&mut self) {
        self.clear();
    }
}

impl Reset for String {
    fn reset(&mut self) {
        self.clear();
    }
}

impl<T: Reset + ?Sized> Reset for Box<T> {
    fn reset(&mut self) {
        T::reset(self);
    }
}

/// A thread-safe free-list of reusable objects.
///
/// [`get`](Pool::get) hands out a recycled object, or a fresh one from the
/// factory when none is available. [`put`](Pool::put) resets an object
/// before returning it, so the next `get` never sees the previous owner's
/// state. The pool is unbounded and gives no retention guarantee.
///
/// # Examples
/// ```
/// use safemap::Pool;
///
/// let pool = Pool::new(|| Vec::<u8>::with_capacity(1024));
/// let mut buf = pool.get();
/// buf.extend_from_slice(b"hello");
/// pool.put(buf);
///
/// let buf = pool.get();
/// assert!(buf.is_empty());
/// assert!(buf.capacity() >= 1024);
/// ```
pub struct Pool<T> {
    free: Mutex<Vec<T>>,
    factory: Box<dyn Fn() -> T + Send + Sync>,
}

impl<T: Reset + Nullable> Pool<T> {
    /// Creates an empty pool that builds objects with `factory` on demand.
    pub fn new<F>(factory: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        Self {
            free: Mutex::new(Vec::new()),
            factory: Box::new(factory),
        }
    }

    /// Takes an object out of the pool, constructing one if the pool is empty.
    pub fn get(&self) -> T {
        let recycled = self.free().pop();
        recycled.unwrap_or_else(|| {
            log::trace!("pool empty, constructing a new object");
            (self.factory)()
        })
    }

    /// Resets `x` and returns it to the pool. Null objects are dropped.
    pub fn put(&self, mut x: T) {
        if x.is_null() {
            return;
        }
        x.reset();
        self.free().push(x);
    }

    /// Returns the number of idle objects. Advisory only under concurrency.
    pub fn len(&self) -> usize {
        self.free().len()
    }

    pub fn is_empty(&self) -> bool {
        self.free().is_empty()
    }

    fn free(&self) -> MutexGuard<'_, Vec<T>> {
        // The list is never left half-updated, so a poisoned lock is still usable.
        self.free.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T: Reset + Nullable + Default + 'static> Default for Pool<T> {
    fn default() -> Self {
        Self::new(T::default)
    }
}

impl<T> fmt::Debug for Pool<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pool").finish_non_exhaustive()
    }
}
