//! Concurrency-safe hashmaps usable interchangeably through one set of traits.
//!
//! # Overview
//! `safemap` provides two thread-safe maps implementing the same [`Map`] and
//! [`SafeMap`] contracts, and trading exact bookkeeping for throughput in
//! different ways:
//!
//! - [`RwLockMap`]: one reader/writer lock around one hashmap. Every operation
//!   is linearizable and [`Sizer::size`] is exact.
//! - [`OptimisticMap`]: a sharded store with no global lock, plus atomic
//!   counters that keep [`Sizer::size`] cheap but approximate.
//!
//! A small [`Pool`] recycles objects through a shared free-list, resetting
//! them on return.
//!
//! # Features
//! - Generic callers depend on the traits only, checked at compile time
//! - Futex-based reader/writer locking, without poisoning
//! - Read-only [`Enumerable`] views for collection helpers
//! - Absence reported through `Option` and `bool`, never errors
//!
//! # Examples
//! ```
//! use safemap::{Map, OptimisticMap, RwLockMap, SafeMap, Sizer};
//! use std::collections::HashMap;
//!
//! fn scenario<M: SafeMap<String, u32>>(map: M) {
//!     map.store("a".into(), 1);
//!     map.store("b".into(), 2);
//!     assert_eq!(map.size(), 2);
//!     assert_eq!(
//!         map.data(),
//!         HashMap::from([("a".to_string(), 1), ("b".to_string(), 2)])
//!     );
//!
//!     assert_eq!(map.load_and_delete("a"), Some(1));
//!     assert!(!map.exist("a"));
//! }
//!
//! scenario(RwLockMap::new());
//! scenario(OptimisticMap::new());
//! ```
mod futex;
#[doc = include_str!("../README.md")]
mod map;
mod optimistic_map;
mod pool;
mod rw_lock_map;
mod shards_map;

pub use map::*;
pub use optimistic_map::*;
pub use pool::*;
pub use rw_lock_map::*;
