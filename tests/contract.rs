use safemap::{Enumerable, EnumerableWithKey, Map, OptimisticMap, RwLockMap, SafeMap, Sizer};
use std::collections::{HashMap, HashSet};
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Barrier,
};

// Every check runs against both maps through the traits only.
macro_rules! for_each_map {
    ($check:ident) => {
        mod $check {
            use super::*;

            #[test]
            fn rw_lock_map() {
                super::$check(RwLockMap::new());
            }

            #[test]
            fn optimistic_map() {
                super::$check(OptimisticMap::new());
            }
        }
    };
}

fn store_then_load<M: SafeMap<String, u32>>(map: M) {
    for i in 0..100u32 {
        map.store(format!("k{i}"), i);
        assert_eq!(map.load(format!("k{i}").as_str()), Some(i));
    }
    map.store("k1".into(), 1000);
    assert_eq!(map.load("k1"), Some(1000));
    assert_eq!(map.get("missing"), 0);
    assert_eq!(map.load("missing"), None);
}
for_each_map!(store_then_load);

fn delete_absent_is_noop<M: SafeMap<String, u32>>(map: M) {
    map.store("a".into(), 1);
    let before = map.size();
    for _ in 0..3 {
        map.delete("b");
        assert_eq!(map.size(), before);
    }
    assert_eq!(map.load_and_delete("b"), None);
    assert_eq!(map.size(), before);
}
for_each_map!(delete_absent_is_noop);

fn scenario_a<M: SafeMap<String, u32>>(map: M) {
    map.store("a".into(), 1);
    map.store("b".into(), 2);
    assert_eq!(map.size(), 2);
    assert_eq!(
        map.data(),
        HashMap::from([("a".to_string(), 1), ("b".to_string(), 2)])
    );

    let mut keys = map.keys();
    keys.sort();
    assert_eq!(keys, vec!["a".to_string(), "b".to_string()]);
    let mut values = map.values();
    values.sort();
    assert_eq!(values, vec![1, 2]);
}
for_each_map!(scenario_a);

fn scenario_b<M: SafeMap<String, u32>>(map: M) {
    map.store("a".into(), 1);
    assert_eq!(map.load_and_delete("a"), Some(1));
    assert!(!map.exist("a"));
    assert_eq!(map.size(), 0);
}
for_each_map!(scenario_b);

fn data_is_independent<M: SafeMap<String, u32>>(map: M) {
    map.store("a".into(), 1);
    let mut data = map.data();
    data.insert("a".into(), 9);
    data.insert("z".into(), 26);
    assert_eq!(map.load("a"), Some(1));
    assert!(!map.exist("z"));
}
for_each_map!(data_is_independent);

fn range_stops_early<M: SafeMap<String, u32>>(map: M) {
    for i in 0..50u32 {
        map.store(i.to_string(), i);
    }
    let mut visited = 0;
    map.range(|_, _| {
        visited += 1;
        visited != 5
    });
    assert_eq!(visited, 5);

    let mut seen = HashSet::new();
    map.each(|k, v| {
        assert_eq!(k.parse::<u32>().unwrap(), *v);
        assert!(seen.insert(k.clone()));
    });
    assert_eq!(seen.len(), 50);
}
for_each_map!(range_stops_early);

fn range_allows_nested_reads<M: SafeMap<String, u32>>(map: M) {
    (0..20u32).for_each(|i| map.store(i.to_string(), i));
    let mut visited = 0;
    map.range(|k, v| {
        assert_eq!(map.load(k.as_str()), Some(*v));
        assert!(map.exist(k.as_str()));
        visited += 1;
        true
    });
    assert_eq!(visited, 20);
}
for_each_map!(range_allows_nested_reads);

fn enumerable_views<M>(map: M)
where
    M: SafeMap<String, u32> + Enumerable<u32>,
{
    fn total<E: Enumerable<u32>>(source: &E) -> u32 {
        let mut sum = 0;
        source.each_value(|v| sum += v);
        sum
    }

    fn pairs<E: EnumerableWithKey<String, u32>>(source: &E) -> Vec<(String, u32)> {
        let mut out = Vec::with_capacity(source.size());
        source.each(|k, v| out.push((k.clone(), *v)));
        out.sort();
        out
    }

    (1..=4u32).for_each(|i| map.store(format!("{i}"), i));
    assert_eq!(total(&map), 10);
    assert_eq!(pairs(&map), pairs(&map.data()));
}
for_each_map!(enumerable_views);

fn delete_all_empties<M: SafeMap<String, u32>>(map: M) {
    for i in 0..100u32 {
        map.store(i.to_string(), i);
    }
    map.delete_all();
    assert_eq!(map.size(), 0);
    assert_eq!(map.exact_size(), 0);
    assert!(map.keys().is_empty());
    map.store("again".into(), 1);
    assert_eq!(map.size(), 1);
}
for_each_map!(delete_all_empties);

fn load_or_store_single_winner<M>(map: M)
where
    M: SafeMap<String, usize> + Send + Sync + 'static,
{
    const C: usize = 16;
    let map = Arc::new(map);
    let barrier = Arc::new(Barrier::new(C));
    let winners = Arc::new(AtomicUsize::new(0));

    let threads = (0..C)
        .map(|t| {
            let map = map.clone();
            let barrier = barrier.clone();
            let winners = winners.clone();
            std::thread::spawn(move || {
                barrier.wait();
                let (actual, loaded) = map.load_or_store("contended".into(), t);
                if !loaded {
                    assert_eq!(actual, t);
                    winners.fetch_add(1, Ordering::AcqRel);
                }
                actual
            })
        })
        .collect::<Vec<_>>();
    let observed = threads
        .into_iter()
        .map(|t| t.join().unwrap())
        .collect::<HashSet<_>>();

    assert_eq!(winners.load(Ordering::Acquire), 1);
    assert_eq!(observed.len(), 1);
    assert_eq!(map.load("contended"), observed.into_iter().next());
    assert_eq!(map.size(), 1);
}
for_each_map!(load_or_store_single_winner);

fn converges_after_quiesce<M>(map: M)
where
    M: SafeMap<String, usize> + Send + Sync + 'static,
{
    const N: usize = 1 << 12;
    const THREADS: usize = 8;
    let map = Arc::new(map);

    let threads = (0..THREADS)
        .map(|_| {
            let map = map.clone();
            std::thread::spawn(move || {
                for _ in 0..N {
                    let key = (rand::random::<u32>() % 128).to_string();
                    match rand::random::<u32>() % 5 {
                        0 | 1 => map.store(key, 1),
                        2 => map.delete(key.as_str()),
                        3 => {
                            map.load_or_store(key, 2);
                        }
                        _ => {
                            map.load_and_delete(key.as_str());
                        }
                    }
                    // Size is only a hint here; it must not panic or deadlock.
                    let _ = map.size();
                }
            })
        })
        .collect::<Vec<_>>();
    threads.into_iter().for_each(|t| t.join().unwrap());

    let mut scanned = 0;
    map.each(|_, _| scanned += 1);
    assert_eq!(map.exact_size(), scanned);
    assert_eq!(map.size(), scanned);
    assert_eq!(map.data().len(), scanned);
}
for_each_map!(converges_after_quiesce);

#[test]
fn rw_lock_map_size_exact_after_sequential_stores() {
    let map = RwLockMap::<u64, u64>::new();
    for n in 1..=1000u64 {
        map.store(n, n);
        assert_eq!(map.size(), n as usize);
    }
}

#[test]
fn optimistic_map_ignores_null_values() {
    let map = OptimisticMap::<String, Option<u32>>::new();
    map.store("a".into(), None);
    assert!(!map.exist("a"));
    assert_eq!(map.size(), 0);

    map.store("a".into(), Some(1));
    let before = map.size();
    map.store("a".into(), None);
    assert!(map.exist("a"));
    assert_eq!(map.size(), before);
    assert_eq!(map.get("a"), Some(1));
}

#[test]
fn optimistic_map_delete_all_races_inserts() {
    let map = Arc::new(OptimisticMap::<u32, u32>::with_capacity_and_shard_amount(
        0, 8,
    ));
    for i in 0..1000 {
        map.store(i, i);
    }

    let writer = {
        let map = map.clone();
        std::thread::spawn(move || {
            for i in 1000..2000 {
                map.store(i, i);
            }
        })
    };
    map.delete_all();
    writer.join().unwrap();

    // Entries stored during the sweep may survive; the scan is authoritative.
    let mut scanned = 0;
    map.each(|k, _| {
        assert!(*k >= 1000);
        scanned += 1;
    });
    assert_eq!(map.exact_size(), scanned);
}
