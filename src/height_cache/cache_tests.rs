//! Tests for the height cache.

use super::*;
use crate::height_cache::store::MemoryStore;
use crate::model::{ChatItem, Role};
use chrono::TimeZone;
use serde_json::json;
use std::cell::Cell;
use std::rc::Rc;

fn id(s: &str) -> ItemId {
    ItemId::new(s).expect("valid id")
}

fn item(s: &str, content: &str) -> ChatItem {
    ChatItem::new(id(s), Role::Assistant, content)
}

fn cache() -> HeightCache {
    HeightCache::new(EstimateConfig::default(), HeightCacheConfig::default())
}

/// Store that counts calls and fails every operation.
struct FailingStore {
    calls: Rc<Cell<usize>>,
}

impl SnapshotStore for FailingStore {
    fn get(&self, _key: &str) -> Result<Option<Value>, StoreError> {
        self.calls.set(self.calls.get() + 1);
        Err(StoreError::Unavailable("quota exceeded".into()))
    }

    fn set(&mut self, _key: &str, _value: &Value) -> Result<(), StoreError> {
        self.calls.set(self.calls.get() + 1);
        Err(StoreError::Unavailable("quota exceeded".into()))
    }

    fn remove(&mut self, _key: &str) -> Result<(), StoreError> {
        self.calls.set(self.calls.get() + 1);
        Err(StoreError::Unavailable("quota exceeded".into()))
    }
}

/// Store whose contents stay inspectable after it is moved into a cache.
#[derive(Clone, Default)]
struct SharedStore {
    inner: Rc<std::cell::RefCell<MemoryStore>>,
}

impl SnapshotStore for SharedStore {
    fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        self.inner.borrow().get(key)
    }

    fn set(&mut self, key: &str, value: &Value) -> Result<(), StoreError> {
        self.inner.borrow_mut().set(key, value)
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        self.inner.borrow_mut().remove(key)
    }
}

fn record(id: &str, height: f64, content: &str, ts_ms: i64) -> Value {
    json!({
        "id": id,
        "height": height,
        "timestamp": ts_ms,
        "contentHash": ContentHash::of(content).get(),
    })
}

// ===== Lookup =====

#[test]
fn unknown_item_gets_estimate_and_counts_miss() {
    let mut cache = cache();
    let it = item("m1", "hello");

    assert_eq!(cache.get(&it), cache.estimate(&it));
    assert_eq!(cache.stats().misses, 1);
    assert_eq!(cache.stats().hits, 0);
}

#[test]
fn measured_item_returns_measured_height() {
    let mut cache = cache();
    let it = item("m1", "hello");

    assert!(cache.set(it.id(), 132.0, it.content()));
    assert_eq!(cache.get(&it), 132.0);
    assert_eq!(cache.stats().hits, 1);
}

#[test]
fn changed_content_invalidates_entry() {
    let mut cache = cache();
    let mut it = item("m1", "hello");
    cache.set(it.id(), 132.0, it.content());

    it.push_str(" world");
    assert_eq!(cache.get(&it), cache.estimate(&it));
    assert!(!cache.contains(it.id()), "stale entry is deleted on lookup");
    assert_eq!(cache.stats().misses, 1);
}

#[test]
fn lookup_by_hash_matches_get() {
    let mut cache = cache();
    cache.set(&id("m1"), 90.0, "abc");
    assert_eq!(cache.lookup(&id("m1"), ContentHash::of("abc")), Some(90.0));
    assert_eq!(cache.lookup(&id("m1"), ContentHash::of("abcd")), None);
}

// ===== Writes =====

#[test]
fn invalid_heights_are_rejected() {
    let mut cache = cache();
    for height in [0.0, -5.0, f64::NAN, f64::INFINITY] {
        assert!(!cache.set(&id("m1"), height, "x"), "{height} accepted");
    }
    assert!(cache.is_empty());
}

#[test]
fn measured_heights_are_clamped_into_bounds() {
    let mut cache = cache();
    cache.set(&id("tiny"), 1.0, "x");
    cache.set(&id("huge"), 1e9, "x");

    let config = EstimateConfig::default();
    assert_eq!(cache.peek(&id("tiny")).map(|e| e.height), Some(config.min_height));
    assert_eq!(cache.peek(&id("huge")).map(|e| e.height), Some(config.max_height));
}

#[test]
fn batch_set_counts_stored_measurements() {
    let mut cache = cache();
    let batch = vec![
        Measurement::new(id("a"), 100.0, "a"),
        Measurement::new(id("b"), f64::NAN, "b"),
        Measurement::new(id("c"), 50.0, "c"),
    ];
    assert_eq!(cache.batch_set(&batch), 2);
    assert_eq!(cache.len(), 2);
}

#[test]
fn capacity_evicts_least_recently_written() {
    let config = HeightCacheConfig {
        capacity: 2,
        ..HeightCacheConfig::default()
    };
    let mut cache = HeightCache::new(EstimateConfig::default(), config);
    cache.set(&id("a"), 100.0, "a");
    cache.set(&id("b"), 100.0, "b");
    // Reads do not promote.
    cache.lookup(&id("a"), ContentHash::of("a"));
    cache.set(&id("c"), 100.0, "c");

    assert!(!cache.contains(&id("a")));
    assert!(cache.contains(&id("b")));
    assert!(cache.contains(&id("c")));
}

#[test]
fn clear_one_and_clear_all() {
    let mut cache = cache();
    cache.set(&id("a"), 100.0, "a");
    cache.set(&id("b"), 100.0, "b");

    cache.clear_one(&id("a"));
    assert!(!cache.contains(&id("a")));
    assert_eq!(cache.len(), 1);

    cache.clear_all();
    assert!(cache.is_empty());
}

// ===== Observability =====

#[test]
fn average_height_of_empty_cache_is_default_height() {
    let cache = cache();
    assert_eq!(cache.average_height(), EstimateConfig::default().default_height);
}

#[test]
fn stats_report_size_and_average() {
    let mut cache = cache();
    cache.set(&id("a"), 100.0, "a");
    cache.set(&id("b"), 200.0, "b");
    let stats = cache.stats();
    assert_eq!(stats.size, 2);
    assert_eq!(stats.avg_height, 150.0);
    assert_eq!(stats.hit_rate(), 0.0);
}

#[test]
fn set_estimate_config_reclamps_entries() {
    let mut cache = cache();
    cache.set(&id("a"), 500.0, "a");
    cache.set_estimate_config(EstimateConfig {
        max_height: 300.0,
        ..EstimateConfig::default()
    });
    assert_eq!(cache.peek(&id("a")).map(|e| e.height), Some(300.0));
}

// ===== Persistence =====

#[test]
fn flush_writes_most_recent_first_and_truncates() {
    let store = SharedStore::default();
    let config = HeightCacheConfig {
        snapshot_max_entries: 2,
        flush_every: 0,
        ..HeightCacheConfig::default()
    };
    let mut cache =
        HeightCache::with_store(EstimateConfig::default(), config.clone(), Box::new(store.clone()));
    cache.set(&id("a"), 100.0, "a");
    cache.set(&id("b"), 110.0, "b");
    cache.set(&id("c"), 120.0, "c");
    assert!(store.get(&config.snapshot_key).unwrap().is_none(), "no auto flush");

    cache.flush();
    let snapshot = store.get(&config.snapshot_key).unwrap().expect("written");
    let ids: Vec<&str> = snapshot
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["c", "b"]);
}

#[test]
fn flush_happens_every_n_writes() {
    let store = SharedStore::default();
    let config = HeightCacheConfig {
        flush_every: 3,
        ..HeightCacheConfig::default()
    };
    let key = config.snapshot_key.clone();
    let mut cache = HeightCache::with_store(EstimateConfig::default(), config, Box::new(store.clone()));

    cache.set(&id("a"), 100.0, "a");
    cache.set(&id("b"), 100.0, "b");
    assert!(store.get(&key).unwrap().is_none());
    cache.set(&id("c"), 100.0, "c");
    assert_eq!(store.get(&key).unwrap().unwrap().as_array().unwrap().len(), 3);
}

#[test]
fn snapshot_round_trips_into_new_cache() {
    let store = SharedStore::default();
    let it = item("m1", "streamed text");
    {
        let mut cache = HeightCache::with_store(
            EstimateConfig::default(),
            HeightCacheConfig::default(),
            Box::new(store.clone()),
        );
        cache.set(it.id(), 240.0, it.content());
        cache.flush();
    }

    let mut restored = HeightCache::with_store(
        EstimateConfig::default(),
        HeightCacheConfig::default(),
        Box::new(store),
    );
    assert_eq!(restored.get(&it), 240.0);
}

#[test]
fn load_drops_expired_and_invalid_records() {
    let key = HeightCacheConfig::default().snapshot_key;
    let mut store = MemoryStore::new();
    let now = Utc::now().timestamp_millis();
    let ten_days_ago = now - 10 * 24 * 3600 * 1000;
    store
        .set(
            &key,
            &json!([
                record("fresh", 100.0, "a", now),
                record("stale", 100.0, "b", ten_days_ago),
                record("negative", -1.0, "c", now),
                {"id": "", "height": 50.0, "timestamp": now, "contentHash": 1},
                {"garbage": true},
            ]),
        )
        .unwrap();

    let cache = HeightCache::with_store(
        EstimateConfig::default(),
        HeightCacheConfig::default(),
        Box::new(store),
    );
    assert_eq!(cache.len(), 1);
    assert!(cache.contains(&id("fresh")));
}

#[test]
fn load_keeps_newest_records_when_over_capacity() {
    let key = HeightCacheConfig::default().snapshot_key;
    let base = Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap().timestamp_millis();
    let mut store = MemoryStore::new();
    store
        .set(
            &key,
            &json!([
                record("old", 100.0, "a", base),
                record("newest", 100.0, "b", base + 2000),
                record("middle", 100.0, "c", base + 1000),
            ]),
        )
        .unwrap();

    let config = HeightCacheConfig {
        capacity: 2,
        ..HeightCacheConfig::default()
    };
    let cache = HeightCache::with_store(EstimateConfig::default(), config, Box::new(store));
    assert!(cache.contains(&id("newest")));
    assert!(cache.contains(&id("middle")));
    assert!(!cache.contains(&id("old")));
}

#[test]
fn non_array_snapshot_starts_empty() {
    let key = HeightCacheConfig::default().snapshot_key;
    let mut store = MemoryStore::new();
    store.set(&key, &json!({"not": "an array"})).unwrap();

    let cache = HeightCache::with_store(
        EstimateConfig::default(),
        HeightCacheConfig::default(),
        Box::new(store),
    );
    assert!(cache.is_empty());
    assert!(!cache.is_degraded());
}

#[test]
fn corrupted_snapshot_file_is_replaced_by_next_flush() {
    let dir = tempfile::tempdir().unwrap();
    let key = HeightCacheConfig::default().snapshot_key;
    std::fs::write(dir.path().join(format!("{key}.json")), "[{ broken").unwrap();

    let store = crate::height_cache::store::FileStore::new(dir.path());
    let mut cache = HeightCache::with_store(
        EstimateConfig::default(),
        HeightCacheConfig::default(),
        Box::new(store.clone()),
    );
    assert!(cache.is_empty());
    assert!(!cache.is_degraded());

    cache.set(&id("a"), 100.0, "a");
    cache.flush();
    let value = store.get(&key).unwrap().expect("rewritten");
    assert_eq!(value.as_array().map(Vec::len), Some(1));
}

#[test]
fn failing_store_degrades_to_memory_only() {
    let calls = Rc::new(Cell::new(0));
    let store = FailingStore {
        calls: Rc::clone(&calls),
    };
    let config = HeightCacheConfig {
        flush_every: 1,
        ..HeightCacheConfig::default()
    };
    let mut cache = HeightCache::with_store(EstimateConfig::default(), config, Box::new(store));
    assert!(cache.is_degraded());
    assert_eq!(calls.get(), 1, "only the initial load touched the store");

    let it = item("m1", "x");
    assert!(cache.set(it.id(), 150.0, it.content()));
    cache.flush();
    cache.clear_all();
    assert_eq!(calls.get(), 1, "degraded cache never calls the store again");

    cache.set(it.id(), 150.0, it.content());
    assert_eq!(cache.get(&it), 150.0, "in-memory cache keeps working");
}

#[test]
fn failing_flush_is_absorbed() {
    struct WriteFails;
    impl SnapshotStore for WriteFails {
        fn get(&self, _key: &str) -> Result<Option<Value>, StoreError> {
            Ok(None)
        }
        fn set(&mut self, _key: &str, _value: &Value) -> Result<(), StoreError> {
            Err(StoreError::Unavailable("disk full".into()))
        }
        fn remove(&mut self, _key: &str) -> Result<(), StoreError> {
            Ok(())
        }
    }

    let mut cache = HeightCache::with_store(
        EstimateConfig::default(),
        HeightCacheConfig::default(),
        Box::new(WriteFails),
    );
    assert!(!cache.is_degraded());
    cache.set(&id("a"), 100.0, "a");
    cache.flush();
    assert!(cache.is_degraded());
    assert_eq!(cache.len(), 1);
}

#[test]
fn clear_all_removes_snapshot() {
    let store = SharedStore::default();
    let key = HeightCacheConfig::default().snapshot_key;
    let mut cache = HeightCache::with_store(
        EstimateConfig::default(),
        HeightCacheConfig::default(),
        Box::new(store.clone()),
    );
    cache.set(&id("a"), 100.0, "a");
    cache.flush();
    assert!(store.get(&key).unwrap().is_some());

    cache.clear_all();
    assert!(store.get(&key).unwrap().is_none());
}
