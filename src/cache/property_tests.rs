//! Property-Based Tests for Cache Module
//!
//! Uses proptest to check the cache's accounting and capacity guarantees
//! over arbitrary operation sequences.

use proptest::prelude::*;
use serde_json::{json, Value};
use std::sync::Arc;
use std::thread::sleep;
use std::time::Duration;

use crate::cache::CacheManager;
use crate::config::CacheConfig;
use crate::storage::{MemoryStore, PersistentStore};
use crate::telemetry::NoopReporter;

// == Test Configuration ==
const TEST_MAX_SIZE: u64 = 1024 * 1024;
const TEST_NAMESPACE: &str = "prop";

fn new_cache(max_size: u64) -> (Arc<MemoryStore>, CacheManager) {
    let config = CacheConfig {
        namespace: TEST_NAMESPACE.to_string(),
        max_cache_size_bytes: max_size,
        ..CacheConfig::default()
    };
    let store = Arc::new(MemoryStore::new());
    let cache = CacheManager::new(&config, store.clone()).with_reporter(Arc::new(NoopReporter));
    (store, cache)
}

fn entry_keys(store: &MemoryStore) -> usize {
    store
        .keys_with_prefix(&format!("{}_", TEST_NAMESPACE))
        .unwrap()
        .len()
}

// == Strategies ==
/// Generates cache keys
fn key_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9_/]{1,32}"
}

/// Generates small JSON payloads
fn value_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        any::<i64>().prop_map(|n| json!(n)),
        "[a-zA-Z0-9 ]{0,64}".prop_map(|s| json!(s)),
        ("[a-z]{1,8}", any::<u32>()).prop_map(|(k, v)| {
            let mut map = serde_json::Map::new();
            map.insert(k, json!(v));
            Value::Object(map)
        }),
    ]
}

/// Generates a sequence of cache operations for testing
#[derive(Debug, Clone)]
enum CacheOp {
    Set { key: String, value: Value },
    Get { key: String },
    Delete { key: String },
    Clear,
}

fn cache_op_strategy() -> impl Strategy<Value = CacheOp> {
    // A small key space so gets and deletes actually hit
    let key = "[a-e]";
    prop_oneof![
        4 => (key, value_strategy()).prop_map(|(key, value)| CacheOp::Set { key, value }),
        4 => key.prop_map(|key| CacheOp::Get { key }),
        2 => key.prop_map(|key| CacheOp::Delete { key }),
        1 => Just(CacheOp::Clear),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // Every get moves exactly one lifetime counter, and clear never resets them.
    #[test]
    fn prop_hit_miss_accounting(ops in prop::collection::vec(cache_op_strategy(), 1..60)) {
        let (_store, cache) = new_cache(TEST_MAX_SIZE);
        let mut expected_hits: u64 = 0;
        let mut expected_misses: u64 = 0;

        for op in ops {
            match op {
                CacheOp::Set { key, value } => {
                    prop_assert!(cache.set(&key, &value));
                }
                CacheOp::Get { key } => match cache.get(&key) {
                    Some(_) => expected_hits += 1,
                    None => expected_misses += 1,
                },
                CacheOp::Delete { key } => cache.delete(&key),
                CacheOp::Clear => cache.clear(),
            }
        }

        let stats = cache.stats();
        prop_assert_eq!(stats.hit_count, expected_hits, "Hits mismatch");
        prop_assert_eq!(stats.miss_count, expected_misses, "Misses mismatch");

        let total = expected_hits + expected_misses;
        let expected_rate = if total == 0 {
            0.0
        } else {
            100.0 * expected_hits as f64 / total as f64
        };
        prop_assert!((stats.hit_rate_percent - expected_rate).abs() < 1e-9);
    }

    // A value read straight after being written comes back unchanged.
    #[test]
    fn prop_read_your_write(key in key_strategy(), value in value_strategy()) {
        let (_store, cache) = new_cache(TEST_MAX_SIZE);

        prop_assert!(cache.set(&key, &value));
        prop_assert_eq!(cache.get(&key), Some(value));
    }

    // Overwriting replaces the value and leaves a single entry.
    #[test]
    fn prop_overwrite_semantics(
        key in key_strategy(),
        first in value_strategy(),
        second in value_strategy()
    ) {
        let (store, cache) = new_cache(TEST_MAX_SIZE);

        cache.set(&key, &first);
        cache.set(&key, &second);

        prop_assert_eq!(cache.get(&key), Some(second));
        prop_assert_eq!(entry_keys(&store), 1);
    }

    // After a delete the key reads as a miss.
    #[test]
    fn prop_delete_removes_entry(key in key_strategy(), value in value_strategy()) {
        let (_store, cache) = new_cache(TEST_MAX_SIZE);

        cache.set(&key, &value);
        cache.delete(&key);

        prop_assert_eq!(cache.get(&key), None);
        prop_assert_eq!(cache.stats().entry_count, 0);
    }

    // With equal-sized entries the budget is exceeded by at most the entry
    // just written, however many writes happen.
    #[test]
    fn prop_soft_size_bound(
        keys in prop::collection::vec(key_strategy(), 1..80),
        entry_size in 4usize..40,
        budget in 40u64..400
    ) {
        let (_store, cache) = new_cache(budget);
        let value = json!("v".repeat(entry_size - 2));

        for key in keys {
            prop_assert!(cache.set(&key, &value));
            let stats = cache.last_stats();
            prop_assert!(
                stats.total_size_bytes <= budget + entry_size as u64,
                "size {} exceeds budget {} by more than {}",
                stats.total_size_bytes,
                budget,
                entry_size
            );
        }
    }

    // An over-budget write removes exactly one existing entry.
    #[test]
    fn prop_eviction_removes_one(count in 2usize..12, hits in prop::collection::vec(0u8..3, 12)) {
        let (store, cache) = new_cache(10 * count as u64);
        for i in 0..count {
            cache.set(&format!("k{}", i), &json!("12345678"));
            for _ in 0..hits[i] {
                cache.get(&format!("k{}", i));
            }
        }
        prop_assert_eq!(entry_keys(&store), count);

        cache.set("incoming", &json!("12345678"));

        prop_assert_eq!(entry_keys(&store), count);
        prop_assert!(cache.get("incoming").is_some());
    }

    // A corrupt entry in the namespace never surfaces and is purged by the next scan.
    #[test]
    fn prop_corrupt_entries_self_heal(key in key_strategy(), garbage in "[^{}]{0,16}") {
        let (store, cache) = new_cache(TEST_MAX_SIZE);
        let raw_key = format!("{}_{}", TEST_NAMESPACE, key);
        store.set(&raw_key, &garbage).unwrap();

        let stats = cache.stats();

        prop_assert_eq!(stats.entry_count, 0);
        prop_assert_eq!(store.get(&raw_key).unwrap(), None);
    }
}

// Separate proptest block with fewer cases for time-sensitive TTL tests
proptest! {
    #![proptest_config(ProptestConfig::with_cases(5))]

    // An expired entry reads as a miss and disappears from the stats scan.
    #[test]
    fn prop_ttl_expiration_behavior(key in key_strategy(), value in value_strategy()) {
        let (store, cache) = new_cache(TEST_MAX_SIZE);

        cache.set_with_ttl(&key, &value, Duration::from_millis(50));
        prop_assert_eq!(cache.get(&key), Some(value));

        sleep(Duration::from_millis(80));

        prop_assert_eq!(cache.get(&key), None);
        let stats = cache.stats();
        prop_assert_eq!(stats.entry_count, 0);
        prop_assert_eq!(stats.miss_count, 1);
        prop_assert_eq!(entry_keys(&store), 0);
    }
}
