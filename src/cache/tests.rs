use super::*;
use crate::hashing::CacheKey;

fn key(n: usize) -> CacheKey {
    CacheKey::new("query", &format!("document {n}"))
}

#[test]
fn test_cache_status_values() {
    assert_eq!(CacheStatus::Hit.as_str(), "HIT");
    assert_eq!(CacheStatus::Miss.to_string(), "MISS");
    assert_eq!(CacheStatus::Disabled.to_string(), "DISABLED");
    assert!(CacheStatus::Hit.is_hit());
    assert!(!CacheStatus::Miss.is_hit());
}

#[test]
fn test_new_cache_is_empty() {
    let cache = ScoreCache::new(10);
    assert!(cache.is_empty());
    assert_eq!(cache.len(), 0);
    assert_eq!(cache.capacity(), 10);
    assert!(cache.lru_key().is_none());
}

#[test]
fn test_put_then_get_returns_value() {
    let mut cache = ScoreCache::new(4);
    cache.put(key(1), 0.75);

    assert_eq!(cache.get(&key(1)), Some(0.75));
    assert_eq!(cache.get(&key(2)), None);
}

#[test]
fn test_put_overwrites_existing_key() {
    let mut cache = ScoreCache::new(2);
    cache.put(key(1), 0.1);
    cache.put(key(1), 0.9);

    assert_eq!(cache.len(), 1);
    assert_eq!(cache.get(&key(1)), Some(0.9));
}

#[test]
fn test_evicts_least_recently_used() {
    let mut cache = ScoreCache::new(3);
    cache.put(key(1), 1.0);
    cache.put(key(2), 2.0);
    cache.put(key(3), 3.0);

    let evicted = cache.put(key(4), 4.0);

    assert_eq!(evicted, Some(key(1)));
    assert_eq!(cache.len(), 3);
    assert!(!cache.contains(&key(1)));
    assert!(cache.contains(&key(4)));
}

#[test]
fn test_get_refreshes_recency() {
    let mut cache = ScoreCache::new(3);
    cache.put(key(1), 1.0);
    cache.put(key(2), 2.0);
    cache.put(key(3), 3.0);

    assert_eq!(cache.get(&key(1)), Some(1.0));
    let evicted = cache.put(key(4), 4.0);

    assert_eq!(evicted, Some(key(2)));
    assert!(cache.contains(&key(1)));
}

#[test]
fn test_overwrite_refreshes_recency_without_eviction() {
    let mut cache = ScoreCache::new(2);
    cache.put(key(1), 1.0);
    cache.put(key(2), 2.0);

    assert_eq!(cache.put(key(1), 1.5), None);
    assert_eq!(cache.lru_key(), Some(key(2)));
    assert_eq!(cache.put(key(3), 3.0), Some(key(2)));
}

#[test]
fn test_no_eviction_below_capacity() {
    let mut cache = ScoreCache::new(5);
    for n in 0..5 {
        assert_eq!(cache.put(key(n), n as f32), None);
    }
    assert_eq!(cache.stats().evictions, 0);
    assert_eq!(cache.len(), 5);
}

#[test]
fn test_capacity_never_exceeded() {
    let mut cache = ScoreCache::new(7);
    for n in 0..100 {
        cache.put(key(n), n as f32);
        assert!(cache.len() <= 7);
        if n % 3 == 0 {
            let _ = cache.get(&key(n / 2));
        }
    }
    assert_eq!(cache.len(), 7);
    assert_eq!(cache.stats().evictions, 93);
}

#[test]
fn test_keys_by_recency_order() {
    let mut cache = ScoreCache::new(4);
    cache.put(key(1), 1.0);
    cache.put(key(2), 2.0);
    cache.put(key(3), 3.0);
    let _ = cache.get(&key(2));

    assert_eq!(cache.keys_by_recency(), vec![key(2), key(3), key(1)]);
    assert_eq!(cache.lru_key(), Some(key(1)));
}

#[test]
fn test_capacity_one() {
    let mut cache = ScoreCache::new(1);
    cache.put(key(1), 1.0);
    assert_eq!(cache.put(key(2), 2.0), Some(key(1)));
    assert_eq!(cache.get(&key(2)), Some(2.0));
    assert_eq!(cache.get(&key(1)), None);
    assert_eq!(cache.keys_by_recency(), vec![key(2)]);
}

#[test]
fn test_disabled_cache() {
    let mut cache = ScoreCache::disabled();

    assert!(!cache.is_enabled());
    assert_eq!(cache.put(key(1), 1.0), None);
    assert_eq!(cache.get(&key(1)), None);
    assert_eq!(cache.lookup(&key(1)).1, CacheStatus::Disabled);
    assert!(cache.is_empty());
}

#[test]
fn test_peek_does_not_touch_recency() {
    let mut cache = ScoreCache::new(2);
    cache.put(key(1), 1.0);
    cache.put(key(2), 2.0);

    assert_eq!(cache.peek(&key(1)), Some(1.0));
    assert_eq!(cache.put(key(3), 3.0), Some(key(1)));
    assert_eq!(cache.stats().hits, 0);
}

#[test]
fn test_stats_and_hit_rate() {
    let mut cache = ScoreCache::new(4);
    assert_eq!(cache.stats().hit_rate(), 0.0);

    cache.put(key(1), 1.0);
    let _ = cache.get(&key(1));
    let _ = cache.get(&key(1));
    let _ = cache.get(&key(2));

    let stats = cache.stats();
    assert_eq!(stats.hits, 2);
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.len, 1);
    assert_eq!(stats.capacity, 4);
    assert!((stats.hit_rate() - 2.0 / 3.0).abs() < 1e-9);
}

#[test]
fn test_clear() {
    let mut cache = ScoreCache::new(3);
    cache.put(key(1), 1.0);
    cache.put(key(2), 2.0);
    cache.clear();

    assert!(cache.is_empty());
    assert!(cache.lru_key().is_none());
    cache.put(key(3), 3.0);
    assert_eq!(cache.get(&key(3)), Some(3.0));
}

#[test]
fn test_debug_format() {
    let mut cache = ScoreCache::new(3);
    cache.put(key(1), 1.0);
    let debug = format!("{:?}", cache);
    assert!(debug.contains("ScoreCache"));
    assert!(debug.contains("entries: 1"));
}
