//! Validator cache invariants
//!
//! TTL expiry, capacity eviction, structural keying, and engine reset,
//! exercised through the public engine API with shrunk cache tuning so
//! no test sleeps or builds a thousand schemas.

use std::time::Duration;

use serde_json::json;
use validus::cache::CacheConfig;
use validus::executor::ValidationEngine;
use validus::field;
use validus::schema::Schema;

fn schema_with_min_length(min: usize) -> Schema {
    Schema::builder()
        .input_field("name", field::string().min_length(min).required().build())
        .build()
        .unwrap()
}

#[test]
fn test_second_compile_is_a_cache_hit() {
    let engine = ValidationEngine::new();
    let schema = schema_with_min_length(1);
    let data = json!({"name": "x"});

    let first = engine.validate_input(&schema, &data).unwrap();
    assert!(!first.timing.unwrap().from_cache);

    let second = engine.validate_input(&schema, &data).unwrap();
    assert!(second.timing.unwrap().from_cache);

    // Identical input through a cached validator yields an identical result.
    assert_eq!(first.success, second.success);
    assert_eq!(first.data, second.data);
    assert_eq!(first.errors, second.errors);

    let snapshot = engine.metrics();
    assert_eq!(snapshot.cache_hits, 1);
    assert_eq!(snapshot.cache_size, 1);
}

#[test]
fn test_structurally_equal_schemas_share_an_entry() {
    let engine = ValidationEngine::new();
    let data = json!({"name": "x"});

    engine
        .validate_input(&schema_with_min_length(1), &data)
        .unwrap();
    let result = engine
        .validate_input(&schema_with_min_length(1), &data)
        .unwrap();
    assert!(result.timing.unwrap().from_cache);
    assert_eq!(engine.metrics().cache_size, 1);
}

#[test]
fn test_capacity_overflow_evicts_oldest_quarter() {
    let engine = ValidationEngine::with_config(CacheConfig {
        capacity: 8,
        ..CacheConfig::default()
    });
    let data = json!({"name": "long enough"});

    for min in 1..=8 {
        engine
            .validate_input(&schema_with_min_length(min), &data)
            .unwrap();
    }
    assert_eq!(engine.metrics().cache_size, 8);

    // Ninth distinct schema: the oldest quarter (2 entries) is evicted.
    engine
        .validate_input(&schema_with_min_length(9), &data)
        .unwrap();
    assert_eq!(engine.metrics().cache_size, 7);

    // An evicted entry is a fresh compile, not a hit.
    let result = engine
        .validate_input(&schema_with_min_length(1), &data)
        .unwrap();
    assert!(!result.timing.unwrap().from_cache);

    // A surviving entry is still a hit.
    let result = engine
        .validate_input(&schema_with_min_length(8), &data)
        .unwrap();
    assert!(result.timing.unwrap().from_cache);
}

#[test]
fn test_expired_entry_is_a_miss_before_capacity() {
    let engine = ValidationEngine::with_config(CacheConfig {
        ttl: Duration::ZERO,
        ..CacheConfig::default()
    });
    let schema = schema_with_min_length(1);
    let data = json!({"name": "x"});

    engine.validate_input(&schema, &data).unwrap();
    let result = engine.validate_input(&schema, &data).unwrap();
    assert!(!result.timing.unwrap().from_cache);
    assert_eq!(engine.metrics().cache_hits, 0);
}

#[test]
fn test_reset_drops_cache_and_zeroes_counters() {
    let engine = ValidationEngine::new();
    let schema = schema_with_min_length(1);
    let data = json!({"name": "x"});

    engine.validate_input(&schema, &data).unwrap();
    engine.validate_input(&schema, &data).unwrap();
    assert_eq!(engine.metrics().total_validations, 2);

    engine.reset();
    let snapshot = engine.metrics();
    assert_eq!(snapshot.total_validations, 0);
    assert_eq!(snapshot.cache_hits, 0);
    assert_eq!(snapshot.cache_size, 0);

    let result = engine.validate_input(&schema, &data).unwrap();
    assert!(!result.timing.unwrap().from_cache);
}

#[test]
fn test_independent_engines_do_not_share_state() {
    let first = ValidationEngine::new();
    let second = ValidationEngine::new();
    let schema = schema_with_min_length(1);
    let data = json!({"name": "x"});

    first.validate_input(&schema, &data).unwrap();
    let result = second.validate_input(&schema, &data).unwrap();
    assert!(!result.timing.unwrap().from_cache);
    assert_eq!(second.metrics().total_validations, 1);
}

#[test]
fn test_metrics_track_failures_and_hit_rate() {
    let engine = ValidationEngine::new();
    let schema = schema_with_min_length(5);

    engine
        .validate_input(&schema, &json!({"name": "long enough"}))
        .unwrap();
    engine.validate_input(&schema, &json!({"name": "no"})).unwrap();

    let snapshot = engine.metrics();
    assert_eq!(snapshot.total_validations, 2);
    assert_eq!(snapshot.failed_validations, 1);
    assert_eq!(snapshot.cache_hits, 1);
    assert!((snapshot.cache_hit_rate - 0.5).abs() < f64::EPSILON);
}
