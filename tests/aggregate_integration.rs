//! Integration tests for the bucketed aggregation engine
//!
//! These tests drive the full pipeline against the in-memory store:
//! - Writer upserts scored by timestamp
//! - Window discovery and day normalization
//! - Adaptive step sizing and the two collection tiers
//! - Per-day gap filling and the all-fill empty-store fallback

use std::sync::Arc;

use forge_metrics::aggregate::{aggregate, BucketQuery, Reducer, SECS_PER_DAY};
use forge_metrics::store::{MemoryStore, SampleStore};
use forge_metrics::types::org_metric;
use forge_metrics::writer::SampleWriter;
use forge_metrics::Error;

/// A day-aligned base timestamp (2023-11-15 00:00:00 UTC)
const DAY0: i64 = 1_700_006_400;

/// Seed one sample per day over `days`, value = day index
async fn seed_daily(store: &Arc<MemoryStore>, key: &str, days: std::ops::Range<i64>) {
    let writer = SampleWriter::new(store.clone());
    for day in days {
        writer
            .store_calc(key, DAY0 + day * SECS_PER_DAY, day as f64)
            .await
            .unwrap();
    }
}

// ============================================================================
// Bucketed queries with a positive bucket count
// ============================================================================

#[tokio::test]
async fn test_ten_days_into_five_buckets() {
    let store = Arc::new(MemoryStore::new());
    let key = org_metric("commits");
    seed_daily(&store, &key, 0..10).await;

    let query = BucketQuery::default()
        .window(DAY0, DAY0 + 10 * SECS_PER_DAY)
        .buckets(5)
        .reducer(Reducer::Sum);
    let result = aggregate(store.as_ref(), &key, &query).await.unwrap();

    // 5 buckets of 2 days each; each value is the sum of its two day indices
    assert_eq!(result.step, 2 * SECS_PER_DAY);
    assert_eq!(result.values, vec![1.0, 5.0, 9.0, 13.0, 17.0]);
    assert_eq!(result.begin, DAY0);
    assert_eq!(result.end, DAY0 + 10 * SECS_PER_DAY);
    assert_eq!(result.data_begin, Some(DAY0));
    assert_eq!(result.data_end, Some(DAY0 + 9 * SECS_PER_DAY));
}

#[tokio::test]
async fn test_bucket_count_always_honored() {
    let store = Arc::new(MemoryStore::new());
    let key = org_metric("issues");
    seed_daily(&store, &key, 0..10).await;

    for num in [1, 2, 3, 5, 7, 20] {
        let query = BucketQuery::default()
            .window(DAY0, DAY0 + 10 * SECS_PER_DAY)
            .buckets(num);
        let result = aggregate(store.as_ref(), &key, &query).await.unwrap();
        assert_eq!(result.values.len(), num as usize, "num = {}", num);
        assert!(result.step >= SECS_PER_DAY, "num = {}", num);
    }
}

#[tokio::test]
async fn test_step_never_below_one_day() {
    let store = Arc::new(MemoryStore::new());
    let key = org_metric("builds");
    seed_daily(&store, &key, 0..3).await;

    // 3-day window into 20 buckets would need a step of ~4 hours; it is
    // clamped to a day and the surplus buckets land past the window
    let query = BucketQuery::default()
        .window(DAY0, DAY0 + 3 * SECS_PER_DAY)
        .buckets(20);
    let result = aggregate(store.as_ref(), &key, &query).await.unwrap();

    assert_eq!(result.step, SECS_PER_DAY);
    assert_eq!(result.values.len(), 20);
    assert_eq!(&result.values[..3], &[0.0, 1.0, 2.0]);
    assert!(result.values[3..].iter().all(|v| *v == 0.0));
}

#[tokio::test]
async fn test_boundary_sample_counted_once() {
    let store = Arc::new(MemoryStore::new());
    let key = org_metric("merges");
    seed_daily(&store, &key, 0..10).await;

    // Window inside the data, so buckets use plain range queries; the
    // sample sitting exactly on a bucket boundary lands in one bucket only
    let query = BucketQuery::default()
        .window(DAY0 + 2 * SECS_PER_DAY, DAY0 + 8 * SECS_PER_DAY)
        .buckets(3)
        .reducer(Reducer::Sum);
    let result = aggregate(store.as_ref(), &key, &query).await.unwrap();

    assert_eq!(result.values, vec![5.0, 9.0, 13.0]);
    assert_eq!(result.values.iter().sum::<f64>(), (2..8).sum::<i64>() as f64);
}

#[tokio::test]
async fn test_window_bounds_inside_data() {
    let store = Arc::new(MemoryStore::new());
    let key = org_metric("reviews");
    seed_daily(&store, &key, 0..10).await;

    let query = BucketQuery::default()
        .window(DAY0 + 2 * SECS_PER_DAY, DAY0 + 8 * SECS_PER_DAY)
        .buckets(2);
    let result = aggregate(store.as_ref(), &key, &query).await.unwrap();

    let data_begin = result.data_begin.unwrap();
    let data_end = result.data_end.unwrap();
    assert!(data_begin <= result.begin);
    assert!(data_end >= result.end);
}

// ============================================================================
// Daily queries (num unset or zero)
// ============================================================================

#[tokio::test]
async fn test_unset_num_means_one_bucket_per_day() {
    let store = Arc::new(MemoryStore::new());
    let key = org_metric("commits");
    seed_daily(&store, &key, 0..6).await;

    let query = BucketQuery::default().window(DAY0, DAY0 + 6 * SECS_PER_DAY);
    let result = aggregate(store.as_ref(), &key, &query).await.unwrap();

    assert_eq!(result.step, SECS_PER_DAY);
    assert_eq!(result.values, vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0]);
}

#[tokio::test]
async fn test_zero_num_equals_unset_on_data() {
    let store = Arc::new(MemoryStore::new());
    let key = org_metric("commits");
    seed_daily(&store, &key, 0..6).await;

    let unset = BucketQuery::default().window(DAY0, DAY0 + 6 * SECS_PER_DAY);
    let zero = unset.clone().buckets(0);

    let a = aggregate(store.as_ref(), &key, &unset).await.unwrap();
    let b = aggregate(store.as_ref(), &key, &zero).await.unwrap();
    assert_eq!(a.values, b.values);
    assert_eq!(a.step, b.step);
}

#[tokio::test]
async fn test_window_normalized_to_day_starts() {
    let store = Arc::new(MemoryStore::new());
    let key = org_metric("pushes");
    seed_daily(&store, &key, 0..4).await;

    // 01:00 on day 0 through 02:00 on day 2 snaps to [day 0, day 2)
    let query = BucketQuery::default().window(DAY0 + 3_600, DAY0 + 2 * SECS_PER_DAY + 7_200);
    let result = aggregate(store.as_ref(), &key, &query).await.unwrap();

    assert_eq!(result.begin, DAY0);
    assert_eq!(result.end, DAY0 + 2 * SECS_PER_DAY);
    assert_eq!(result.values, vec![0.0, 1.0]);
}

// ============================================================================
// Window discovery
// ============================================================================

#[tokio::test]
async fn test_open_window_discovered_from_data() {
    let store = Arc::new(MemoryStore::new());
    let key = org_metric("commits");
    seed_daily(&store, &key, 2..9).await;

    let query = BucketQuery::default().buckets(7).reducer(Reducer::Sum);
    let result = aggregate(store.as_ref(), &key, &query).await.unwrap();

    assert_eq!(result.begin, DAY0 + 2 * SECS_PER_DAY);
    assert_eq!(result.end, DAY0 + 8 * SECS_PER_DAY);
    assert_eq!(result.data_begin, Some(DAY0 + 2 * SECS_PER_DAY));
    assert_eq!(result.data_end, Some(DAY0 + 8 * SECS_PER_DAY));
    assert_eq!(result.values.len(), 7);
}

#[tokio::test]
async fn test_open_begin_anchors_to_earliest_before_end() {
    let store = Arc::new(MemoryStore::new());
    let key = org_metric("commits");
    seed_daily(&store, &key, 0..10).await;

    let query = BucketQuery::default().window(None, DAY0 + 5 * SECS_PER_DAY);
    let result = aggregate(store.as_ref(), &key, &query).await.unwrap();

    assert_eq!(result.begin, DAY0);
    // The given end bounds the window; the data end is discovered
    // independently from the latest member overall
    assert_eq!(result.end, DAY0 + 5 * SECS_PER_DAY);
    assert_eq!(result.data_end, Some(DAY0 + 9 * SECS_PER_DAY));
    assert_eq!(result.values, vec![0.0, 1.0, 2.0, 3.0, 4.0]);
}

#[tokio::test]
async fn test_open_end_anchors_to_latest_after_begin() {
    let store = Arc::new(MemoryStore::new());
    let key = org_metric("commits");
    seed_daily(&store, &key, 0..10).await;

    let query = BucketQuery::default()
        .window(DAY0 + 4 * SECS_PER_DAY, None)
        .buckets(5);
    let result = aggregate(store.as_ref(), &key, &query).await.unwrap();

    assert_eq!(result.end, DAY0 + 9 * SECS_PER_DAY);
    assert_eq!(result.data_begin, Some(DAY0));
    assert_eq!(result.values.len(), 5);
}

// ============================================================================
// Gap filling
// ============================================================================

#[tokio::test]
async fn test_per_day_mode_fills_gaps_explicitly() {
    let store = Arc::new(MemoryStore::new());
    let key = org_metric("commits");
    // Samples only on days 5..=10 of a 21-day window
    seed_daily(&store, &key, 5..11).await;

    let query = BucketQuery::default()
        .window(DAY0, DAY0 + 21 * SECS_PER_DAY)
        .reducer(Reducer::Sum)
        .per_day();
    let result = aggregate(store.as_ref(), &key, &query).await.unwrap();

    assert_eq!(result.values.len(), 21);
    assert!(result.values[..5].iter().all(|v| *v == 0.0));
    let expected: Vec<f64> = (5..11).map(|d| d as f64).collect();
    assert_eq!(&result.values[5..11], expected.as_slice());
    assert!(result.values[11..].iter().all(|v| *v == 0.0));
}

#[tokio::test]
async fn test_window_past_data_is_pure_fill() {
    let store = Arc::new(MemoryStore::new());
    let key = org_metric("commits");
    seed_daily(&store, &key, 0..3).await;

    // Non-empty store, requested window entirely outside the data:
    // extension kicks in and every bucket is the fill default
    let query = BucketQuery::default()
        .window(DAY0 + 10 * SECS_PER_DAY, DAY0 + 15 * SECS_PER_DAY)
        .buckets(5)
        .reducer(Reducer::Sum)
        .fill(-1.0);
    let result = aggregate(store.as_ref(), &key, &query).await.unwrap();

    assert_eq!(result.values, vec![-1.0; 5]);
    assert_eq!(result.data_begin, Some(DAY0));
    assert_eq!(result.data_end, Some(DAY0 + 2 * SECS_PER_DAY));
}

#[tokio::test]
async fn test_plain_path_skips_fill_accounting() {
    let store = Arc::new(MemoryStore::new());
    let key = org_metric("commits");
    let writer = SampleWriter::new(store.clone());
    writer.store_calc(&key, DAY0, 6.0).await.unwrap();
    writer
        .store_calc(&key, DAY0 + 8 * SECS_PER_DAY, 2.0)
        .await
        .unwrap();

    // Window inside the data bounds, mode left on Auto: buckets take the
    // plain range query, so the empty second bucket averages to 0 and the
    // fill default is never consulted
    let query = BucketQuery::default()
        .window(DAY0, DAY0 + 8 * SECS_PER_DAY)
        .buckets(2)
        .reducer(Reducer::Average)
        .fill(-1.0);
    let result = aggregate(store.as_ref(), &key, &query).await.unwrap();

    assert_eq!(result.values, vec![6.0, 0.0]);
}

#[tokio::test]
async fn test_per_day_mode_feeds_fill_into_reducer() {
    let store = Arc::new(MemoryStore::new());
    let key = org_metric("commits");
    let writer = SampleWriter::new(store.clone());
    writer.store_calc(&key, DAY0, 6.0).await.unwrap();
    writer
        .store_calc(&key, DAY0 + 8 * SECS_PER_DAY, 2.0)
        .await
        .unwrap();

    // Same window as above, but per-day mode: every absent day contributes
    // one fill entry, and the reducer sees it
    let query = BucketQuery::default()
        .window(DAY0, DAY0 + 8 * SECS_PER_DAY)
        .buckets(2)
        .reducer(Reducer::Average)
        .fill(-1.0);
    let result = aggregate(store.as_ref(), &key, &query.clone().per_day())
        .await
        .unwrap();

    // Bucket 1: [6, -1, -1, -1] -> 0.75; bucket 2: four fills -> -1
    assert_eq!(result.values, vec![0.75, -1.0]);
}

#[tokio::test]
async fn test_count_sees_every_collected_entry() {
    let store = Arc::new(MemoryStore::new());
    let key = org_metric("commits");
    let writer = SampleWriter::new(store.clone());
    // Two samples within the same day
    writer.store_calc(&key, DAY0 + 100, 1.0).await.unwrap();
    writer.store_calc(&key, DAY0 + 200, 1.0).await.unwrap();

    let query = BucketQuery::default()
        .window(DAY0, DAY0 + 2 * SECS_PER_DAY)
        .reducer(Reducer::Count)
        .per_day();
    let result = aggregate(store.as_ref(), &key, &query).await.unwrap();

    // Day 0 holds two real entries; day 1 holds its single fill entry
    assert_eq!(result.values, vec![2.0, 1.0]);
}

// ============================================================================
// Empty store fallback
// ============================================================================

#[tokio::test]
async fn test_empty_store_yields_all_fill() {
    let store = MemoryStore::new();

    let query = BucketQuery::default().buckets(3);
    let result = aggregate(&store, "metrics:org:missing", &query)
        .await
        .unwrap();

    assert_eq!(result.data_begin, None);
    assert_eq!(result.data_end, None);
    assert_eq!(result.values, vec![0.0, 0.0, 0.0]);
    assert_eq!(result.begin, 0);
    assert!(result.end > 0);
    assert!(result.step >= SECS_PER_DAY);
}

#[tokio::test]
async fn test_empty_store_daily_window() {
    let store = MemoryStore::new();

    let query = BucketQuery::default().window(DAY0, DAY0 + 3 * SECS_PER_DAY);
    let result = aggregate(&store, "metrics:org:missing", &query)
        .await
        .unwrap();

    assert_eq!(result.values, vec![0.0, 0.0, 0.0]);
    assert_eq!(result.step, SECS_PER_DAY);
}

#[tokio::test]
async fn test_empty_store_zero_buckets() {
    let store = MemoryStore::new();

    let query = BucketQuery::default()
        .window(DAY0, DAY0 + 3 * SECS_PER_DAY)
        .buckets(0);
    let result = aggregate(&store, "metrics:org:missing", &query)
        .await
        .unwrap();

    assert!(result.values.is_empty());
}

#[tokio::test]
async fn test_window_with_no_reachable_data_is_all_fill() {
    let store = Arc::new(MemoryStore::new());
    let key = org_metric("commits");
    seed_daily(&store, &key, 5..8).await;

    // Open begin bounded by an end that precedes all data: nothing to
    // anchor the window, so the all-fill fallback applies
    let query = BucketQuery::default()
        .window(None, DAY0 + 2 * SECS_PER_DAY)
        .buckets(4);
    let result = aggregate(store.as_ref(), &key, &query).await.unwrap();

    assert_eq!(result.data_begin, None);
    assert_eq!(result.values, vec![0.0; 4]);
}

// ============================================================================
// Error handling
// ============================================================================

#[tokio::test]
async fn test_malformed_member_is_a_hard_error() {
    let store = MemoryStore::new();
    let key = org_metric("commits");
    store.upsert(&key, DAY0, "not json at all").await.unwrap();

    let query = BucketQuery::default().window(DAY0, DAY0 + SECS_PER_DAY).buckets(1);
    let err = aggregate(&store, &key, &query).await.unwrap_err();

    match err {
        Error::MalformedSample { key: k, .. } => assert_eq!(k, key),
        other => panic!("expected MalformedSample, got {:?}", other),
    }
}

#[tokio::test]
async fn test_member_with_extra_fields_is_rejected() {
    let store = MemoryStore::new();
    let key = org_metric("commits");
    store
        .upsert(&key, DAY0, r#"{"t":1700006400,"v":1.0,"tag":"x"}"#)
        .await
        .unwrap();

    let query = BucketQuery::default().window(DAY0, DAY0 + SECS_PER_DAY).buckets(1);
    assert!(matches!(
        aggregate(&store, &key, &query).await,
        Err(Error::MalformedSample { .. })
    ));
}
