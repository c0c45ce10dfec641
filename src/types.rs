//! Core data types for metric samples and aggregation results
//!
//! # Key Types
//!
//! - **`Sample`**: a single measurement (timestamp + value), stored as the
//!   JSON member of a sorted set, scored by its timestamp
//! - **`AggregationResult`**: the fixed-shape answer to a bucketed query
//!
//! Metric keys are opaque strings; the `*_metric` helpers build the
//! conventional `metrics:{scope}:...` keys for the entity scopes the
//! dashboard exposes.

use serde::{Deserialize, Serialize};

/// Key prefix for all metric sorted sets
const KEY_PREFIX: &str = "metrics:";

/// A single stored measurement
///
/// The member stored in the sorted set is the JSON form of this struct,
/// e.g. `{"t":1438905600,"v":12.0}`, scored by `t`. Decoding is strict:
/// unknown or missing fields are a hard error, not a silent default.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Sample {
    /// Unix timestamp in seconds
    pub t: i64,

    /// Measurement value
    pub v: f64,
}

impl Sample {
    /// Create a new sample
    pub fn new(t: i64, v: f64) -> Self {
        Self { t, v }
    }
}

/// Result of a bucketed aggregation query
///
/// `begin`/`end` are the window actually used (discovered bounds where the
/// caller left them open, then normalized to UTC day starts), while
/// `data_begin`/`data_end` are the extremal timestamps actually present in
/// the store. They are `None` when the key holds no samples at all.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregationResult {
    /// Start of the aggregated window (UTC day start, seconds)
    pub begin: i64,

    /// End of the aggregated window (UTC day start, seconds)
    pub end: i64,

    /// Earliest stored timestamp, if any
    pub data_begin: Option<i64>,

    /// Latest stored timestamp, if any
    pub data_end: Option<i64>,

    /// Bucket width in seconds, never below one day
    pub step: i64,

    /// One reduced value per bucket, chronological
    pub values: Vec<f64>,
}

/// Key for an organization-wide metric, e.g. `metrics:org:commits`
pub fn org_metric(metric: &str) -> String {
    format!("{}org:{}", KEY_PREFIX, metric)
}

/// Key for a per-repository metric, e.g. `metrics:repo:42:commits`
pub fn repo_metric(rid: &str, metric: &str) -> String {
    format!("{}repo:{}:{}", KEY_PREFIX, rid, metric)
}

/// Key for a per-user metric, e.g. `metrics:user:alice:commits`
pub fn user_metric(uid: &str, metric: &str) -> String {
    format!("{}user:{}:{}", KEY_PREFIX, uid, metric)
}

/// Key for a metric scoped to one user within one repository
pub fn user_repo_metric(rid: &str, uid: &str, metric: &str) -> String {
    format!("{}repo:{}:user:{}:{}", KEY_PREFIX, rid, uid, metric)
}
