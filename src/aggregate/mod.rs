//! Bucketed aggregation over a timestamp-ordered sample store
//!
//! Turns a sparse, timestamp-ordered sample set into a fixed-shape sequence
//! of reduced values:
//!
//! 1. Discover the window bounds the caller left open, and the extremal
//!    timestamps actually stored
//! 2. Normalize the window to UTC day starts
//! 3. Size buckets: `max(1 day, window / num)`, or one bucket per day when
//!    no bucket count is given
//! 4. Walk buckets chronologically, collecting values per bucket
//! 5. Reduce each bucket with the selected [`Reducer`]
//!
//! The walk is two-tier: a plain range query per bucket by default, and a
//! per-day gap-filled walk when the requested window extends past the
//! stored data or the caller asks for per-day granularity. Dashboards need
//! an explicit default for inactive days rather than a silently compressed
//! axis, which is what the per-day tier provides.
//!
//! # Example
//!
//! ```rust
//! use forge_metrics::aggregate::{aggregate, BucketQuery, Reducer};
//! use forge_metrics::store::MemoryStore;
//! use forge_metrics::writer::SampleWriter;
//! use std::sync::Arc;
//!
//! # async fn example() -> forge_metrics::Result<()> {
//! let store = Arc::new(MemoryStore::new());
//! let writer = SampleWriter::new(store.clone());
//! writer.store_calc("metrics:org:commits", 1_438_905_600, 12.0).await?;
//!
//! let query = BucketQuery::default().buckets(7).reducer(Reducer::Sum);
//! let result = aggregate(store.as_ref(), "metrics:org:commits", &query).await?;
//! assert_eq!(result.values.len(), 7);
//! # Ok(())
//! # }
//! ```

mod reducer;

pub use reducer::Reducer;

use crate::error::{Error, Result};
use crate::store::{RangeLimit, SampleStore, ScoreBound, ScoredMember};
use crate::types::{AggregationResult, Sample};

use chrono::Utc;
use tracing::debug;

/// Seconds per UTC calendar day, the finest bucket granularity
pub const SECS_PER_DAY: i64 = 86_400;

/// How bucket values are collected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FillMode {
    /// One range query per bucket; the per-day gap-filled walk is used only
    /// when the requested window extends past the stored data
    #[default]
    Auto,
    /// Always walk buckets day by day, substituting the fill default for
    /// days absent from the store
    PerDay,
}

/// A bucketed aggregation request
///
/// `begin`/`end` left as `None` are discovered from the stored data.
/// `num` is the bucket count; `None` and `Some(0)` both mean one bucket
/// per day across the window.
#[derive(Debug, Clone, PartialEq)]
pub struct BucketQuery {
    /// Window start, epoch seconds; discovered when `None`
    pub begin: Option<i64>,

    /// Window end, epoch seconds; discovered when `None`
    pub end: Option<i64>,

    /// Number of buckets; `None`/`Some(0)` mean one bucket per day
    pub num: Option<u32>,

    /// Reducer applied per bucket
    pub reducer: Reducer,

    /// Default value substituted for days absent from the store
    pub fill: f64,

    /// Bucket collection mode
    pub mode: FillMode,
}

impl Default for BucketQuery {
    fn default() -> Self {
        Self {
            begin: None,
            end: None,
            num: None,
            reducer: Reducer::default(),
            fill: 0.0,
            mode: FillMode::default(),
        }
    }
}

impl BucketQuery {
    /// Set the window bounds
    pub fn window(mut self, begin: impl Into<Option<i64>>, end: impl Into<Option<i64>>) -> Self {
        self.begin = begin.into();
        self.end = end.into();
        self
    }

    /// Set the bucket count
    pub fn buckets(mut self, num: u32) -> Self {
        self.num = Some(num);
        self
    }

    /// Set the reducer
    pub fn reducer(mut self, reducer: Reducer) -> Self {
        self.reducer = reducer;
        self
    }

    /// Set the fill default for absent days
    pub fn fill(mut self, fill: f64) -> Self {
        self.fill = fill;
        self
    }

    /// Request per-day granularity with explicit gap filling
    pub fn per_day(mut self) -> Self {
        self.mode = FillMode::PerDay;
        self
    }

    fn bucket_count(&self) -> Option<u32> {
        match self.num {
            Some(n) if n > 0 => Some(n),
            _ => None,
        }
    }
}

/// Aggregate the samples under `key` into reduced buckets
///
/// # Arguments
///
/// * `store` - Sample store backend
/// * `key` - Metric key to aggregate
/// * `query` - Window, bucket count, reducer, fill and mode
///
/// # Returns
///
/// An [`AggregationResult`] with one reduced value per bucket. A key with
/// no samples at all is not an error: the result carries
/// `data_begin = data_end = None` and an all-fill value sequence over a
/// window defaulted to `[0, now]`.
///
/// # Errors
///
/// Returns [`Error::Store`] when the backend fails and
/// [`Error::MalformedSample`] when a stored member does not decode as a
/// `{t, v}` sample.
pub async fn aggregate<S>(store: &S, key: &str, query: &BucketQuery) -> Result<AggregationResult>
where
    S: SampleStore + ?Sized,
{
    let Some(bounds) = discover_bounds(store, key, query.begin, query.end).await? else {
        debug!(key, "no stored samples, returning all-fill result");
        return Ok(all_fill_result(query));
    };
    let (begin, end, data_begin, data_end) = bounds;

    // Windows snap to UTC day starts before bucketing
    let begin = day_floor(begin);
    let end = day_floor(end);

    let window = (end - begin).max(0);
    let step = match query.bucket_count() {
        Some(num) => (window / i64::from(num)).max(SECS_PER_DAY),
        None => SECS_PER_DAY,
    };

    let extend = query.mode == FillMode::PerDay || begin < data_begin || end > data_end;

    debug!(
        key,
        begin, end, step, extend, "walking buckets"
    );

    let mut values = Vec::new();
    match query.bucket_count() {
        Some(num) => {
            values.reserve(num as usize);
            for i in 0..i64::from(num) {
                let bucket_begin = begin + i * step;
                values.push(
                    reduce_bucket(
                        store,
                        key,
                        bucket_begin,
                        bucket_begin + step,
                        extend,
                        data_begin,
                        data_end,
                        query,
                    )
                    .await?,
                );
            }
        }
        None => {
            let mut day = begin;
            while day < end {
                values.push(
                    reduce_bucket(
                        store,
                        key,
                        day,
                        day + SECS_PER_DAY,
                        extend,
                        data_begin,
                        data_end,
                        query,
                    )
                    .await?,
                );
                day += SECS_PER_DAY;
            }
        }
    }

    Ok(AggregationResult {
        begin,
        end,
        data_begin: Some(data_begin),
        data_end: Some(data_end),
        step,
        values,
    })
}

/// Resolve the window and data bounds for `key`
///
/// Returns `(begin, end, data_begin, data_end)`, or `None` when the store
/// holds nothing the window could anchor to. An unset `begin` becomes the
/// earliest timestamp at or before `end`; an unset `end` becomes the latest
/// timestamp at or after `begin`. Given bounds are kept as-is and the data
/// bounds are discovered independently from the extremal members.
async fn discover_bounds<S>(
    store: &S,
    key: &str,
    begin: Option<i64>,
    end: Option<i64>,
) -> Result<Option<(i64, i64, i64, i64)>>
where
    S: SampleStore + ?Sized,
{
    let first = RangeLimit::first();

    let (begin, data_begin) = match begin {
        None => {
            let max = end.map_or(ScoreBound::PosInf, ScoreBound::At);
            match earliest(store, key, max, first).await? {
                Some(score) => (score, score),
                None => return Ok(None),
            }
        }
        Some(begin) => match earliest(store, key, ScoreBound::PosInf, first).await? {
            Some(score) => (begin, score),
            None => return Ok(None),
        },
    };

    let (end, data_end) = match end {
        None => {
            match latest(store, key, ScoreBound::At(begin), first).await? {
                Some(score) => (score, score),
                None => return Ok(None),
            }
        }
        Some(end) => match latest(store, key, ScoreBound::NegInf, first).await? {
            Some(score) => (end, score),
            None => return Ok(None),
        },
    };

    Ok(Some((begin, end, data_begin, data_end)))
}

async fn earliest<S>(
    store: &S,
    key: &str,
    max: ScoreBound,
    limit: RangeLimit,
) -> Result<Option<i64>>
where
    S: SampleStore + ?Sized,
{
    let members = store
        .range_ascending(key, ScoreBound::NegInf, max, Some(limit))
        .await?;
    Ok(members.first().map(|m| m.score))
}

async fn latest<S>(store: &S, key: &str, min: ScoreBound, limit: RangeLimit) -> Result<Option<i64>>
where
    S: SampleStore + ?Sized,
{
    let members = store
        .range_descending(key, ScoreBound::PosInf, min, Some(limit))
        .await?;
    Ok(members.first().map(|m| m.score))
}

/// Collect and reduce one bucket spanning `[begin, end)`
#[allow(clippy::too_many_arguments)]
async fn reduce_bucket<S>(
    store: &S,
    key: &str,
    begin: i64,
    end: i64,
    extend: bool,
    data_begin: i64,
    data_end: i64,
    query: &BucketQuery,
) -> Result<f64>
where
    S: SampleStore + ?Sized,
{
    let collected = if extend {
        collect_by_day(store, key, begin, end, data_begin, data_end, query.fill).await?
    } else {
        collect_range(store, key, begin, end).await?
    };
    Ok(query.reducer.apply(&collected))
}

/// Plain bucket collection: one range query, every value found, no padding
async fn collect_range<S>(store: &S, key: &str, begin: i64, end: i64) -> Result<Vec<f64>>
where
    S: SampleStore + ?Sized,
{
    let members = store
        .range_ascending(key, ScoreBound::At(begin), ScoreBound::At(end - 1), None)
        .await?;
    decode_values(key, &members)
}

/// Gap-extended bucket collection: one entry per calendar day
///
/// Days lying wholly before the first stored day or after the last one
/// contribute the fill default without touching the store; every other day
/// is queried and contributes its values, or one fill entry when empty.
/// The day sequence is materialized exactly once per bucket.
async fn collect_by_day<S>(
    store: &S,
    key: &str,
    begin: i64,
    end: i64,
    data_begin: i64,
    data_end: i64,
    fill: f64,
) -> Result<Vec<f64>>
where
    S: SampleStore + ?Sized,
{
    let first_data_day = day_floor(data_begin);
    let last_data_day = day_floor(data_end);

    let mut collected = Vec::new();
    let mut day = begin;
    while day < end {
        if day < first_data_day || day > last_data_day {
            collected.push(fill);
        } else {
            let members = store
                .range_ascending(
                    key,
                    ScoreBound::At(day),
                    ScoreBound::At(day + SECS_PER_DAY - 1),
                    None,
                )
                .await?;
            if members.is_empty() {
                collected.push(fill);
            } else {
                collected.extend(decode_values(key, &members)?);
            }
        }
        day += SECS_PER_DAY;
    }
    Ok(collected)
}

/// Strictly decode stored members into their values
fn decode_values(key: &str, members: &[ScoredMember]) -> Result<Vec<f64>> {
    members
        .iter()
        .map(|m| {
            serde_json::from_str::<Sample>(&m.member)
                .map(|sample| sample.v)
                .map_err(|source| Error::MalformedSample {
                    key: key.to_string(),
                    source,
                })
        })
        .collect()
}

/// All-fill fallback for a key with no stored samples
///
/// The window keeps whatever bounds the caller gave, defaulting a missing
/// `begin` to 0 and a missing `end` to now. A positive `num` yields that
/// many fill values, `Some(0)` yields none, and an unset `num` yields one
/// per day of the window.
fn all_fill_result(query: &BucketQuery) -> AggregationResult {
    let begin = query.begin.unwrap_or(0);
    let end = query.end.unwrap_or_else(|| Utc::now().timestamp());
    let window = (end - begin).max(0);

    let (step, len) = match query.num {
        Some(num) if num > 0 => (
            (window / i64::from(num)).max(SECS_PER_DAY),
            num as usize,
        ),
        Some(_) => (SECS_PER_DAY, 0),
        None => (SECS_PER_DAY, div_ceil_days(window) as usize),
    };

    AggregationResult {
        begin,
        end,
        data_begin: None,
        data_end: None,
        step,
        values: vec![query.fill; len],
    }
}

/// Start of the UTC calendar day containing `ts`
fn day_floor(ts: i64) -> i64 {
    ts.div_euclid(SECS_PER_DAY) * SECS_PER_DAY
}

fn div_ceil_days(window: i64) -> i64 {
    (window + SECS_PER_DAY - 1) / SECS_PER_DAY
}
