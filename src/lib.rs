//! Forge Metrics - Redis-backed metric samples with bucketed aggregation
//!
//! This library backs a metrics dashboard for a software forge. Per-entity
//! (organization/user/repository) numeric samples are written to a
//! timestamp-ordered store on a schedule, and queries request an aggregated
//! view over a time window, broken into buckets:
//! - Range auto-discovery when the caller leaves the window open
//! - Adaptive step sizing (never finer than one day)
//! - Per-day gap filling so inactive days show an explicit default
//!
//! HTTP routing, capability-document generation, job scheduling, and
//! response serialization belong to the calling layer.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod aggregate;
pub mod error;
pub mod store;
pub mod types;
pub mod writer;

/// Configuration management with TOML support
pub mod config;

/// Redis integration for the sample store
/// Provides a sorted-set backed store with pooling and retry
pub mod redis;

// Re-export main types
pub use aggregate::{aggregate, BucketQuery, FillMode, Reducer};
pub use error::{Error, Result, StoreError};
pub use store::SampleStore;
pub use types::{AggregationResult, Sample};
pub use writer::SampleWriter;
