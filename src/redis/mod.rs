//! Redis integration for the sample store
//!
//! Metric samples live in Redis sorted sets: one set per metric key, each
//! member a JSON-encoded `{t, v}` sample scored by its timestamp.
//!
//! ```text
//! Redis Schema:
//! metrics:org:{metric}                    → ZSET(timestamp → sample JSON)
//! metrics:repo:{rid}:{metric}             → ZSET(timestamp → sample JSON)
//! metrics:user:{uid}:{metric}             → ZSET(timestamp → sample JSON)
//! metrics:repo:{rid}:user:{uid}:{metric}  → ZSET(timestamp → sample JSON)
//! ```
//!
//! # Features
//!
//! - Multiplexed connection guarded by a semaphore
//! - Exponential backoff retry with jitter
//! - Health checks and command metrics
//! - Credential-safe error messages
//!
//! # Example
//!
//! ```rust,no_run
//! use forge_metrics::redis::{RedisConfig, RedisSampleStore};
//! use forge_metrics::store::{SampleStore, ScoreBound};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = RedisSampleStore::connect(RedisConfig::default()).await?;
//! let members = store
//!     .range_ascending("metrics:org:commits", ScoreBound::NegInf, ScoreBound::PosInf, None)
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod connection;
pub mod store;
pub mod util;

pub use connection::{PoolMetricsSnapshot, RedisConfig, RedisPool, RetryPolicy};
pub use store::RedisSampleStore;
