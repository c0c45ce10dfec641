//! Sample store abstraction
//!
//! The aggregation engine talks to an ordered associative store: metric key
//! maps to a set of members positioned by a timestamp score, queryable by
//! score range in either direction. Redis sorted sets are the production
//! backend ([`crate::redis::RedisSampleStore`]); [`MemoryStore`] serves
//! tests and prototyping.
//!
//! An empty range result is not an error - it signals "no data" and the
//! aggregator falls back to an all-fill response.

mod memory;

pub use memory::MemoryStore;

use crate::error::StoreError;
use async_trait::async_trait;
use std::fmt;

/// One end of a score range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreBound {
    /// Unbounded below
    NegInf,
    /// Unbounded above
    PosInf,
    /// Inclusive bound at the given score
    At(i64),
}

impl ScoreBound {
    /// Concrete lower value for in-memory range scans
    pub fn floor(self) -> i64 {
        match self {
            ScoreBound::NegInf => i64::MIN,
            ScoreBound::PosInf => i64::MAX,
            ScoreBound::At(score) => score,
        }
    }
}

/// Renders the Redis wire form: `-inf`, `+inf`, or the score itself
impl fmt::Display for ScoreBound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScoreBound::NegInf => write!(f, "-inf"),
            ScoreBound::PosInf => write!(f, "+inf"),
            ScoreBound::At(score) => write!(f, "{}", score),
        }
    }
}

/// Offset and cap for a range query, `LIMIT start count` in Redis terms
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeLimit {
    /// Number of leading matches to skip
    pub start: usize,
    /// Maximum number of matches to return
    pub count: usize,
}

impl RangeLimit {
    /// Cap a query to its first match
    pub fn first() -> Self {
        Self { start: 0, count: 1 }
    }
}

/// A member together with its integer score
///
/// Backends score members with floats on the wire; implementations cast
/// scores to integers before returning them, since a score here is always
/// an epoch-seconds timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredMember {
    /// The stored member, a JSON-encoded [`Sample`](crate::types::Sample)
    pub member: String,
    /// Timestamp score
    pub score: i64,
}

/// Ordered associative store of timestamp-scored members
#[async_trait]
pub trait SampleStore: Send + Sync {
    /// Members with scores in `[min, max]`, ascending by score
    async fn range_ascending(
        &self,
        key: &str,
        min: ScoreBound,
        max: ScoreBound,
        limit: Option<RangeLimit>,
    ) -> Result<Vec<ScoredMember>, StoreError>;

    /// Members with scores in `[min, max]`, descending by score
    async fn range_descending(
        &self,
        key: &str,
        max: ScoreBound,
        min: ScoreBound,
        limit: Option<RangeLimit>,
    ) -> Result<Vec<ScoredMember>, StoreError>;

    /// Insert `member` at `score`, replacing whatever was stored at exactly
    /// that score. This keeps writes idempotent per timestamp.
    async fn upsert(&self, key: &str, score: i64, member: &str) -> Result<(), StoreError>;

    /// Upsert a batch of members. Backends override this with a pipelined
    /// round trip; the default loops over [`SampleStore::upsert`].
    async fn upsert_many(&self, key: &str, members: &[(i64, String)]) -> Result<(), StoreError> {
        for (score, member) in members {
            self.upsert(key, *score, member).await?;
        }
        Ok(())
    }
}
