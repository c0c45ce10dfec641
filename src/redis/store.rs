//! Sorted-set backed sample store
//!
//! Implements [`SampleStore`] on Redis sorted sets. Range queries map to
//! `ZRANGEBYSCORE`/`ZREVRANGEBYSCORE` with `WITHSCORES` (and `LIMIT` when
//! capped); upserts remove whatever member sits at the exact score before
//! adding the new one, so a timestamp holds at most one sample.

use crate::error::StoreError;
use crate::store::{RangeLimit, SampleStore, ScoreBound, ScoredMember};

use super::connection::{RedisConfig, RedisPool};

use async_trait::async_trait;
use redis::AsyncCommands;
use std::sync::Arc;
use tracing::debug;

/// Redis-backed sample store
pub struct RedisSampleStore {
    pool: Arc<RedisPool>,
}

impl RedisSampleStore {
    /// Connect to Redis and build a store over a fresh pool
    pub async fn connect(config: RedisConfig) -> Result<Self, StoreError> {
        let pool = Arc::new(RedisPool::new(config).await?);
        debug!("Redis sample store initialized");
        Ok(Self { pool })
    }

    /// Build a store over an existing pool
    pub fn from_pool(pool: Arc<RedisPool>) -> Self {
        Self { pool }
    }

    /// Get the underlying pool
    pub fn pool(&self) -> &RedisPool {
        &self.pool
    }

    fn cast_scored(raw: Vec<(String, f64)>) -> Vec<ScoredMember> {
        raw.into_iter()
            .map(|(member, score)| ScoredMember {
                member,
                // Scores are epoch-seconds timestamps written as integers
                score: score as i64,
            })
            .collect()
    }
}

#[async_trait]
impl SampleStore for RedisSampleStore {
    async fn range_ascending(
        &self,
        key: &str,
        min: ScoreBound,
        max: ScoreBound,
        limit: Option<RangeLimit>,
    ) -> Result<Vec<ScoredMember>, StoreError> {
        let raw: Vec<(String, f64)> = self
            .pool
            .execute(|mut conn| {
                let key = key.to_string();
                let min = min.to_string();
                let max = max.to_string();
                async move {
                    match limit {
                        Some(RangeLimit { start, count }) => {
                            conn.zrangebyscore_limit_withscores(
                                &key,
                                &min,
                                &max,
                                start as isize,
                                count as isize,
                            )
                            .await
                        }
                        None => conn.zrangebyscore_withscores(&key, &min, &max).await,
                    }
                }
            })
            .await?;

        Ok(Self::cast_scored(raw))
    }

    async fn range_descending(
        &self,
        key: &str,
        max: ScoreBound,
        min: ScoreBound,
        limit: Option<RangeLimit>,
    ) -> Result<Vec<ScoredMember>, StoreError> {
        let raw: Vec<(String, f64)> = self
            .pool
            .execute(|mut conn| {
                let key = key.to_string();
                let max = max.to_string();
                let min = min.to_string();
                async move {
                    match limit {
                        Some(RangeLimit { start, count }) => {
                            conn.zrevrangebyscore_limit_withscores(
                                &key,
                                &max,
                                &min,
                                start as isize,
                                count as isize,
                            )
                            .await
                        }
                        None => conn.zrevrangebyscore_withscores(&key, &max, &min).await,
                    }
                }
            })
            .await?;

        Ok(Self::cast_scored(raw))
    }

    async fn upsert(&self, key: &str, score: i64, member: &str) -> Result<(), StoreError> {
        self.pool
            .execute(|mut conn| {
                let key = key.to_string();
                let member = member.to_string();
                async move {
                    let mut pipe = redis::pipe();
                    pipe.zrembyscore(&key, score, score)
                        .ignore()
                        .zadd(&key, &member, score)
                        .ignore();
                    pipe.query_async::<()>(&mut conn).await
                }
            })
            .await
    }

    async fn upsert_many(&self, key: &str, members: &[(i64, String)]) -> Result<(), StoreError> {
        if members.is_empty() {
            return Ok(());
        }

        self.pool
            .execute(|mut conn| {
                let key = key.to_string();
                let members = members.to_vec();
                async move {
                    let mut pipe = redis::pipe();
                    for (score, member) in &members {
                        pipe.zrembyscore(&key, *score, *score)
                            .ignore()
                            .zadd(&key, member, *score)
                            .ignore();
                    }
                    pipe.query_async::<()>(&mut conn).await
                }
            })
            .await
    }
}
