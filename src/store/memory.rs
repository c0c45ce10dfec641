//! In-memory sample store
//!
//! A lightweight alternative to Redis for unit and integration testing.
//! Stores every key as a `BTreeMap` from score to member, which gives the
//! same ordered range semantics as a sorted set with one member per score.
//! Not suitable for production: all data is lost on drop.

use super::{RangeLimit, SampleStore, ScoreBound, ScoredMember};
use crate::error::StoreError;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};

/// In-memory store keyed by metric, ordered by timestamp score
#[derive(Debug, Default)]
pub struct MemoryStore {
    keys: RwLock<HashMap<String, BTreeMap<i64, String>>>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of members stored under `key`
    pub fn len(&self, key: &str) -> usize {
        self.keys.read().get(key).map_or(0, BTreeMap::len)
    }

    /// Whether `key` holds no members
    pub fn is_empty(&self, key: &str) -> bool {
        self.len(key) == 0
    }

    fn collect(
        &self,
        key: &str,
        min: ScoreBound,
        max: ScoreBound,
        limit: Option<RangeLimit>,
        descending: bool,
    ) -> Vec<ScoredMember> {
        let guard = self.keys.read();
        let Some(members) = guard.get(key) else {
            return Vec::new();
        };

        let (lo, hi) = (min.floor(), max.floor());
        if lo > hi {
            return Vec::new();
        }

        let in_range = members
            .range(lo..=hi)
            .map(|(score, member)| ScoredMember {
                member: member.clone(),
                score: *score,
            });

        let ordered: Vec<ScoredMember> = if descending {
            in_range.rev().collect()
        } else {
            in_range.collect()
        };

        match limit {
            Some(RangeLimit { start, count }) => {
                ordered.into_iter().skip(start).take(count).collect()
            }
            None => ordered,
        }
    }
}

#[async_trait]
impl SampleStore for MemoryStore {
    async fn range_ascending(
        &self,
        key: &str,
        min: ScoreBound,
        max: ScoreBound,
        limit: Option<RangeLimit>,
    ) -> Result<Vec<ScoredMember>, StoreError> {
        Ok(self.collect(key, min, max, limit, false))
    }

    async fn range_descending(
        &self,
        key: &str,
        max: ScoreBound,
        min: ScoreBound,
        limit: Option<RangeLimit>,
    ) -> Result<Vec<ScoredMember>, StoreError> {
        Ok(self.collect(key, min, max, limit, true))
    }

    async fn upsert(&self, key: &str, score: i64, member: &str) -> Result<(), StoreError> {
        self.keys
            .write()
            .entry(key.to_string())
            .or_default()
            .insert(score, member.to_string());
        Ok(())
    }
}
