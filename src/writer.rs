//! Sample writer for metric calculators
//!
//! Periodic calculators push one `(timestamp, value)` sample per tick.
//! Writes are idempotent upserts keyed by timestamp: recalculating a tick
//! overwrites the previous sample instead of accumulating duplicates, so
//! writers may safely race concurrent read queries.

use crate::error::{Result, StoreError};
use crate::store::SampleStore;
use crate::types::Sample;

use std::sync::Arc;
use tracing::debug;

/// Writes calculated samples into a [`SampleStore`]
pub struct SampleWriter<S: SampleStore + ?Sized> {
    store: Arc<S>,
}

impl<S: SampleStore + ?Sized> SampleWriter<S> {
    /// Create a writer over the given store
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Get the underlying store
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Store one calculated sample under `key`, scored by its timestamp
    ///
    /// A sample already stored at exactly `timestamp` is overwritten.
    pub async fn store_calc(&self, key: &str, timestamp: i64, value: f64) -> Result<()> {
        let member = encode(timestamp, value)?;
        self.store.upsert(key, timestamp, &member).await?;
        debug!(key, timestamp, value, "stored sample");
        Ok(())
    }

    /// Store a batch of calculated samples in one store round trip
    pub async fn store_calc_batch(&self, key: &str, samples: &[(i64, f64)]) -> Result<()> {
        if samples.is_empty() {
            return Ok(());
        }

        let members = samples
            .iter()
            .map(|&(timestamp, value)| Ok((timestamp, encode(timestamp, value)?)))
            .collect::<Result<Vec<_>>>()?;

        self.store.upsert_many(key, &members).await?;
        debug!(key, count = samples.len(), "stored sample batch");
        Ok(())
    }
}

fn encode(timestamp: i64, value: f64) -> Result<String> {
    serde_json::to_string(&Sample::new(timestamp, value))
        .map_err(|e| StoreError::Serialization(e.to_string()).into())
}
