//! Redis connection pool with health checking and retry logic
//!
//! Redis multiplexes commands over a single connection, so the pool keeps
//! one multiplexed connection and bounds concurrent commands with a
//! semaphore. Failed commands are retried with exponential backoff and
//! jitter; connection errors trigger a reconnect between attempts.
//!
//! # Example
//!
//! ```rust,no_run
//! use forge_metrics::redis::{RedisConfig, RedisPool};
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = RedisConfig::with_url("redis://localhost:6379")
//!     .command_timeout(Duration::from_secs(1));
//! let pool = RedisPool::new(config).await?;
//! # Ok(())
//! # }
//! ```

use crate::error::StoreError;
use redis::aio::MultiplexedConnection;
use redis::{Client, RedisError};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{RwLock, Semaphore};
use tracing::{debug, warn};

use super::util::safe_redis_error;

/// Configuration for the Redis connection pool
#[derive(Clone, Debug)]
pub struct RedisConfig {
    /// Redis server URL (e.g. "redis://localhost:6379")
    pub url: String,

    /// Maximum number of concurrent commands
    /// Default: 16
    pub pool_size: u32,

    /// Timeout for establishing new connections
    /// Default: 5 seconds
    pub connection_timeout: Duration,

    /// Timeout for individual Redis commands
    /// Default: 1 second
    pub command_timeout: Duration,

    /// Retry policy for failed operations
    pub retry_policy: RetryPolicy,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: "redis://127.0.0.1:6379".to_string(),
            pool_size: 16,
            connection_timeout: Duration::from_secs(5),
            command_timeout: Duration::from_secs(1),
            retry_policy: RetryPolicy::default(),
        }
    }
}

impl RedisConfig {
    /// Create a new config with the specified URL
    pub fn with_url(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    /// Set the maximum number of concurrent commands
    pub fn pool_size(mut self, size: u32) -> Self {
        self.pool_size = size;
        self
    }

    /// Set the connection timeout
    pub fn connection_timeout(mut self, timeout: Duration) -> Self {
        self.connection_timeout = timeout;
        self
    }

    /// Set the command timeout
    pub fn command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }

    /// Set the retry policy
    pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.url.is_empty() {
            return Err("Redis URL cannot be empty".to_string());
        }
        if self.pool_size == 0 {
            return Err("Pool size must be greater than 0".to_string());
        }
        if self.pool_size > 1000 {
            return Err("Pool size cannot exceed 1000".to_string());
        }
        Ok(())
    }
}

/// Retry policy with exponential backoff
#[derive(Clone, Debug)]
pub struct RetryPolicy {
    /// Maximum number of retry attempts
    /// Default: 3
    pub max_retries: u32,

    /// Initial delay between retries
    /// Default: 100ms
    pub initial_delay: Duration,

    /// Maximum delay between retries
    /// Default: 5 seconds
    pub max_delay: Duration,

    /// Multiplier for exponential backoff
    /// Default: 2.0
    pub multiplier: f64,

    /// Add random jitter to delays
    /// Default: true
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(5),
            multiplier: 2.0,
            jitter: true,
        }
    }
}

impl RetryPolicy {
    /// Calculate delay for a given attempt number (0-indexed)
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let base_delay =
            self.initial_delay.as_millis() as f64 * self.multiplier.powi(attempt as i32);
        let delay_ms = base_delay.min(self.max_delay.as_millis() as f64);

        let final_delay = if self.jitter {
            // Up to 25% jitter
            delay_ms * (1.0 + rand::random::<f64>() * 0.25)
        } else {
            delay_ms
        };

        Duration::from_millis(final_delay as u64)
    }

    /// Check if we should retry after the given attempt
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_retries
    }
}

/// Command counters for the pool
#[derive(Debug, Default)]
pub struct PoolMetrics {
    /// Successful connections established
    pub connections_created: AtomicU64,

    /// Connection failures
    pub connection_failures: AtomicU64,

    /// Commands executed
    pub commands_executed: AtomicU64,

    /// Command failures
    pub command_failures: AtomicU64,

    /// Retry attempts
    pub retries: AtomicU64,
}

impl PoolMetrics {
    /// Get a snapshot of the counters
    pub fn snapshot(&self) -> PoolMetricsSnapshot {
        PoolMetricsSnapshot {
            connections_created: self.connections_created.load(Ordering::Relaxed),
            connection_failures: self.connection_failures.load(Ordering::Relaxed),
            commands_executed: self.commands_executed.load(Ordering::Relaxed),
            command_failures: self.command_failures.load(Ordering::Relaxed),
            retries: self.retries.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of pool counters at a point in time
#[derive(Debug, Clone)]
pub struct PoolMetricsSnapshot {
    /// Connections established during pool lifetime
    pub connections_created: u64,
    /// Connection failures during pool lifetime
    pub connection_failures: u64,
    /// Commands executed through the pool
    pub commands_executed: u64,
    /// Command failures encountered
    pub command_failures: u64,
    /// Retry attempts made for failed operations
    pub retries: u64,
}

/// Redis connection pool
///
/// Holds one multiplexed connection, reconnecting on demand, and bounds
/// concurrent commands with a semaphore sized by `pool_size`.
pub struct RedisPool {
    client: Client,
    connection: RwLock<Option<MultiplexedConnection>>,
    config: RedisConfig,
    metrics: Arc<PoolMetrics>,
    semaphore: Arc<Semaphore>,
}

impl RedisPool {
    /// Create a new pool and establish the initial connection
    pub async fn new(config: RedisConfig) -> Result<Self, StoreError> {
        config.validate().map_err(StoreError::Connection)?;

        let client = Client::open(config.url.as_str())
            .map_err(|e| StoreError::Connection(safe_redis_error(&config.url, &e)))?;

        let pool = Self {
            client,
            connection: RwLock::new(None),
            semaphore: Arc::new(Semaphore::new(config.pool_size as usize)),
            metrics: Arc::new(PoolMetrics::default()),
            config,
        };

        pool.connect().await?;

        debug!("Redis connection pool initialized");
        Ok(pool)
    }

    /// Establish or re-establish the connection
    async fn connect(&self) -> Result<(), StoreError> {
        let start = Instant::now();

        let conn_future = self.client.get_multiplexed_async_connection();
        let conn = tokio::time::timeout(self.config.connection_timeout, conn_future)
            .await
            .map_err(|_| {
                self.metrics
                    .connection_failures
                    .fetch_add(1, Ordering::Relaxed);
                StoreError::Connection("Connection timeout".to_string())
            })?
            .map_err(|e| {
                self.metrics
                    .connection_failures
                    .fetch_add(1, Ordering::Relaxed);
                StoreError::Connection(safe_redis_error(&self.config.url, &e))
            })?;

        *self.connection.write().await = Some(conn);
        self.metrics
            .connections_created
            .fetch_add(1, Ordering::Relaxed);

        debug!("Redis connection established in {:?}", start.elapsed());
        Ok(())
    }

    async fn current_connection(&self) -> Result<MultiplexedConnection, StoreError> {
        if let Some(conn) = self.connection.read().await.clone() {
            return Ok(conn);
        }
        self.connect().await?;
        self.connection
            .read()
            .await
            .clone()
            .ok_or_else(|| StoreError::Connection("No connection available".to_string()))
    }

    /// Execute a command with timeout and retry
    ///
    /// # Arguments
    ///
    /// * `f` - Async function that takes a connection and returns a result
    pub async fn execute<F, Fut, T>(&self, f: F) -> Result<T, StoreError>
    where
        F: Fn(MultiplexedConnection) -> Fut,
        Fut: std::future::Future<Output = Result<T, RedisError>>,
    {
        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|_| StoreError::Connection("Semaphore closed".to_string()))?;

        let mut attempt = 0;
        loop {
            let conn = self.current_connection().await?;
            let result = tokio::time::timeout(self.config.command_timeout, f(conn)).await;

            match result {
                Ok(Ok(value)) => {
                    self.metrics
                        .commands_executed
                        .fetch_add(1, Ordering::Relaxed);
                    return Ok(value);
                }
                Ok(Err(e)) => {
                    self.metrics
                        .command_failures
                        .fetch_add(1, Ordering::Relaxed);

                    if self.config.retry_policy.should_retry(attempt) && is_retriable_error(&e) {
                        self.metrics.retries.fetch_add(1, Ordering::Relaxed);
                        let delay = self.config.retry_policy.delay_for_attempt(attempt);
                        warn!(
                            "Redis command failed (attempt {}), retrying in {:?}: {}",
                            attempt + 1,
                            delay,
                            e
                        );
                        tokio::time::sleep(delay).await;

                        if is_connection_error(&e) {
                            let _ = self.connect().await;
                        }

                        attempt += 1;
                        continue;
                    }

                    return Err(StoreError::Connection(safe_redis_error(
                        &self.config.url,
                        &e,
                    )));
                }
                Err(_) => {
                    self.metrics
                        .command_failures
                        .fetch_add(1, Ordering::Relaxed);

                    if self.config.retry_policy.should_retry(attempt) {
                        self.metrics.retries.fetch_add(1, Ordering::Relaxed);
                        let delay = self.config.retry_policy.delay_for_attempt(attempt);
                        warn!(
                            "Redis command timeout (attempt {}), retrying in {:?}",
                            attempt + 1,
                            delay
                        );
                        tokio::time::sleep(delay).await;
                        attempt += 1;
                        continue;
                    }

                    return Err(StoreError::Timeout);
                }
            }
        }
    }

    /// Send a PING and report whether it succeeded
    pub async fn health_check(&self) -> bool {
        self.execute(|mut conn| async move {
            redis::cmd("PING").query_async::<String>(&mut conn).await
        })
        .await
        .is_ok()
    }

    /// Get pool counters
    pub fn metrics(&self) -> PoolMetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Get the pool configuration
    pub fn config(&self) -> &RedisConfig {
        &self.config
    }
}

/// Check if an error is retriable
fn is_retriable_error(e: &RedisError) -> bool {
    e.is_connection_dropped()
        || e.is_timeout()
        || e.is_io_error()
        || matches!(e.kind(), redis::ErrorKind::BusyLoadingError)
}

/// Check if an error requires reconnection
fn is_connection_error(e: &RedisError) -> bool {
    e.is_connection_dropped() || e.is_io_error()
}
