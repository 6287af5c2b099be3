//! Pipeline concurrency and retry configuration.

use std::time::Duration;

use crate::pipeline::{RetryPolicy, DEFAULT_BACKOFF_MULTIPLIER};

/// Default number of fetcher threads.
pub const DEFAULT_WORKERS: usize = 20;

/// Default capacity of each bounded pipeline queue.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 256;

/// Default fetch attempts per tile.
pub const DEFAULT_MAX_ATTEMPTS: u32 = crate::pipeline::DEFAULT_MAX_ATTEMPTS;

/// Default delay after the first failed fetch.
pub const DEFAULT_INITIAL_BACKOFF_MS: u64 = crate::pipeline::DEFAULT_INITIAL_DELAY_MS;

/// Default backoff cap.
pub const DEFAULT_MAX_BACKOFF_MS: u64 = crate::pipeline::DEFAULT_MAX_DELAY_MS;

/// Configuration consumed by the pipeline orchestrator.
///
/// # Example
///
/// ```
/// use tilepyramid::config::DownloadConfig;
/// use tilepyramid::pipeline::RetryPolicy;
///
/// let config = DownloadConfig::new()
///     .with_workers(8)
///     .with_retry_policy(RetryPolicy::None);
/// assert_eq!(config.workers(), 8);
/// assert_eq!(config.retry_policy().max_attempts(), 1);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DownloadConfig {
    workers: usize,
    channel_capacity: usize,
    retry_policy: RetryPolicy,
}

impl DownloadConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of concurrent fetchers. Zero is raised to one.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Bound of the request, fetched and acknowledgment queues.
    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity.max(1);
        self
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    /// Exponential backoff with explicit bounds; one attempt disables retries.
    pub fn with_backoff(mut self, max_attempts: u32, initial: Duration, max: Duration) -> Self {
        self.retry_policy = if max_attempts <= 1 {
            RetryPolicy::None
        } else {
            RetryPolicy::ExponentialBackoff {
                max_attempts,
                initial_delay: initial,
                max_delay: max,
                multiplier: DEFAULT_BACKOFF_MULTIPLIER,
            }
        };
        self
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn channel_capacity(&self) -> usize {
        self.channel_capacity
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry_policy
    }
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            retry_policy: RetryPolicy::ExponentialBackoff {
                max_attempts: DEFAULT_MAX_ATTEMPTS,
                initial_delay: Duration::from_millis(DEFAULT_INITIAL_BACKOFF_MS),
                max_delay: Duration::from_millis(DEFAULT_MAX_BACKOFF_MS),
                multiplier: DEFAULT_BACKOFF_MULTIPLIER,
            },
        }
    }
}
