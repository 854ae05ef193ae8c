//! Configuration constants.
//!
//! This module defines all operational constants used throughout the engine:
//! retry strategy, adaptive batch bounds, size limits, and timing parameters.

use std::time::Duration;

/// Progress logging interval in seconds while a run is executing.
pub const LOGGING_INTERVAL_SECS: u64 = 5;

/// Default User-Agent string for HTTP requests.
///
/// Users can override this via `EngineConfig::user_agent` or the
/// `--user-agent` CLI flag.
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

// Response and body size limits
/// Maximum response body size in bytes (2MB).
/// Bodies larger than this are truncated to keep per-run memory bounded.
pub const MAX_RESPONSE_BODY_SIZE: usize = 2 * 1024 * 1024;

/// Maximum URL length accepted anywhere in the engine.
/// Matches common browser and server limits.
pub const MAX_URL_LENGTH: usize = 2048;

/// Maximum error message length persisted per record.
/// Longer messages are truncated to avoid database bloat.
pub const MAX_ERROR_MESSAGE_LENGTH: usize = 2000;

// Retry strategy (transport errors and 5xx responses)
/// Initial delay in milliseconds before the first retry.
pub const RETRY_INITIAL_DELAY_MS: u64 = 500;
/// Factor by which the retry delay is multiplied on each attempt.
pub const RETRY_FACTOR: u64 = 2;
/// Jitter applied to each retry delay, as a fraction of the delay (±20%).
pub const RETRY_JITTER_FRACTION: f64 = 0.2;
/// Maximum delay between retries.
pub const RETRY_MAX_DELAY: Duration = Duration::from_secs(15);

// 429 handling
/// Hard cap on retries triggered by 429 responses. These retries do not
/// count against `EngineConfig::retry_attempts`.
pub const RATE_LIMIT_MAX_RETRIES: u32 = 6;

// Adaptive batching (shared by the crawl frontier and the link validator)
/// Number of recent fetch outcomes tracked for the rolling error rate.
pub const OUTCOME_WINDOW_SIZE: usize = 100;
/// Minimum outcomes required before the batch size is adjusted.
pub const OUTCOME_MIN_SAMPLE: usize = 10;
/// Error rate above which the batch size is halved.
pub const BATCH_SHRINK_THRESHOLD: f64 = 0.10;
/// Error rate below which the batch size is doubled.
pub const BATCH_GROW_THRESHOLD: f64 = 0.05;
/// Smallest permitted batch size.
pub const BATCH_FLOOR: usize = 5;
/// Largest permitted batch size.
pub const BATCH_CEILING: usize = 50;
/// Batch size used before enough outcomes have accumulated.
pub const BATCH_INITIAL: usize = 10;

/// Concurrency cap for link validation requests, independent from the
/// crawl fetcher's semaphore.
pub const VALIDATOR_CONCURRENCY: usize = 50;

// Permitted configuration ranges
/// Inclusive bounds for `max_crawl_depth`.
pub const CRAWL_DEPTH_RANGE: (u32, u32) = (1, 5);
/// Inclusive bounds for `max_pages_to_crawl`.
pub const PAGE_BUDGET_RANGE: (u32, u32) = (10, 1000);
/// Inclusive bounds for `max_links_to_validate`.
pub const LINK_BUDGET_RANGE: (u32, u32) = (10, 2000);
