//! Single-origin HTTP fetching with bounded concurrency, timeout, retry,
//! and 429-aware backoff.
//!
//! The fetcher never raises for network-level problems: terminal failures
//! are returned as [`FetchFailure`] values after the retry policy is
//! exhausted. Only a closed semaphore (engine shutdown) is treated as a
//! transport failure without retries.

mod client;

use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, warn};
use rand::Rng;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::StatusCode;
use tokio::sync::Semaphore;

pub use client::{init_client, init_probe_client};

use crate::config::{
    MAX_RESPONSE_BODY_SIZE, RATE_LIMIT_MAX_RETRIES, RETRY_FACTOR, RETRY_INITIAL_DELAY_MS,
    RETRY_JITTER_FRACTION, RETRY_MAX_DELAY,
};
use crate::error_handling::{InfoType, ProcessingStats, WarningType};

/// A completed HTTP exchange, any status code.
#[derive(Debug)]
pub struct FetchResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: String,
    pub elapsed: Duration,
}

impl FetchResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Terminal fetch failures, produced only after the retry policy has run
/// its course.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchFailure {
    /// The request (and its single permitted retry) timed out.
    Timeout,
    /// 429 responses persisted past the hard backoff cap.
    RateLimited,
    /// Non-retriable transport problem (malformed response, decode error).
    Transport(String),
    /// Retriable transport errors exhausted the retry budget.
    GiveUp { attempts: u32, last_error: String },
}

impl FetchFailure {
    /// Short label stored on records.
    pub fn label(&self) -> &'static str {
        match self {
            FetchFailure::Timeout => "timeout",
            FetchFailure::RateLimited => "rate_limited",
            FetchFailure::Transport(_) => "transport_error",
            FetchFailure::GiveUp { .. } => "giveup",
        }
    }
}

impl std::fmt::Display for FetchFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FetchFailure::Timeout => write!(f, "request timeout"),
            FetchFailure::RateLimited => write!(f, "rate limited after retries"),
            FetchFailure::Transport(msg) => write!(f, "transport error: {msg}"),
            FetchFailure::GiveUp {
                attempts,
                last_error,
            } => write!(f, "gave up after {attempts} attempts: {last_error}"),
        }
    }
}

pub type FetchResult = Result<FetchResponse, FetchFailure>;

/// Shared fetcher for one run: a single HTTP client plus a semaphore sized
/// to `max_concurrent_requests`. Cheap to clone via `Arc`.
pub struct Fetcher {
    client: Arc<reqwest::Client>,
    semaphore: Arc<Semaphore>,
    retry_attempts: u32,
    stats: Arc<ProcessingStats>,
}

impl Fetcher {
    pub fn new(
        client: Arc<reqwest::Client>,
        max_concurrent: usize,
        retry_attempts: u32,
        stats: Arc<ProcessingStats>,
    ) -> Self {
        Fetcher {
            client,
            semaphore: Arc::new(Semaphore::new(max_concurrent)),
            retry_attempts,
            stats,
        }
    }

    /// Fetches a URL, applying the engine retry policy:
    ///
    /// - transport error or 5xx: up to `retry_attempts` retries with
    ///   exponential backoff (500 ms base, factor 2, ±20% jitter);
    /// - 429: sleep `max(Retry-After, 2^attempt * base)` and retry, capped
    ///   at a hard limit independent of `retry_attempts`;
    /// - timeout: one retry only.
    ///
    /// A 5xx that survives the retry budget is returned as a response so
    /// the caller can still classify the page body.
    pub async fn fetch(&self, url: &str) -> FetchResult {
        let _permit = match self.semaphore.acquire().await {
            Ok(permit) => permit,
            Err(_) => return Err(FetchFailure::Transport("fetch semaphore closed".into())),
        };

        let mut attempt: u32 = 0;
        let mut rate_limit_retries: u32 = 0;
        let mut timeout_retried = false;

        loop {
            let started = Instant::now();
            match self.client.get(url).send().await {
                Ok(resp) => {
                    let status = resp.status();

                    if status == StatusCode::TOO_MANY_REQUESTS {
                        if rate_limit_retries >= RATE_LIMIT_MAX_RETRIES {
                            warn!("Rate limited fetching {url} after {rate_limit_retries} backoffs, giving up");
                            return Err(FetchFailure::RateLimited);
                        }
                        let delay =
                            rate_limit_delay(resp.headers().get(RETRY_AFTER), rate_limit_retries);
                        rate_limit_retries += 1;
                        debug!(
                            "429 fetching {url}, backing off {:.1}s (retry {rate_limit_retries}/{RATE_LIMIT_MAX_RETRIES})",
                            delay.as_secs_f64()
                        );
                        tokio::time::sleep(delay).await;
                        continue;
                    }

                    if status.is_server_error() && attempt < self.retry_attempts {
                        attempt += 1;
                        let delay = backoff_delay(attempt);
                        debug!(
                            "{} fetching {url}, retrying in {:.1}s (attempt {attempt}/{})",
                            status,
                            delay.as_secs_f64(),
                            self.retry_attempts
                        );
                        tokio::time::sleep(delay).await;
                        continue;
                    }

                    let headers = resp.headers().clone();
                    let body = match resp.text().await {
                        Ok(text) => {
                            if text.len() > MAX_RESPONSE_BODY_SIZE {
                                self.stats.increment_warning(WarningType::OversizedBody);
                            }
                            truncate_body(text)
                        }
                        Err(e) => return Err(FetchFailure::Transport(e.to_string())),
                    };

                    if rate_limit_retries > 0 {
                        self.stats.increment_info(InfoType::RateLimitRecovered);
                    }

                    return Ok(FetchResponse {
                        status: status.as_u16(),
                        headers,
                        body,
                        elapsed: started.elapsed(),
                    });
                }
                Err(e) if e.is_timeout() => {
                    if !timeout_retried {
                        timeout_retried = true;
                        debug!("Timeout fetching {url}, retrying once");
                        continue;
                    }
                    return Err(FetchFailure::Timeout);
                }
                Err(e) if is_retriable_transport(&e) => {
                    if attempt < self.retry_attempts {
                        attempt += 1;
                        let delay = backoff_delay(attempt);
                        debug!(
                            "Transport error fetching {url}: {e}; retrying in {:.1}s (attempt {attempt}/{})",
                            delay.as_secs_f64(),
                            self.retry_attempts
                        );
                        tokio::time::sleep(delay).await;
                        continue;
                    }
                    return Err(FetchFailure::GiveUp {
                        attempts: attempt + 1,
                        last_error: e.to_string(),
                    });
                }
                Err(e) => return Err(FetchFailure::Transport(e.to_string())),
            }
        }
    }
}

/// Transport errors worth retrying: connection resets and request-level
/// failures. Decode and redirect errors are permanent.
fn is_retriable_transport(e: &reqwest::Error) -> bool {
    if e.is_decode() || e.is_redirect() || e.is_builder() {
        return false;
    }
    e.is_connect() || e.is_request()
}

/// Exponential backoff with jitter for attempt `n` (1-based):
/// `500ms * 2^(n-1)`, jittered by ±20%, capped at `RETRY_MAX_DELAY`.
fn backoff_delay(attempt: u32) -> Duration {
    let base = RETRY_INITIAL_DELAY_MS.saturating_mul(RETRY_FACTOR.saturating_pow(attempt - 1));
    let capped = base.min(RETRY_MAX_DELAY.as_millis() as u64);
    apply_jitter(capped)
}

/// 429 backoff: the larger of the server's Retry-After and the exponential
/// schedule for this retry count.
fn rate_limit_delay(retry_after: Option<&reqwest::header::HeaderValue>, retries: u32) -> Duration {
    let backoff_ms = RETRY_INITIAL_DELAY_MS.saturating_mul(RETRY_FACTOR.saturating_pow(retries));
    let backoff_ms = backoff_ms.min(RETRY_MAX_DELAY.as_millis() as u64);

    let server_ms = retry_after
        .and_then(|v| v.to_str().ok())
        .and_then(parse_retry_after_seconds)
        .map(|secs| secs.saturating_mul(1000))
        .unwrap_or(0);

    Duration::from_millis(server_ms.max(backoff_ms))
}

/// Parses the delta-seconds form of Retry-After. HTTP-date values are rare
/// from rate limiters and are ignored.
fn parse_retry_after_seconds(value: &str) -> Option<u64> {
    value.trim().parse::<u64>().ok()
}

fn apply_jitter(millis: u64) -> Duration {
    let jitter_span = (millis as f64 * RETRY_JITTER_FRACTION) as i64;
    if jitter_span == 0 {
        return Duration::from_millis(millis);
    }
    let offset = rand::thread_rng().gen_range(-jitter_span..=jitter_span);
    let jittered = (millis as i64 + offset).max(0) as u64;
    Duration::from_millis(jittered)
}

fn truncate_body(mut body: String) -> String {
    if body.len() > MAX_RESPONSE_BODY_SIZE {
        let mut cut = MAX_RESPONSE_BODY_SIZE;
        while !body.is_char_boundary(cut) {
            cut -= 1;
        }
        body.truncate(cut);
    }
    body
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_delay_grows_exponentially() {
        // Jitter is ±20%, so check the envelope rather than exact values.
        let first = backoff_delay(1).as_millis() as f64;
        assert!((400.0..=600.0).contains(&first), "got {first}");

        let second = backoff_delay(2).as_millis() as f64;
        assert!((800.0..=1200.0).contains(&second), "got {second}");

        let third = backoff_delay(3).as_millis() as f64;
        assert!((1600.0..=2400.0).contains(&third), "got {third}");
    }

    #[test]
    fn test_backoff_delay_is_capped() {
        let huge = backoff_delay(30);
        assert!(huge <= RETRY_MAX_DELAY + RETRY_MAX_DELAY.mul_f64(RETRY_JITTER_FRACTION));
    }

    #[test]
    fn test_rate_limit_delay_prefers_retry_after() {
        let header = reqwest::header::HeaderValue::from_static("10");
        let delay = rate_limit_delay(Some(&header), 0);
        assert_eq!(delay, Duration::from_secs(10));
    }

    #[test]
    fn test_rate_limit_delay_falls_back_to_backoff() {
        // No header: 500ms * 2^2 = 2s for the third retry.
        let delay = rate_limit_delay(None, 2);
        assert_eq!(delay, Duration::from_millis(2000));
    }

    #[test]
    fn test_rate_limit_delay_takes_max_of_both() {
        // Backoff (4s at retry 3) exceeds a short Retry-After.
        let header = reqwest::header::HeaderValue::from_static("1");
        let delay = rate_limit_delay(Some(&header), 3);
        assert_eq!(delay, Duration::from_millis(4000));
    }

    #[test]
    fn test_parse_retry_after_seconds() {
        assert_eq!(parse_retry_after_seconds("5"), Some(5));
        assert_eq!(parse_retry_after_seconds(" 30 "), Some(30));
        assert_eq!(
            parse_retry_after_seconds("Wed, 21 Oct 2015 07:28:00 GMT"),
            None
        );
    }

    #[test]
    fn test_truncate_body_respects_char_boundaries() {
        let body = "é".repeat(MAX_RESPONSE_BODY_SIZE);
        let truncated = truncate_body(body);
        assert!(truncated.len() <= MAX_RESPONSE_BODY_SIZE);
        // Must still be valid UTF-8 (String invariant upheld by boundary walk).
        assert!(truncated.chars().count() > 0);
    }

    #[test]
    fn test_fetch_failure_labels() {
        assert_eq!(FetchFailure::Timeout.label(), "timeout");
        assert_eq!(FetchFailure::RateLimited.label(), "rate_limited");
        assert_eq!(FetchFailure::Transport("x".into()).label(), "transport_error");
        assert_eq!(
            FetchFailure::GiveUp {
                attempts: 3,
                last_error: "x".into()
            }
            .label(),
            "giveup"
        );
    }
}
