//! Link validation over the discovered edge set.
//!
//! Validates a bounded sample of edges with its own concurrency cap and
//! adaptive batch size, independent of the crawl fetcher. Selection
//! prioritizes edges whose target was already fetched (free), then
//! same-origin edges in discovery order, then external edges; everything
//! past the budget is persisted as `unknown`.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use futures::future::join_all;
use log::{debug, info};
use tokio::sync::Semaphore;

use crate::classify::title_of;
use crate::config::{BATCH_INITIAL, MAX_ERROR_MESSAGE_LENGTH, VALIDATOR_CONCURRENCY};
use crate::crawl::{next_batch_size, CrawledPage, DiscoveredEdge, OutcomeWindow};
use crate::error_handling::{ErrorType, ProcessingStats};
use crate::extract::LinkType;

/// Validation status label for one edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkStatus {
    Valid,
    Broken,
    Redirect,
    Timeout,
    RateLimited,
    Unknown,
}

impl LinkStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LinkStatus::Valid => "valid",
            LinkStatus::Broken => "broken",
            LinkStatus::Redirect => "redirect",
            LinkStatus::Timeout => "timeout",
            LinkStatus::RateLimited => "rate_limited",
            LinkStatus::Unknown => "unknown",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "valid" => LinkStatus::Valid,
            "broken" => LinkStatus::Broken,
            "redirect" => LinkStatus::Redirect,
            "timeout" => LinkStatus::Timeout,
            "rate_limited" => LinkStatus::RateLimited,
            _ => LinkStatus::Unknown,
        }
    }
}

/// Maps an HTTP status code onto a link status label.
pub fn categorize_status(status: u16) -> LinkStatus {
    match status {
        200..=299 => LinkStatus::Valid,
        429 => LinkStatus::RateLimited,
        300..=399 => LinkStatus::Redirect,
        400..=599 => LinkStatus::Broken,
        _ => LinkStatus::Unknown,
    }
}

/// The persisted per-edge validation record.
#[derive(Debug, Clone)]
pub struct EdgeRecord {
    pub url: String,
    pub parent_url: String,
    pub link_type: LinkType,
    pub status: LinkStatus,
    pub status_code: Option<u16>,
    pub response_time: Option<f64>,
    pub error_message: Option<String>,
    pub title: Option<String>,
    pub position: usize,
}

/// What the validator reuses from an already-fetched page.
#[derive(Debug, Clone)]
pub struct KnownPage {
    pub status: Option<u16>,
    pub response_time: Option<f64>,
    pub fetch_error: Option<String>,
    pub title: Option<String>,
}

/// Builds the fetched-page lookup the selection rule keys on.
pub fn known_pages(pages: &[CrawledPage]) -> HashMap<String, KnownPage> {
    pages
        .iter()
        .map(|page| {
            (
                page.url.clone(),
                KnownPage {
                    status: page.status,
                    response_time: page.response_time,
                    fetch_error: page.fetch_error.clone(),
                    title: page.classification.title.clone(),
                },
            )
        })
        .collect()
}

/// Selection order for the validation budget: (1) edges with a known
/// fetched target, (2) same-origin edges in discovery order, (3) external
/// edges. Returns indices into `edges`.
pub fn select_for_validation(
    edges: &[DiscoveredEdge],
    pages: &HashMap<String, KnownPage>,
    max: usize,
) -> Vec<usize> {
    let mut known = Vec::new();
    let mut same_origin = Vec::new();
    let mut external = Vec::new();

    for (index, edge) in edges.iter().enumerate() {
        if pages.contains_key(&edge.url) {
            known.push(index);
        } else if edge.link_type == LinkType::External {
            external.push(index);
        } else {
            same_origin.push(index);
        }
    }

    known
        .into_iter()
        .chain(same_origin)
        .chain(external)
        .take(max)
        .collect()
}

/// Link validator for one run. Holds the redirect-disabled probe client so
/// 3xx responses surface as `redirect` labels.
pub struct LinkValidator {
    client: Arc<reqwest::Client>,
    semaphore: Arc<Semaphore>,
    stats: Arc<ProcessingStats>,
    validated_counter: Arc<AtomicUsize>,
}

impl LinkValidator {
    pub fn new(
        client: Arc<reqwest::Client>,
        stats: Arc<ProcessingStats>,
        validated_counter: Arc<AtomicUsize>,
    ) -> Self {
        LinkValidator {
            client,
            semaphore: Arc::new(Semaphore::new(VALIDATOR_CONCURRENCY)),
            stats,
            validated_counter,
        }
    }

    /// Produces one [`EdgeRecord`] per discovered edge. Up to `max_links`
    /// edges get a real status; the rest are labeled `unknown` with no
    /// status code. Output is ordered by discovery position.
    pub async fn validate(
        &self,
        edges: &[DiscoveredEdge],
        pages: &HashMap<String, KnownPage>,
        max_links: usize,
    ) -> Vec<EdgeRecord> {
        let selected = select_for_validation(edges, pages, max_links);
        let selected_set: std::collections::HashSet<usize> = selected.iter().copied().collect();
        info!(
            "Validating {} of {} edges ({} skipped as unknown)",
            selected.len(),
            edges.len(),
            edges.len() - selected.len()
        );

        let mut records: Vec<Option<EdgeRecord>> = Vec::with_capacity(edges.len());
        for (index, edge) in edges.iter().enumerate() {
            if !selected_set.contains(&index) {
                records.push(Some(unvalidated_record(edge)));
            } else {
                records.push(None);
            }
        }

        // Edges with an already-fetched target cost nothing.
        let mut to_probe: Vec<usize> = Vec::new();
        for index in selected {
            let edge = &edges[index];
            match pages.get(&edge.url) {
                Some(known) => {
                    records[index] = Some(reused_record(edge, known));
                    self.validated_counter.fetch_add(1, Ordering::SeqCst);
                }
                None => to_probe.push(index),
            }
        }

        // Probe the rest in adaptive batches.
        let mut window = OutcomeWindow::new();
        let mut batch_size = BATCH_INITIAL;
        let mut cursor = 0;
        while cursor < to_probe.len() {
            let end = (cursor + batch_size).min(to_probe.len());
            let chunk = &to_probe[cursor..end];
            debug!(
                "Validating batch of {} (batch size {batch_size})",
                chunk.len()
            );

            let probes = chunk.iter().map(|&index| self.probe(&edges[index]));
            let results = join_all(probes).await;

            for (&index, record) in chunk.iter().zip(results) {
                window.record(matches!(
                    record.status,
                    LinkStatus::Timeout | LinkStatus::RateLimited | LinkStatus::Unknown
                ));
                records[index] = Some(record);
                self.validated_counter.fetch_add(1, Ordering::SeqCst);
            }

            cursor = end;
            batch_size = next_batch_size(batch_size, &window);
        }

        let mut out: Vec<EdgeRecord> = records.into_iter().flatten().collect();
        out.sort_by_key(|record| record.position);
        out
    }

    /// Issues one GET and classifies the outcome. 429 is recorded as
    /// rate_limited without further retries; redirects are not followed.
    async fn probe(&self, edge: &DiscoveredEdge) -> EdgeRecord {
        let _permit = match self.semaphore.acquire().await {
            Ok(permit) => permit,
            Err(_) => return unvalidated_record(edge),
        };

        let started = Instant::now();
        match self.client.get(&edge.url).send().await {
            Ok(resp) => {
                let status_code = resp.status().as_u16();
                let status = categorize_status(status_code);
                let title = if status == LinkStatus::Valid {
                    match resp.text().await {
                        Ok(body) => title_of(&body),
                        Err(_) => None,
                    }
                } else {
                    None
                };
                let elapsed = started.elapsed().as_secs_f64();

                EdgeRecord {
                    url: edge.url.clone(),
                    parent_url: edge.parent_url.clone(),
                    link_type: edge.link_type,
                    status,
                    status_code: Some(status_code),
                    response_time: Some(elapsed),
                    error_message: None,
                    title,
                    position: edge.position,
                }
            }
            Err(e) if e.is_timeout() => {
                self.stats.increment_error(ErrorType::ValidationTimeout);
                EdgeRecord {
                    url: edge.url.clone(),
                    parent_url: edge.parent_url.clone(),
                    link_type: edge.link_type,
                    status: LinkStatus::Timeout,
                    status_code: None,
                    response_time: Some(started.elapsed().as_secs_f64()),
                    error_message: Some("request timeout".to_string()),
                    title: None,
                    position: edge.position,
                }
            }
            Err(e) => {
                self.stats.increment_error(ErrorType::ValidationTransport);
                EdgeRecord {
                    url: edge.url.clone(),
                    parent_url: edge.parent_url.clone(),
                    link_type: edge.link_type,
                    status: LinkStatus::Unknown,
                    status_code: None,
                    response_time: Some(started.elapsed().as_secs_f64()),
                    error_message: Some(truncate_message(e.to_string())),
                    title: None,
                    position: edge.position,
                }
            }
        }
    }
}

/// Record for an edge past the validation budget.
fn unvalidated_record(edge: &DiscoveredEdge) -> EdgeRecord {
    EdgeRecord {
        url: edge.url.clone(),
        parent_url: edge.parent_url.clone(),
        link_type: edge.link_type,
        status: LinkStatus::Unknown,
        status_code: None,
        response_time: None,
        error_message: None,
        title: None,
        position: edge.position,
    }
}

/// Record reusing the crawl's fetch result for an already-fetched target.
fn reused_record(edge: &DiscoveredEdge, known: &KnownPage) -> EdgeRecord {
    let (status, status_code, error_message) = match known.status {
        Some(code) => (categorize_status(code), Some(code), None),
        None => {
            let label = match known.fetch_error.as_deref() {
                Some(msg) if msg.contains("timeout") => LinkStatus::Timeout,
                Some(msg) if msg.contains("rate limited") => LinkStatus::RateLimited,
                _ => LinkStatus::Unknown,
            };
            (label, None, known.fetch_error.clone())
        }
    };

    EdgeRecord {
        url: edge.url.clone(),
        parent_url: edge.parent_url.clone(),
        link_type: edge.link_type,
        status,
        status_code,
        response_time: known.response_time,
        error_message,
        title: known.title.clone(),
        position: edge.position,
    }
}

fn truncate_message(mut message: String) -> String {
    if message.len() > MAX_ERROR_MESSAGE_LENGTH {
        let mut cut = MAX_ERROR_MESSAGE_LENGTH;
        while !message.is_char_boundary(cut) {
            cut -= 1;
        }
        message.truncate(cut);
    }
    message
}
