//! Bounded breadth-first crawl over the same-origin URL graph.
//!
//! The frontier owns all BFS bookkeeping (queue, seen states, path
//! tracker); fetch workers only return results. Pages are pulled in
//! adaptive batches whose size reacts to the rolling fetch error rate, and
//! every candidate child passes the four enqueue conditions: first
//! observation, depth bound, page budget, same origin.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use futures::future::join_all;
use log::{debug, info};
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::app::url::canonicalize;
use crate::classify::{classify, PageClassification};
use crate::config::{EngineConfig, BATCH_INITIAL};
use crate::crawl::paths::PathTracker;
use crate::crawl::window::{next_batch_size, OutcomeWindow};
use crate::error_handling::{EngineError, ErrorType, InfoType, ProcessingStats, WarningType};
use crate::extract::{LinkExtractor, LinkType};
use crate::fetch::{FetchFailure, Fetcher};

/// Per-URL crawl state. Transitions are monotonic; a URL never regresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum UrlState {
    Enqueued,
    Fetching,
    Fetched,
    FailedFetch,
    Classified,
}

/// One fetched (or fetch-failed) URL with its classification.
#[derive(Debug, Clone)]
pub struct CrawledPage {
    pub url: String,
    pub depth: u32,
    /// HTTP status, `None` when the fetch failed without a response.
    pub status: Option<u16>,
    pub response_time: Option<f64>,
    pub fetch_error: Option<String>,
    /// Body text; retained in memory for the duration of the run.
    pub body: Option<String>,
    pub classification: PageClassification,
    /// Ordered ancestor sequence from the seed to this URL, inclusive.
    pub path: Vec<String>,
}

impl CrawledPage {
    /// A URL counts as fetched once any HTTP response arrived.
    pub fn fetched(&self) -> bool {
        self.status.is_some()
    }
}

/// One discovered hyperlink, attributed to the first page it was seen on.
#[derive(Debug, Clone)]
pub struct DiscoveredEdge {
    pub url: String,
    pub parent_url: String,
    pub link_type: LinkType,
    /// Index in the deterministic discovery order (BFS order over pages,
    /// document order within a page).
    pub position: usize,
}

/// Everything a crawl produces, ready for validation and persistence.
#[derive(Debug)]
pub struct CrawlOutcome {
    pub seed: String,
    pub pages: Vec<CrawledPage>,
    pub edges: Vec<DiscoveredEdge>,
    pub paths: PathTracker,
}

/// Shared counters surfaced to progress observers.
#[derive(Debug, Default)]
pub struct CrawlCounters {
    pub completed: AtomicUsize,
    pub failed: AtomicUsize,
    pub enqueued: AtomicUsize,
}

struct QueuedUrl {
    url: String,
    depth: u32,
}

/// Bounded BFS crawler for a single run.
pub struct Frontier {
    fetcher: Arc<Fetcher>,
    extractor: LinkExtractor,
    config: EngineConfig,
    stats: Arc<ProcessingStats>,
    counters: Arc<CrawlCounters>,
    cancel: CancellationToken,
}

impl Frontier {
    pub fn new(
        fetcher: Arc<Fetcher>,
        extractor: LinkExtractor,
        config: EngineConfig,
        stats: Arc<ProcessingStats>,
        counters: Arc<CrawlCounters>,
        cancel: CancellationToken,
    ) -> Self {
        Frontier {
            fetcher,
            extractor,
            config,
            stats,
            counters,
            cancel,
        }
    }

    /// Runs the crawl from `seed` (already canonical) to one of its three
    /// terminations: queue drained, page budget exhausted, or wall-clock
    /// ceiling reached. All three produce a complete [`CrawlOutcome`].
    ///
    /// # Errors
    ///
    /// `EngineError::Cancelled` when the cancellation token fires;
    /// `EngineError::Invariant` if URL state bookkeeping regresses.
    pub async fn crawl(&self, seed: &Url) -> Result<CrawlOutcome, EngineError> {
        let seed_str = seed.to_string();
        let deadline = self
            .config
            .max_run_seconds
            .map(|secs| Instant::now() + std::time::Duration::from_secs(secs));

        let mut states: HashMap<String, UrlState> = HashMap::new();
        let mut queue: VecDeque<QueuedUrl> = VecDeque::new();
        let mut paths = PathTracker::new(&seed_str);
        let mut pages: Vec<CrawledPage> = Vec::new();
        let mut edges: Vec<DiscoveredEdge> = Vec::new();
        let mut edge_seen: HashSet<String> = HashSet::new();
        let mut window = OutcomeWindow::new();
        let mut batch_size = BATCH_INITIAL;

        states.insert(seed_str.clone(), UrlState::Enqueued);
        queue.push_back(QueuedUrl {
            url: seed_str.clone(),
            depth: 0,
        });
        let mut enqueued_total: u32 = 1;
        self.counters.enqueued.store(1, Ordering::SeqCst);

        info!(
            "Starting crawl of {seed_str} (depth <= {}, pages <= {})",
            self.config.max_crawl_depth, self.config.max_pages_to_crawl
        );

        while !queue.is_empty() {
            if self.cancel.is_cancelled() {
                return Err(EngineError::Cancelled);
            }
            if let Some(deadline) = deadline {
                if Instant::now() >= deadline {
                    info!(
                        "Wall-clock ceiling reached with {} URLs still queued",
                        queue.len()
                    );
                    break;
                }
            }

            let take = batch_size.min(queue.len());
            let batch: Vec<QueuedUrl> = queue.drain(..take).collect();
            for item in &batch {
                transition(&mut states, &item.url, UrlState::Fetching)?;
            }
            debug!(
                "Fetching batch of {} (batch size {batch_size}, queued {})",
                batch.len(),
                queue.len()
            );

            let fetches = batch.iter().map(|item| self.fetcher.fetch(&item.url));
            let results = join_all(fetches).await;

            for (item, result) in batch.into_iter().zip(results) {
                match result {
                    Ok(response) => {
                        window.record(response.status >= 500);
                        self.count_status(response.status);
                        transition(&mut states, &item.url, UrlState::Fetched)?;

                        let classification = classify(&response.body, Some(response.status));
                        if classification.title.is_none() {
                            self.stats.increment_warning(WarningType::MissingTitle);
                        }

                        if response.is_success() && !response.body.is_empty() {
                            self.harvest_links(
                                &item,
                                &response.body,
                                &mut states,
                                &mut queue,
                                &mut paths,
                                &mut edges,
                                &mut edge_seen,
                                &mut enqueued_total,
                            );
                        }

                        pages.push(CrawledPage {
                            url: item.url.clone(),
                            depth: item.depth,
                            status: Some(response.status),
                            response_time: Some(response.elapsed.as_secs_f64()),
                            fetch_error: None,
                            body: Some(response.body),
                            classification,
                            path: paths.path_to(&item.url),
                        });
                        transition(&mut states, &item.url, UrlState::Classified)?;
                        self.counters.completed.fetch_add(1, Ordering::SeqCst);
                    }
                    Err(failure) => {
                        window.record(true);
                        self.count_failure(&failure);
                        transition(&mut states, &item.url, UrlState::FailedFetch)?;

                        pages.push(CrawledPage {
                            url: item.url.clone(),
                            depth: item.depth,
                            status: None,
                            response_time: None,
                            fetch_error: Some(failure.to_string()),
                            body: None,
                            classification: PageClassification::failed(),
                            path: paths.path_to(&item.url),
                        });
                        self.counters.failed.fetch_add(1, Ordering::SeqCst);
                    }
                }
            }

            let previous = batch_size;
            batch_size = next_batch_size(batch_size, &window);
            if batch_size != previous {
                info!(
                    "Adaptive batch size {previous} -> {batch_size} (error rate {:.0}%)",
                    window.error_rate() * 100.0
                );
            }
        }

        info!(
            "Crawl of {seed_str} finished: {} pages, {} edges",
            pages.len(),
            edges.len()
        );

        Ok(CrawlOutcome {
            seed: seed_str,
            pages,
            edges,
            paths,
        })
    }

    /// Extracts candidate links from one fetched body, recording edges and
    /// relationships for first observations and enqueuing children that
    /// pass the depth, budget, and origin conditions.
    #[allow(clippy::too_many_arguments)]
    fn harvest_links(
        &self,
        item: &QueuedUrl,
        body: &str,
        states: &mut HashMap<String, UrlState>,
        queue: &mut VecDeque<QueuedUrl>,
        paths: &mut PathTracker,
        edges: &mut Vec<DiscoveredEdge>,
        edge_seen: &mut HashSet<String>,
        enqueued_total: &mut u32,
    ) {
        let Some(base) = canonicalize(&item.url, None) else {
            return;
        };
        let links = self
            .extractor
            .extract(body, &base, &self.config.link_toggles, &self.stats);

        for link in links {
            if link.url == item.url {
                continue;
            }
            if edge_seen.contains(&link.url) {
                // Repeat observation: the first parent keeps the edge.
                continue;
            }
            edge_seen.insert(link.url.clone());
            if link.url.as_str() == paths.seed() {
                // A link back to the seed is an edge, but the seed stays
                // rootless and is never re-enqueued.
                edges.push(DiscoveredEdge {
                    url: link.url.clone(),
                    parent_url: item.url.clone(),
                    link_type: link.link_type,
                    position: edges.len(),
                });
                continue;
            }

            edges.push(DiscoveredEdge {
                url: link.url.clone(),
                parent_url: item.url.clone(),
                link_type: link.link_type,
                position: edges.len(),
            });
            paths.add_relationship(&item.url, &link.url);

            // Enqueue conditions: unseen, within depth, within budget, and
            // a same-origin page link (externals and resources are edges
            // only).
            if states.contains_key(&link.url) {
                continue;
            }
            if !matches!(link.link_type, LinkType::StaticHtml | LinkType::DynamicJs) {
                continue;
            }
            if item.depth + 1 > self.config.max_crawl_depth {
                self.stats.increment_info(InfoType::DepthLimitReached);
                continue;
            }
            if *enqueued_total >= self.config.max_pages_to_crawl {
                self.stats.increment_info(InfoType::PageBudgetReached);
                continue;
            }

            states.insert(link.url.clone(), UrlState::Enqueued);
            queue.push_back(QueuedUrl {
                url: link.url.clone(),
                depth: item.depth + 1,
            });
            *enqueued_total += 1;
            self.counters.enqueued.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn count_status(&self, status: u16) {
        if (400..500).contains(&status) {
            self.stats.increment_error(ErrorType::HttpClientError);
        } else if status >= 500 {
            self.stats.increment_error(ErrorType::HttpServerError);
        } else if (300..400).contains(&status) {
            self.stats.increment_info(InfoType::HttpRedirect);
        }
    }

    fn count_failure(&self, failure: &FetchFailure) {
        let error_type = match failure {
            FetchFailure::Timeout => ErrorType::FetchTimeout,
            FetchFailure::RateLimited => ErrorType::FetchRateLimited,
            FetchFailure::Transport(_) => ErrorType::FetchTransport,
            FetchFailure::GiveUp { .. } => ErrorType::FetchGiveUp,
        };
        self.stats.increment_error(error_type);
    }
}

/// Advances a URL's state, rejecting regressions.
fn transition(
    states: &mut HashMap<String, UrlState>,
    url: &str,
    next: UrlState,
) -> Result<(), EngineError> {
    let current = states.get(url).copied();
    let valid = match (current, next) {
        (Some(UrlState::Enqueued), UrlState::Fetching) => true,
        (Some(UrlState::Fetching), UrlState::Fetched) => true,
        (Some(UrlState::Fetching), UrlState::FailedFetch) => true,
        (Some(UrlState::Fetched), UrlState::Classified) => true,
        _ => false,
    };
    if !valid {
        return Err(EngineError::Invariant(format!(
            "URL state for {url} cannot move {current:?} -> {next:?}"
        )));
    }
    states.insert(url.to_string(), next);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transition_happy_path() {
        let mut states = HashMap::new();
        states.insert("u".to_string(), UrlState::Enqueued);
        assert!(transition(&mut states, "u", UrlState::Fetching).is_ok());
        assert!(transition(&mut states, "u", UrlState::Fetched).is_ok());
        assert!(transition(&mut states, "u", UrlState::Classified).is_ok());
    }

    #[test]
    fn test_transition_rejects_regression() {
        let mut states = HashMap::new();
        states.insert("u".to_string(), UrlState::Classified);
        assert!(transition(&mut states, "u", UrlState::Fetching).is_err());
    }

    #[test]
    fn test_transition_rejects_unknown_url() {
        let mut states = HashMap::new();
        assert!(transition(&mut states, "u", UrlState::Fetching).is_err());
    }

    #[test]
    fn test_transition_failed_fetch_is_terminal() {
        let mut states = HashMap::new();
        states.insert("u".to_string(), UrlState::Enqueued);
        transition(&mut states, "u", UrlState::Fetching).unwrap();
        transition(&mut states, "u", UrlState::FailedFetch).unwrap();
        assert!(transition(&mut states, "u", UrlState::Fetched).is_err());
        assert!(transition(&mut states, "u", UrlState::Classified).is_err());
    }
}
