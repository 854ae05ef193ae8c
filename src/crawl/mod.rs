//! Crawl frontier: bounded BFS, adaptive batching, and path tracking.

mod frontier;
mod paths;
mod window;

pub use frontier::{CrawlCounters, CrawlOutcome, CrawledPage, DiscoveredEdge, Frontier};
pub use paths::PathTracker;
pub use window::{next_batch_size, OutcomeWindow};
