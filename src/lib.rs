//! site_insights library: website analysis engine
//!
//! Given a starting URL and a configuration, performs a bounded
//! breadth-first crawl of a website, validates discovered hyperlinks,
//! classifies each page by structural content type, reconstructs the
//! parent/child navigation topology, and persists all artifacts under a
//! hierarchical source-code deduplication scheme: HTML bodies are stored
//! only at interior pages, and leaves resolve theirs via an upward walk.
//!
//! # Example
//!
//! ```no_run
//! use site_insights::{run_analysis, EngineConfig};
//! use site_insights::storage::{init_db_pool_with_path, run_migrations};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = EngineConfig::default();
//! let pool = init_db_pool_with_path(&config.db_path).await?;
//! run_migrations(&pool).await?;
//!
//! let report = run_analysis(&pool, &config, None, "https://example.com").await?;
//! println!(
//!     "Analyzed {} pages, {} links ({} broken), score {:.0}/100",
//!     report.total_pages, report.total_links, report.broken_links, report.overall_score
//! );
//! # Ok(())
//! # }
//! ```
//!
//! # Requirements
//!
//! This library requires a Tokio runtime. Use `#[tokio::main]` in your
//! application or ensure you're calling library functions within an async
//! context.

mod app;
mod classify;
pub mod config;
mod crawl;
mod error_handling;
mod extract;
mod fetch;
mod run;
pub mod status_server;
pub mod storage;
mod validate;

// Re-export public API
pub use app::{canonical_string, init_logger_with, same_origin, validate_and_normalize_url};
pub use classify::{classify, PageClassification, PageType};
pub use config::{EngineConfig, LinkToggles, LogFormat, LogLevel};
pub use error_handling::{ConfigError, EngineError, ProcessingStats, StoreError};
pub use extract::{ExtractedLink, LinkExtractor, LinkType};
pub use fetch::{FetchFailure, FetchResponse, Fetcher};
pub use run::{
    run_analysis, run_analysis_as, AnalysisReport, RunHandle, RunManager, RunProgress,
    RunStatusInfo,
};
pub use storage::{
    delete_run, get_broken_link_details, get_parent_child, get_run, get_source,
    query_run_history, RunBundle, RunState, SourceDocument,
};
pub use validate::{EdgeRecord, LinkStatus, LinkValidator};
