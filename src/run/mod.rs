//! Run driver: crawl, classify, validate, aggregate, persist.
//!
//! The driver is the only component that touches all of the others. Its
//! external contract is `(run_id, config) -> terminal status + persisted
//! artifacts`: network-level failures are absorbed into records, and only
//! configuration, storage, or invariant failures fail the run.

pub mod manager;
mod progress;

use std::path::PathBuf;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use log::{info, warn};
use sqlx::SqlitePool;
use tokio_util::sync::CancellationToken;
use url::Url;

pub use manager::{RunHandle, RunManager, RunStatusInfo};
pub use progress::RunProgress;

use crate::app::statistics::{log_progress, print_error_statistics};
use crate::app::url::{canonicalize, validate_and_normalize_url};
use crate::config::{EngineConfig, LOGGING_INTERVAL_SECS};
use crate::crawl::{CrawlOutcome, Frontier};
use crate::error_handling::{
    ConfigError, EngineError, ErrorType, ProcessingStats, StoreError,
};
use crate::extract::LinkExtractor;
use crate::fetch::{init_client, init_probe_client, Fetcher};
use crate::storage::{
    create_run, mark_run_completed, mark_run_failed, mark_run_running, persist_run, PageRecord,
    PersistPage, RunArtifacts, RunCounters, RunState,
};
use crate::validate::{known_pages, EdgeRecord, LinkValidator};

/// Summary of a completed analysis run.
#[derive(Debug, Clone)]
pub struct AnalysisReport {
    pub run_id: String,
    pub seed_url: String,
    pub total_pages: usize,
    pub total_links: usize,
    pub broken_links: usize,
    pub blank_pages: usize,
    pub content_pages: usize,
    pub overall_score: f64,
    pub elapsed_seconds: f64,
    pub db_path: PathBuf,
}

/// Runs a full analysis of `seed_url` under `config`, persisting all
/// artifacts and returning the aggregate report.
///
/// This is the main entry point for the library. A fresh run id is
/// generated; use [`run_analysis_as`] to control the id and observe
/// progress.
pub async fn run_analysis(
    pool: &SqlitePool,
    config: &EngineConfig,
    application_id: Option<&str>,
    seed_url: &str,
) -> Result<AnalysisReport, EngineError> {
    let run_id = format!("run_{}", Utc::now().timestamp_millis());
    run_analysis_as(
        pool,
        config,
        application_id,
        seed_url,
        &run_id,
        Arc::new(RunProgress::new()),
        CancellationToken::new(),
    )
    .await
}

/// Runs an analysis under a caller-chosen run id with shared progress
/// state and an external cancellation token.
///
/// The run row moves pending -> running -> {completed, failed}; on any
/// error the row carries a human-readable message and no partial
/// artifacts are persisted.
pub async fn run_analysis_as(
    pool: &SqlitePool,
    config: &EngineConfig,
    application_id: Option<&str>,
    seed_url: &str,
    run_id: &str,
    progress: Arc<RunProgress>,
    cancel: CancellationToken,
) -> Result<AnalysisReport, EngineError> {
    config.validate()?;

    let seed = validate_and_normalize_url(seed_url)
        .and_then(|normalized| canonicalize(&normalized, None))
        .ok_or_else(|| ConfigError::InvalidSeedUrl(seed_url.to_string()))?;

    create_run(pool, run_id, application_id, seed.as_str(), config.max_crawl_depth).await?;
    mark_run_running(pool, run_id).await?;
    progress.set_state(RunState::Running);
    progress.set_info(format!("analyzing {seed}"));
    info!("Starting run {run_id} for {seed}");

    match execute(pool, config, run_id, &seed, &progress, &cancel).await {
        Ok(report) => {
            progress.set_state(RunState::Completed);
            progress.set_info("completed");
            Ok(report)
        }
        Err(e) => {
            let message = match &e {
                EngineError::Cancelled => "cancelled".to_string(),
                other => other.to_string(),
            };
            if let Err(update_err) = mark_run_failed(pool, run_id, &message).await {
                warn!("Failed to record run failure for {run_id}: {update_err}");
            }
            progress.set_state(RunState::Failed);
            progress.set_info(message);
            Err(e)
        }
    }
}

async fn execute(
    pool: &SqlitePool,
    config: &EngineConfig,
    run_id: &str,
    seed: &Url,
    progress: &Arc<RunProgress>,
    cancel: &CancellationToken,
) -> Result<AnalysisReport, EngineError> {
    let stats = Arc::new(ProcessingStats::new());

    let client = init_client(&config.user_agent, config.request_timeout_seconds)?;
    let fetcher = Arc::new(Fetcher::new(
        client,
        config.max_concurrent_requests,
        config.retry_attempts,
        Arc::clone(&stats),
    ));
    let extractor = LinkExtractor::new(seed.clone());
    let frontier = Frontier::new(
        fetcher,
        extractor,
        config.clone(),
        Arc::clone(&stats),
        Arc::clone(&progress.crawl),
        cancel.clone(),
    );

    // Periodic progress logging for long crawls.
    let logging_cancel = cancel.child_token();
    let logging_crawl = Arc::clone(&progress.crawl);
    let start_time = progress.start_time;
    let logging_task = tokio::spawn(async move {
        let mut interval =
            tokio::time::interval(Duration::from_secs(LOGGING_INTERVAL_SECS));
        interval.tick().await; // first tick fires immediately
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    log_progress(
                        start_time,
                        &logging_crawl.completed,
                        &logging_crawl.failed,
                        Some(&logging_crawl.enqueued),
                    );
                }
                _ = logging_cancel.cancelled() => break,
            }
        }
    });

    let crawl_result = frontier.crawl(seed).await;
    logging_task.abort();
    let outcome = crawl_result?;

    progress.set_info("validating links");
    let edges = validate_edges(config, &outcome, &stats, progress).await?;

    let artifacts = build_artifacts(config, outcome, edges);
    let records: Vec<PageRecord> = artifacts.pages.iter().map(|p| p.record.clone()).collect();
    let counters = RunCounters::from_records(&records, &artifacts.edges);

    progress.set_info("persisting artifacts");
    persist_with_retry(pool, run_id, &artifacts, &stats).await?;
    mark_run_completed(pool, run_id, &counters).await?;

    print_error_statistics(&stats);
    let elapsed_seconds = progress.start_time.elapsed().as_secs_f64();
    info!(
        "Run {run_id} completed: {} pages, {} links, {} broken, score {:.0}",
        counters.pages_analyzed, counters.links_found, counters.broken_links,
        counters.overall_score
    );

    Ok(AnalysisReport {
        run_id: run_id.to_string(),
        seed_url: artifacts.seed_url.clone(),
        total_pages: counters.pages_analyzed as usize,
        total_links: counters.links_found as usize,
        broken_links: counters.broken_links as usize,
        blank_pages: counters.blank_pages as usize,
        content_pages: counters.content_pages as usize,
        overall_score: counters.overall_score,
        elapsed_seconds,
        db_path: config.db_path.clone(),
    })
}

async fn validate_edges(
    config: &EngineConfig,
    outcome: &CrawlOutcome,
    stats: &Arc<ProcessingStats>,
    progress: &Arc<RunProgress>,
) -> Result<Vec<EdgeRecord>, EngineError> {
    let probe_client = init_probe_client(&config.user_agent, config.request_timeout_seconds)?;
    let validator = LinkValidator::new(
        probe_client,
        Arc::clone(stats),
        Arc::clone(&progress.validated),
    );

    let budget = (config.max_links_to_validate as usize).min(outcome.edges.len());
    progress.validation_target.store(budget, Ordering::SeqCst);

    let pages = known_pages(&outcome.pages);
    Ok(validator
        .validate(&outcome.edges, &pages, config.max_links_to_validate as usize)
        .await)
}

/// Converts a crawl outcome plus validated edges into the persist input.
fn build_artifacts(
    config: &EngineConfig,
    outcome: CrawlOutcome,
    edges: Vec<EdgeRecord>,
) -> RunArtifacts {
    let (parent_map, _children, path_map) = outcome.paths.into_maps();

    let pages = outcome
        .pages
        .into_iter()
        .map(|page| {
            let fetched = page.fetched();
            let record = PageRecord {
                page_url: page.url,
                title: page.classification.title,
                word_count: page.classification.word_count as i64,
                page_type: page.classification.page_type,
                has_header: page.classification.has_header,
                has_footer: page.classification.has_footer,
                has_navigation: page.classification.has_navigation,
                structure_digest: page.classification.structure_digest,
                depth: page.depth,
                path: page.path,
            };
            PersistPage {
                record,
                body: page.body,
                fetched,
            }
        })
        .collect();

    RunArtifacts {
        seed_url: outcome.seed,
        max_crawl_depth: config.max_crawl_depth,
        pages,
        edges,
        parent_map,
        path_map,
    }
}

/// Store writes are retried once; invariant violations are not retried
/// (re-running cannot fix them) and fail the run immediately.
async fn persist_with_retry(
    pool: &SqlitePool,
    run_id: &str,
    artifacts: &RunArtifacts,
    stats: &ProcessingStats,
) -> Result<(), EngineError> {
    match persist_run(pool, run_id, artifacts).await {
        Ok(()) => Ok(()),
        Err(StoreError::InvariantViolation(message)) => {
            Err(StoreError::InvariantViolation(message).into())
        }
        Err(first) => {
            stats.increment_error(ErrorType::StoreWriteError);
            warn!("persist_run failed for {run_id}, retrying once: {first}");
            persist_run(pool, run_id, artifacts)
                .await
                .map_err(EngineError::from)
        }
    }
}
