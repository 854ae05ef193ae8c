//! Status endpoint handlers.

use std::sync::atomic::Ordering;

use axum::extract::State;
use axum::Json;

use super::types::{StatusResponse, StatusState};

/// `/status`: JSON progress snapshot for the managed run.
pub async fn status_handler(State(state): State<StatusState>) -> Json<StatusResponse> {
    let progress = &state.progress;
    let completed = progress.crawl.completed.load(Ordering::SeqCst);
    let failed = progress.crawl.failed.load(Ordering::SeqCst);
    let elapsed = progress.start_time.elapsed().as_secs_f64();
    let rate = if elapsed > 0.0 {
        completed as f64 / elapsed
    } else {
        0.0
    };

    Json(StatusResponse {
        run_id: state.run_id.clone(),
        state: progress.state().as_str().to_string(),
        progress: progress.percent(),
        enqueued_urls: progress.crawl.enqueued.load(Ordering::SeqCst),
        completed_urls: completed,
        failed_urls: failed,
        validated_links: progress.validated.load(Ordering::SeqCst),
        elapsed_seconds: elapsed,
        rate_per_second: rate,
        info: progress.info(),
    })
}

/// `/healthz`: liveness probe.
pub async fn health_handler() -> &'static str {
    "ok"
}
