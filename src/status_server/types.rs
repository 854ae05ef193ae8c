//! Status server data structures.

use std::sync::Arc;

use serde::Serialize;

use crate::run::RunProgress;

/// Shared state for the status server.
#[derive(Clone)]
pub struct StatusState {
    pub run_id: String,
    pub progress: Arc<RunProgress>,
}

/// JSON response for the `/status` endpoint.
#[derive(Serialize)]
pub struct StatusResponse {
    pub run_id: String,
    pub state: String,
    pub progress: u8,
    pub enqueued_urls: usize,
    pub completed_urls: usize,
    pub failed_urls: usize,
    pub validated_links: usize,
    pub elapsed_seconds: f64,
    pub rate_per_second: f64,
    pub info: String,
}
