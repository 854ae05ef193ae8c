//! Shared progress state for a single run.
//!
//! The driver updates these counters as it works; the run manager and the
//! optional status server read them concurrently.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use crate::crawl::CrawlCounters;
use crate::storage::RunState;

/// Live progress of one run.
pub struct RunProgress {
    pub crawl: Arc<CrawlCounters>,
    /// Edges that received a validation record so far.
    pub validated: Arc<AtomicUsize>,
    /// Edges selected for validation; set when validation starts.
    pub validation_target: AtomicUsize,
    state: Mutex<RunState>,
    info: Mutex<String>,
    pub start_time: Instant,
}

impl RunProgress {
    pub fn new() -> Self {
        RunProgress {
            crawl: Arc::new(CrawlCounters::default()),
            validated: Arc::new(AtomicUsize::new(0)),
            validation_target: AtomicUsize::new(0),
            state: Mutex::new(RunState::Pending),
            info: Mutex::new(String::new()),
            start_time: Instant::now(),
        }
    }

    pub fn set_state(&self, state: RunState) {
        if let Ok(mut guard) = self.state.lock() {
            *guard = state;
        }
    }

    pub fn state(&self) -> RunState {
        self.state.lock().map(|guard| *guard).unwrap_or(RunState::Failed)
    }

    pub fn set_info(&self, message: impl Into<String>) {
        if let Ok(mut guard) = self.info.lock() {
            *guard = message.into();
        }
    }

    pub fn info(&self) -> String {
        self.info.lock().map(|guard| guard.clone()).unwrap_or_default()
    }

    /// Progress estimate in [0, 100]: crawling is weighted 65 points,
    /// validation 30, with 5 granted on start. Terminal states pin to 100.
    pub fn percent(&self) -> u8 {
        let state = self.state();
        if state.is_terminal() {
            return 100;
        }
        if state == RunState::Pending {
            return 0;
        }

        let enqueued = self.crawl.enqueued.load(Ordering::SeqCst).max(1);
        let done =
            self.crawl.completed.load(Ordering::SeqCst) + self.crawl.failed.load(Ordering::SeqCst);
        let crawl_part = 65.0 * (done.min(enqueued) as f64 / enqueued as f64);

        let target = self.validation_target.load(Ordering::SeqCst);
        let validate_part = if target > 0 {
            30.0 * (self.validated.load(Ordering::SeqCst).min(target) as f64 / target as f64)
        } else {
            0.0
        };

        (5.0 + crawl_part + validate_part).min(99.0) as u8
    }
}

impl Default for RunProgress {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_starts_at_zero() {
        let progress = RunProgress::new();
        assert_eq!(progress.state(), RunState::Pending);
        assert_eq!(progress.percent(), 0);
    }

    #[test]
    fn test_progress_advances_with_crawl() {
        let progress = RunProgress::new();
        progress.set_state(RunState::Running);
        progress.crawl.enqueued.store(10, Ordering::SeqCst);
        progress.crawl.completed.store(5, Ordering::SeqCst);

        let halfway = progress.percent();
        assert!(halfway > 30 && halfway < 60, "got {halfway}");

        progress.crawl.completed.store(10, Ordering::SeqCst);
        assert!(progress.percent() >= 70);
    }

    #[test]
    fn test_progress_terminal_is_full() {
        let progress = RunProgress::new();
        progress.set_state(RunState::Completed);
        assert_eq!(progress.percent(), 100);

        progress.set_state(RunState::Failed);
        assert_eq!(progress.percent(), 100);
    }

    #[test]
    fn test_progress_caps_below_hundred_while_running() {
        let progress = RunProgress::new();
        progress.set_state(RunState::Running);
        progress.crawl.enqueued.store(4, Ordering::SeqCst);
        progress.crawl.completed.store(4, Ordering::SeqCst);
        progress.validation_target.store(2, Ordering::SeqCst);
        progress.validated.store(2, Ordering::SeqCst);
        assert!(progress.percent() < 100);
    }
}
