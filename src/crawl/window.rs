//! Rolling window of fetch outcomes driving the adaptive batch size.

use std::collections::VecDeque;

use crate::config::{
    BATCH_CEILING, BATCH_FLOOR, BATCH_GROW_THRESHOLD, BATCH_SHRINK_THRESHOLD, OUTCOME_MIN_SAMPLE,
    OUTCOME_WINDOW_SIZE,
};

/// Tracks whether each of the most recent fetches failed. Owned by a single
/// driver loop, so no interior locking is needed.
#[derive(Debug)]
pub struct OutcomeWindow {
    outcomes: VecDeque<bool>,
    capacity: usize,
}

impl OutcomeWindow {
    pub fn new() -> Self {
        Self::with_capacity(OUTCOME_WINDOW_SIZE)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        OutcomeWindow {
            outcomes: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Records one fetch outcome; `error` marks failures.
    pub fn record(&mut self, error: bool) {
        if self.outcomes.len() == self.capacity {
            self.outcomes.pop_front();
        }
        self.outcomes.push_back(error);
    }

    /// Error fraction over the window, 0.0 when empty.
    pub fn error_rate(&self) -> f64 {
        if self.outcomes.is_empty() {
            return 0.0;
        }
        let errors = self.outcomes.iter().filter(|e| **e).count();
        errors as f64 / self.outcomes.len() as f64
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }
}

impl Default for OutcomeWindow {
    fn default() -> Self {
        Self::new()
    }
}

/// Applies the halve/double rule to the current batch size.
///
/// Halved (floor 5) when the error rate exceeds 10%, doubled (ceiling 50)
/// when it drops below 5%. No adjustment until the window holds a minimum
/// sample.
pub fn next_batch_size(current: usize, window: &OutcomeWindow) -> usize {
    if window.len() < OUTCOME_MIN_SAMPLE {
        return current;
    }
    let rate = window.error_rate();
    if rate > BATCH_SHRINK_THRESHOLD {
        (current / 2).max(BATCH_FLOOR)
    } else if rate < BATCH_GROW_THRESHOLD {
        (current * 2).min(BATCH_CEILING)
    } else {
        current
    }
}
