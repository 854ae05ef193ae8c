//! Progress logging and end-of-run statistics.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use log::info;
use strum::IntoEnumIterator;

use crate::error_handling::{ErrorType, InfoType, ProcessingStats, WarningType};

/// Logs crawl/validation progress with a throughput estimate.
pub fn log_progress(
    start_time: Instant,
    completed: &AtomicUsize,
    failed: &AtomicUsize,
    total: Option<&AtomicUsize>,
) {
    let elapsed = start_time.elapsed().as_secs_f64();
    let done = completed.load(Ordering::SeqCst);
    let failures = failed.load(Ordering::SeqCst);
    let rate = if elapsed > 0.0 {
        done as f64 / elapsed
    } else {
        0.0
    };

    match total.map(|t| t.load(Ordering::SeqCst)) {
        Some(total) if total > 0 => info!(
            "Processed {done}/{total} URLs ({failures} failed) in {elapsed:.1}s (~{rate:.1}/s)"
        ),
        _ => info!("Processed {done} URLs ({failures} failed) in {elapsed:.1}s (~{rate:.1}/s)"),
    }
}

/// Prints non-zero error, warning, and info counters at the end of a run.
pub fn print_error_statistics(stats: &ProcessingStats) {
    let total = stats.total_errors();
    if total > 0 {
        info!("Error counts:");
        for error in ErrorType::iter() {
            let count = stats.error_count(error);
            if count > 0 {
                info!("   {}: {}", error.as_str(), count);
            }
        }
    }

    for warning in WarningType::iter() {
        let count = stats.warning_count(warning);
        if count > 0 {
            info!("   {}: {}", warning.as_str(), count);
        }
    }

    for info_type in InfoType::iter() {
        let count = stats.info_count(info_type);
        if count > 0 {
            info!("   {}: {}", info_type.as_str(), count);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_progress_does_not_panic_at_zero() {
        let completed = AtomicUsize::new(0);
        let failed = AtomicUsize::new(0);
        log_progress(Instant::now(), &completed, &failed, None);
    }

    #[test]
    fn test_print_error_statistics_empty() {
        let stats = ProcessingStats::new();
        print_error_statistics(&stats);
    }
}
