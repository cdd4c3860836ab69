use std::collections::HashMap;
use std::time::Instant;
use tracing::{info, warn};

/// Tallies per-entry outcomes of a window resolution and logs periodic
/// progress plus a final summary
pub struct ProgressTracker {
    total: usize,
    resolved: usize,
    cached: usize,
    failed: usize,
    pending: usize,
    start_time: Instant,
    progress_interval: usize,
    last_progress_log: usize,
    error_counts: HashMap<String, usize>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
/// Final counts for one window resolution
pub struct ProgressSummary {
    pub total: usize,
    pub resolved: usize,
    pub cached: usize,
    pub failed: usize,
    pub pending: usize,
}

impl ProgressTracker {
    /// Track `total` entries, logging every `progress_interval` of them
    pub fn new(total: usize, progress_interval: usize) -> Self {
        if total > 10 {
            info!("Resolving {} entries", total);
        }
        Self {
            total,
            resolved: 0,
            cached: 0,
            failed: 0,
            pending: 0,
            start_time: Instant::now(),
            progress_interval: progress_interval.max(1),
            last_progress_log: 0,
            error_counts: HashMap::new(),
        }
    }

    /// Freshly resolved through the catalog (or joined an in-flight resolution)
    pub fn record_resolved(&mut self) {
        self.resolved += 1;
    }

    pub fn record_cached(&mut self) {
        self.cached += 1;
    }

    pub fn record_pending(&mut self) {
        self.pending += 1;
    }

    pub fn record_failed(&mut self, error_category: &str) {
        self.failed += 1;
        *self.error_counts.entry(error_category.to_string()).or_insert(0) += 1;
    }

    /// `current` is 1-based
    pub fn log_progress(&mut self, current: usize) {
        if current - self.last_progress_log < self.progress_interval && current != self.total {
            return;
        }
        let elapsed = self.start_time.elapsed();
        // Cache-only runs finish instantly; nothing worth reporting
        if elapsed.as_secs_f64() < 0.5 && current < self.total {
            return;
        }
        info!(
            "Progress: {}/{} | Resolved: {} | Cached: {} | Failed: {} | Pending: {}",
            current, self.total, self.resolved, self.cached, self.failed, self.pending
        );
        self.last_progress_log = current;
    }

    pub fn summary(&self) -> ProgressSummary {
        ProgressSummary {
            total: self.total,
            resolved: self.resolved,
            cached: self.cached,
            failed: self.failed,
            pending: self.pending,
        }
    }

    pub fn log_summary(&self, operation_name: &str) {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        if self.failed == 0 {
            info!(
                "{} completed: {} entries in {:.1}s | Resolved: {} | Cached: {} | Pending: {}",
                operation_name, self.total, elapsed, self.resolved, self.cached, self.pending
            );
            return;
        }

        warn!(
            "{} completed: {} entries in {:.1}s | Resolved: {} | Cached: {} | Failed: {} | Pending: {}",
            operation_name, self.total, elapsed, self.resolved, self.cached, self.failed, self.pending
        );
        let mut breakdown: Vec<_> = self.error_counts.iter().collect();
        breakdown.sort_by(|a, b| b.1.cmp(a.1).then(a.0.cmp(b.0)));
        let breakdown: Vec<String> = breakdown
            .iter()
            .map(|(category, count)| format!("{}: {}", category, count))
            .collect();
        info!("Error breakdown: {}", breakdown.join(", "));
    }
}
