use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::info;

/// Counters describing a run, shared between the dispatcher and every worker
#[derive(Debug, Clone)]
pub struct ScoutMetrics {
    // Dispatcher side
    items_dispatched: Arc<AtomicU64>,
    records_skipped: Arc<AtomicU64>,
    matches_written: Arc<AtomicU64>,

    // Worker side
    items_fetched: Arc<AtomicU64>,
    items_matched: Arc<AtomicU64>,
    fetch_failures: Arc<AtomicU64>,
}

impl ScoutMetrics {
    pub fn new() -> Self {
        Self {
            items_dispatched: Arc::new(AtomicU64::new(0)),
            records_skipped: Arc::new(AtomicU64::new(0)),
            matches_written: Arc::new(AtomicU64::new(0)),
            items_fetched: Arc::new(AtomicU64::new(0)),
            items_matched: Arc::new(AtomicU64::new(0)),
            fetch_failures: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn record_dispatched(&self) {
        self.items_dispatched.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_skipped(&self) {
        self.records_skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_written(&self) {
        self.matches_written.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a fetched item and whether any of its lines matched
    pub fn record_fetched(&self, matched: bool) {
        self.items_fetched.fetch_add(1, Ordering::Relaxed);
        if matched {
            self.items_matched.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_failure(&self) {
        self.fetch_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get_stats(&self) -> RunSummary {
        RunSummary {
            items_dispatched: self.items_dispatched.load(Ordering::Relaxed),
            records_skipped: self.records_skipped.load(Ordering::Relaxed),
            matches_written: self.matches_written.load(Ordering::Relaxed),
            items_fetched: self.items_fetched.load(Ordering::Relaxed),
            items_matched: self.items_matched.load(Ordering::Relaxed),
            fetch_failures: self.fetch_failures.load(Ordering::Relaxed),
        }
    }

    pub fn log_stats(&self) {
        let stats = self.get_stats();
        info!(
            "Run stats:\n\
             Items dispatched: {}\n\
             Records skipped: {}\n\
             Items fetched/matched: {}/{}\n\
             Fetch failures: {}\n\
             Matches written: {}",
            stats.items_dispatched,
            stats.records_skipped,
            stats.items_fetched,
            stats.items_matched,
            stats.fetch_failures,
            stats.matches_written
        );
    }
}

impl Default for ScoutMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of [`ScoutMetrics`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub items_dispatched: u64,
    pub records_skipped: u64,
    pub matches_written: u64,
    pub items_fetched: u64,
    pub items_matched: u64,
    pub fetch_failures: u64,
}
