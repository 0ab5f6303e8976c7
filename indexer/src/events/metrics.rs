//! Metrics tracking for the scan loop.
//!
//! Provides atomic counters for monitoring indexing progress. These are
//! in-process counters surfaced through logs; there is no export surface.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Metrics for the scheduler.
#[derive(Debug)]
pub struct IndexerMetrics {
    /// Batches durably committed.
    batches_committed: AtomicU64,

    /// Event records persisted (before store-side dedup).
    events_indexed: AtomicU64,

    /// Logs skipped because they were undecodable.
    logs_skipped: AtomicU64,

    /// Failed batches (fetch or persistence errors).
    batch_errors: AtomicU64,

    /// Total time spent in committed batches, in nanoseconds.
    total_batch_time_ns: AtomicU64,

    /// Start time for rate calculation.
    start_time: Instant,
}

impl Default for IndexerMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl IndexerMetrics {
    /// Creates a new metrics instance.
    #[must_use]
    pub fn new() -> Self {
        Self {
            batches_committed: AtomicU64::new(0),
            events_indexed: AtomicU64::new(0),
            logs_skipped: AtomicU64::new(0),
            batch_errors: AtomicU64::new(0),
            total_batch_time_ns: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    /// Records a committed batch.
    pub fn record_batch(&self, events: u64, skipped: u64, duration: Duration) {
        self.batches_committed.fetch_add(1, Ordering::Relaxed);
        self.events_indexed.fetch_add(events, Ordering::Relaxed);
        self.logs_skipped.fetch_add(skipped, Ordering::Relaxed);
        self.total_batch_time_ns
            .fetch_add(duration.as_nanos() as u64, Ordering::Relaxed);
    }

    /// Records a failed batch.
    pub fn record_error(&self) {
        self.batch_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns the number of batches committed.
    #[must_use]
    pub fn batches_committed(&self) -> u64 {
        self.batches_committed.load(Ordering::Relaxed)
    }

    /// Returns the number of events persisted.
    #[must_use]
    pub fn events_indexed(&self) -> u64 {
        self.events_indexed.load(Ordering::Relaxed)
    }

    /// Returns the number of undecodable logs skipped.
    #[must_use]
    pub fn logs_skipped(&self) -> u64 {
        self.logs_skipped.load(Ordering::Relaxed)
    }

    /// Returns the number of failed batches.
    #[must_use]
    pub fn batch_errors(&self) -> u64 {
        self.batch_errors.load(Ordering::Relaxed)
    }

    /// Returns the total time spent in committed batches.
    #[must_use]
    pub fn total_batch_time(&self) -> Duration {
        Duration::from_nanos(self.total_batch_time_ns.load(Ordering::Relaxed))
    }

    /// Returns the events per second since start.
    #[must_use]
    pub fn events_per_second(&self) -> f64 {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            self.events_indexed() as f64 / elapsed
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metrics_start_at_zero() {
        let metrics = IndexerMetrics::new();
        assert_eq!(metrics.batches_committed(), 0);
        assert_eq!(metrics.events_indexed(), 0);
        assert_eq!(metrics.logs_skipped(), 0);
        assert_eq!(metrics.batch_errors(), 0);
    }

    #[test]
    fn record_batch_accumulates() {
        let metrics = IndexerMetrics::new();
        metrics.record_batch(10, 1, Duration::from_millis(5));
        metrics.record_batch(5, 0, Duration::from_millis(3));

        assert_eq!(metrics.batches_committed(), 2);
        assert_eq!(metrics.events_indexed(), 15);
        assert_eq!(metrics.logs_skipped(), 1);
        assert_eq!(metrics.total_batch_time(), Duration::from_millis(8));
    }

    #[test]
    fn record_error_counts() {
        let metrics = IndexerMetrics::new();
        metrics.record_error();
        metrics.record_error();
        assert_eq!(metrics.batch_errors(), 2);
    }
}
