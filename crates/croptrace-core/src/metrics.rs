//! Global atomic counters for pipeline observability.
//!
//! Counters are incremented silently at the call site. Call
//! [`Metrics::flush`] to emit current values as a single
//! `tracing::info!` event (e.g. when a worker shuts down).

use std::sync::atomic::{AtomicU64, Ordering};

/// Global metrics singleton.
pub static METRICS: Metrics = Metrics::new();

/// Lightweight atomic counters with no allocations and no locking.
pub struct Metrics {
    batches_evaluated: AtomicU64,
    batches_flagged: AtomicU64,
    records_built: AtomicU64,
    records_anchored: AtomicU64,
    dependency_failures: AtomicU64,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub const fn new() -> Self {
        Self {
            batches_evaluated: AtomicU64::new(0),
            batches_flagged: AtomicU64::new(0),
            records_built: AtomicU64::new(0),
            records_anchored: AtomicU64::new(0),
            dependency_failures: AtomicU64::new(0),
        }
    }

    pub fn inc_batches_evaluated(&self) {
        self.batches_evaluated.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "batches_evaluated", "counter incremented");
    }

    pub fn inc_batches_flagged(&self) {
        self.batches_flagged.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "batches_flagged", "counter incremented");
    }

    pub fn inc_records_built(&self) {
        self.records_built.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "records_built", "counter incremented");
    }

    pub fn inc_records_anchored(&self) {
        self.records_anchored.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "records_anchored", "counter incremented");
    }

    pub fn inc_dependency_failures(&self) {
        self.dependency_failures.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "dependency_failures", "counter incremented");
    }

    /// Emit all current counter values as a single `info!` event.
    pub fn flush(&self) {
        tracing::info!(
            metric = "flush",
            batches_evaluated = self.batches_evaluated(),
            batches_flagged = self.batches_flagged(),
            records_built = self.records_built(),
            records_anchored = self.records_anchored(),
            dependency_failures = self.dependency_failures(),
        );
    }

    pub fn batches_evaluated(&self) -> u64 {
        self.batches_evaluated.load(Ordering::Relaxed)
    }

    pub fn batches_flagged(&self) -> u64 {
        self.batches_flagged.load(Ordering::Relaxed)
    }

    pub fn records_built(&self) -> u64 {
        self.records_built.load(Ordering::Relaxed)
    }

    pub fn records_anchored(&self) -> u64 {
        self.records_anchored.load(Ordering::Relaxed)
    }

    pub fn dependency_failures(&self) -> u64 {
        self.dependency_failures.load(Ordering::Relaxed)
    }

    /// Reset all counters to zero (useful in tests).
    pub fn reset(&self) {
        self.batches_evaluated.store(0, Ordering::Relaxed);
        self.batches_flagged.store(0, Ordering::Relaxed);
        self.records_built.store(0, Ordering::Relaxed);
        self.records_anchored.store(0, Ordering::Relaxed);
        self.dependency_failures.store(0, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_increment() {
        let m = Metrics::new();
        assert_eq!(m.batches_evaluated(), 0);
        m.inc_batches_evaluated();
        m.inc_batches_evaluated();
        assert_eq!(m.batches_evaluated(), 2);

        m.inc_batches_flagged();
        assert_eq!(m.batches_flagged(), 1);

        m.inc_records_built();
        m.inc_records_anchored();
        m.inc_dependency_failures();
        m.inc_dependency_failures();
        assert_eq!(m.records_built(), 1);
        assert_eq!(m.records_anchored(), 1);
        assert_eq!(m.dependency_failures(), 2);
    }

    #[test]
    fn reset_zeroes_all() {
        let m = Metrics::new();
        m.inc_batches_evaluated();
        m.inc_batches_flagged();
        m.inc_records_built();
        m.reset();
        assert_eq!(m.batches_evaluated(), 0);
        assert_eq!(m.batches_flagged(), 0);
        assert_eq!(m.records_built(), 0);
    }
}
