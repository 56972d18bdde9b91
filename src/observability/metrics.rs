//! Validation metrics for validus
//!
//! - Counters only, monotonic between resets
//! - Thread-safe but lock-free; Relaxed ordering is enough for
//!   eventually consistent counters

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Counters tracked across every validation run by the engine.
#[derive(Debug, Default)]
pub struct ValidationMetrics {
    /// Total validation runs, pass or fail
    total_validations: AtomicU64,
    /// Runs that produced at least one error
    failed_validations: AtomicU64,
    /// Runs that reused a cached validator
    cache_hits: AtomicU64,
    /// Total wall-clock time spent validating, in microseconds
    total_duration_micros: AtomicU64,
}

impl ValidationMetrics {
    /// New registry with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one completed validation run.
    pub fn record(&self, success: bool, from_cache: bool, duration_micros: u64) {
        self.total_validations.fetch_add(1, Ordering::Relaxed);
        if !success {
            self.failed_validations.fetch_add(1, Ordering::Relaxed);
        }
        if from_cache {
            self.cache_hits.fetch_add(1, Ordering::Relaxed);
        }
        self.total_duration_micros
            .fetch_add(duration_micros, Ordering::Relaxed);
    }

    /// Total validation runs so far.
    pub fn total(&self) -> u64 {
        self.total_validations.load(Ordering::Relaxed)
    }

    /// Point-in-time snapshot with derived rates. The caller supplies
    /// the current cache size since the cache lives elsewhere.
    pub fn snapshot(&self, cache_size: usize) -> MetricsSnapshot {
        let total = self.total_validations.load(Ordering::Relaxed);
        let failed = self.failed_validations.load(Ordering::Relaxed);
        let hits = self.cache_hits.load(Ordering::Relaxed);
        let duration = self.total_duration_micros.load(Ordering::Relaxed);
        MetricsSnapshot {
            total_validations: total,
            failed_validations: failed,
            cache_hits: hits,
            cache_hit_rate: if total == 0 {
                0.0
            } else {
                hits as f64 / total as f64
            },
            total_duration_micros: duration,
            average_duration_micros: if total == 0 {
                0.0
            } else {
                duration as f64 / total as f64
            },
            cache_size,
        }
    }

    /// Zeroes every counter.
    pub fn reset(&self) {
        self.total_validations.store(0, Ordering::Relaxed);
        self.failed_validations.store(0, Ordering::Relaxed);
        self.cache_hits.store(0, Ordering::Relaxed);
        self.total_duration_micros.store(0, Ordering::Relaxed);
    }
}

/// A point-in-time view of the engine's counters.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    pub total_validations: u64,
    pub failed_validations: u64,
    pub cache_hits: u64,
    pub cache_hit_rate: f64,
    pub total_duration_micros: u64,
    pub average_duration_micros: f64,
    pub cache_size: usize,
}
