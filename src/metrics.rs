use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Atomic counters for one orchestrator instance. Safe to read while a run
/// is in flight.
#[derive(Debug, Default)]
pub struct RunMetrics {
    pub units_total: AtomicU64,
    pub units_succeeded: AtomicU64,
    pub units_failed: AtomicU64,
    pub reads: AtomicU64,
    pub conversions: AtomicU64,
    pub extractions: AtomicU64,
    pub evaluations: AtomicU64,
    pub exports: AtomicU64,
}

impl RunMetrics {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn start_unit(&self) {
        self.units_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn finish_unit(&self, succeeded: bool) {
        if succeeded {
            self.units_succeeded.fetch_add(1, Ordering::Relaxed);
        } else {
            self.units_failed.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_read(&self) {
        self.reads.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_conversion(&self) {
        self.conversions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_extraction(&self) {
        self.extractions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_evaluation(&self) {
        self.evaluations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_export(&self) {
        self.exports.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            units_total: self.units_total.load(Ordering::Relaxed),
            units_succeeded: self.units_succeeded.load(Ordering::Relaxed),
            units_failed: self.units_failed.load(Ordering::Relaxed),
            reads: self.reads.load(Ordering::Relaxed),
            conversions: self.conversions.load(Ordering::Relaxed),
            extractions: self.extractions.load(Ordering::Relaxed),
            evaluations: self.evaluations.load(Ordering::Relaxed),
            exports: self.exports.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`RunMetrics`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub units_total: u64,
    pub units_succeeded: u64,
    pub units_failed: u64,
    pub reads: u64,
    pub conversions: u64,
    pub extractions: u64,
    pub evaluations: u64,
    pub exports: u64,
}
