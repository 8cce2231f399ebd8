//! Bounded execution primitives shared by both orchestrators.

pub mod gate;
pub mod worker_pool;

pub use gate::ConcurrencyGate;
pub use worker_pool::WorkerPool;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// RAII in-flight gauge. Increments on enter, records the high-water mark,
/// and decrements on drop, including unwind paths.
pub(crate) struct GaugeGuard {
    gauge: Arc<AtomicUsize>,
}

impl GaugeGuard {
    pub(crate) fn enter(gauge: &Arc<AtomicUsize>, high_water: &Arc<AtomicUsize>) -> Self {
        let current = gauge.fetch_add(1, Ordering::SeqCst) + 1;
        high_water.fetch_max(current, Ordering::SeqCst);
        Self {
            gauge: Arc::clone(gauge),
        }
    }
}

impl Drop for GaugeGuard {
    fn drop(&mut self) {
        self.gauge.fetch_sub(1, Ordering::SeqCst);
    }
}
