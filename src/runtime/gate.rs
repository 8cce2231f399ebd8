use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::Semaphore;

use super::GaugeGuard;
use crate::error::PipelineError;

/// Caps the number of simultaneously in-flight asynchronous stage calls.
///
/// Permits are FIFO-fair and released on success, failure, and unwind via
/// RAII, so a failing stage call can never leak a permit.
pub struct ConcurrencyGate {
    semaphore: Semaphore,
    max_concurrency: usize,
    in_flight: Arc<AtomicUsize>,
    high_water: Arc<AtomicUsize>,
}

impl ConcurrencyGate {
    pub fn new(max_concurrency: usize) -> Self {
        Self {
            semaphore: Semaphore::new(max_concurrency),
            max_concurrency,
            in_flight: Arc::new(AtomicUsize::new(0)),
            high_water: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    /// Number of gated futures executing right now.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Highest concurrent permit count observed since construction.
    pub fn high_water_mark(&self) -> usize {
        self.high_water.load(Ordering::SeqCst)
    }

    /// Drive `fut` while holding one permit.
    pub async fn run<T, F>(&self, fut: F) -> Result<T, PipelineError>
    where
        F: Future<Output = T>,
    {
        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|_| PipelineError::Runtime("concurrency gate semaphore closed".to_string()))?;
        let _gauge = GaugeGuard::enter(&self.in_flight, &self.high_water);
        Ok(fut.await)
    }
}
