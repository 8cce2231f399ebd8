use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::Semaphore;

use super::GaugeGuard;
use crate::error::PipelineError;

/// Bounded executor for synchronous, CPU-bound stage calls.
///
/// At most `max_workers` submitted closures run concurrently; excess
/// submissions queue in FIFO order on the semaphore. A panicking closure is
/// captured and surfaced through the returned future without affecting the
/// pool. The pool is scoped to a single orchestrator run.
pub struct WorkerPool {
    semaphore: Arc<Semaphore>,
    max_workers: usize,
    in_flight: Arc<AtomicUsize>,
    high_water: Arc<AtomicUsize>,
}

impl WorkerPool {
    pub fn new(max_workers: usize) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(max_workers)),
            max_workers,
            in_flight: Arc::new(AtomicUsize::new(0)),
            high_water: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn max_workers(&self) -> usize {
        self.max_workers
    }

    /// Number of closures executing right now.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Highest concurrent closure count observed since construction.
    pub fn high_water_mark(&self) -> usize {
        self.high_water.load(Ordering::SeqCst)
    }

    pub async fn submit<T, F>(&self, f: F) -> Result<T, PipelineError>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let permit = Arc::clone(&self.semaphore)
            .acquire_owned()
            .await
            .map_err(|_| PipelineError::Runtime("worker pool semaphore closed".to_string()))?;

        let in_flight = Arc::clone(&self.in_flight);
        let high_water = Arc::clone(&self.high_water);
        let handle = tokio::task::spawn_blocking(move || {
            // Permit is held for the full duration of the blocking call, even
            // if the caller stops polling the returned future.
            let _permit = permit;
            let _gauge = GaugeGuard::enter(&in_flight, &high_water);
            f()
        });

        match handle.await {
            Ok(value) => Ok(value),
            Err(e) if e.is_panic() => Err(PipelineError::Runtime(format!(
                "worker pool task panicked: {e}"
            ))),
            Err(e) => Err(PipelineError::Runtime(format!(
                "worker pool task failed: {e}"
            ))),
        }
    }
}
