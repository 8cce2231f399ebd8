//! Run-scoped shared context.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde_json::Value;
use uuid::Uuid;

/// Shared context passed to every stage call of one `run()` invocation.
///
/// The value map is frozen at construction and read-only for all stages. For
/// cross-unit accumulation, callers register an explicitly thread-safe handle
/// (e.g. an `Arc<AtomicUsize>`) as an extension; the orchestrator provides no
/// synchronization beyond handing the same handle to every stage.
#[derive(Clone)]
pub struct RunContext {
    run_id: Uuid,
    started_at: DateTime<Utc>,
    values: Arc<HashMap<String, Value>>,
    extensions: Arc<DashMap<String, Arc<dyn Any + Send + Sync>>>,
}

impl RunContext {
    pub fn new() -> Self {
        Self::with_values(HashMap::new())
    }

    pub fn with_values(values: HashMap<String, Value>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            values: Arc::new(values),
            extensions: Arc::new(DashMap::new()),
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn values(&self) -> &HashMap<String, Value> {
        &self.values
    }

    /// Register a caller-synchronized accumulator shared by all stage calls.
    pub fn insert_extension<T: Any + Send + Sync>(&self, key: impl Into<String>, value: Arc<T>) {
        self.extensions.insert(key.into(), value);
    }

    pub fn extension<T: Any + Send + Sync>(&self, key: &str) -> Option<Arc<T>> {
        let entry = self.extensions.get(key)?;
        Arc::clone(entry.value()).downcast::<T>().ok()
    }
}

impl Default for RunContext {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for RunContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunContext")
            .field("run_id", &self.run_id)
            .field("started_at", &self.started_at)
            .field("values", &self.values)
            .field("extensions", &self.extensions.len())
            .finish()
    }
}
