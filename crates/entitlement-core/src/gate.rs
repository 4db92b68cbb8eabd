//! Admission gate bounding the number of in-flight evaluations.

use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

#[derive(Debug, Clone)]
pub struct AdmissionGate {
    slots: Option<Arc<Semaphore>>,
    limit: Option<usize>,
}

impl AdmissionGate {
    pub fn unbounded() -> Self {
        Self {
            slots: None,
            limit: None,
        }
    }

    pub fn bounded(limit: usize) -> Self {
        let limit = limit.max(1);
        Self {
            slots: Some(Arc::new(Semaphore::new(limit))),
            limit: Some(limit),
        }
    }

    /// Batch semantics: a ceiling `<= 0` admits everything at once.
    pub fn for_batch(ceiling: i32) -> Self {
        match usize::try_from(ceiling) {
            Ok(limit) if limit > 0 => Self::bounded(limit),
            _ => Self::unbounded(),
        }
    }

    /// Benchmark semantics: a ceiling `<= 0` runs one call at a time.
    pub fn for_benchmark(ceiling: i32) -> Self {
        Self::bounded(usize::try_from(ceiling).unwrap_or(0).max(1))
    }

    pub fn limit(&self) -> Option<usize> {
        self.limit
    }

    /// Waits for a free slot. The slot is released when the returned permit
    /// drops; an unbounded gate admits immediately and returns `None`.
    pub async fn admit(&self) -> Option<OwnedSemaphorePermit> {
        match &self.slots {
            // Never closed; acquisition cannot fail.
            Some(slots) => slots.clone().acquire_owned().await.ok(),
            None => None,
        }
    }
}
