//! Bounded-concurrency execution of many independent checks.

use crate::gate::AdmissionGate;
use crate::model::{Backend, BatchJob, BatchOutcome, PermissionRequest, PermissionResponse};
use crate::router::{elapsed_ms, Router};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinSet;

#[derive(Debug, Clone)]
pub struct BatchExecutor {
    router: Router,
}

impl BatchExecutor {
    pub fn new(router: Router) -> Self {
        Self { router }
    }

    pub async fn run_job(&self, job: BatchJob) -> BatchOutcome {
        self.run(job.requests, job.max_concurrency).await
    }

    /// Routes every request and returns responses in input order, whatever
    /// order the workers finish in. `max_concurrency <= 0` runs all at once.
    pub async fn run(&self, requests: Vec<PermissionRequest>, max_concurrency: i32) -> BatchOutcome {
        if requests.is_empty() {
            return BatchOutcome::default();
        }

        let started = Instant::now();
        let total = requests.len();
        let gate = AdmissionGate::for_batch(max_concurrency);
        let successes = Arc::new(AtomicUsize::new(0));
        let errors = Arc::new(AtomicUsize::new(0));
        let mut join_set = JoinSet::new();

        for (idx, request) in requests.into_iter().enumerate() {
            let permit = gate.admit().await;
            let router = self.router.clone();
            let successes = successes.clone();
            let errors = errors.clone();
            join_set.spawn(async move {
                let routed = router.dispatch(&request).await;
                drop(permit);
                if routed.decided {
                    successes.fetch_add(1, Ordering::Relaxed);
                } else {
                    errors.fetch_add(1, Ordering::Relaxed);
                }
                (idx, routed.response)
            });
        }

        // One slot per input position; each worker fills only its own.
        let mut slots: Vec<Option<PermissionResponse>> = (0..total).map(|_| None).collect();
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok((idx, response)) => slots[idx] = Some(response),
                Err(e) => tracing::error!(error = %e, "batch worker terminated"),
            }
        }

        let mut lost = 0;
        let responses: Vec<PermissionResponse> = slots
            .into_iter()
            .map(|slot| {
                slot.unwrap_or_else(|| {
                    lost += 1;
                    PermissionResponse::failure(
                        Backend::Unspecified,
                        "batch worker terminated before responding",
                    )
                })
            })
            .collect();

        BatchOutcome {
            responses,
            success_count: successes.load(Ordering::Relaxed),
            error_count: errors.load(Ordering::Relaxed) + lost,
            total_time_ms: elapsed_ms(started),
        }
    }
}
