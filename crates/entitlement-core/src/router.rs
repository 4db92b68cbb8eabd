//! Routes a request to the evaluator selected by its backend hint.
//!
//! The router never fails: an unconfigured backend or a raised evaluator error
//! both come back as a negative [`PermissionResponse`] with a diagnostic.

use crate::compare::{ComparisonConfig, Comparator};
use crate::errors::EvaluatorError;
use crate::evaluator::{Evaluator, EvaluatorSet};
use crate::model::{Backend, PermissionRequest, PermissionResponse};
use crate::observe::{Observation, SharedSink, TracingSink};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// A routed response plus whether any evaluator actually decided it.
#[derive(Debug, Clone, PartialEq)]
pub struct Routed {
    pub response: PermissionResponse,
    /// False when the response was synthesized from a failure: backend
    /// unavailable, evaluator error, or both sides of a dual check failing.
    pub decided: bool,
}

impl Routed {
    pub(crate) fn decided(response: PermissionResponse) -> Self {
        Self {
            response,
            decided: true,
        }
    }

    pub(crate) fn failed(response: PermissionResponse) -> Self {
        Self {
            response,
            decided: false,
        }
    }
}

#[derive(Clone)]
pub struct Router {
    evaluators: Arc<EvaluatorSet>,
    comparator: Comparator,
    sink: SharedSink,
    call_timeout: Option<Duration>,
}

impl Router {
    /// Router with the default comparison pair, `tracing` observations and no
    /// per-call deadline.
    pub fn new(evaluators: Arc<EvaluatorSet>) -> Self {
        Self::with_options(
            evaluators,
            ComparisonConfig::default(),
            Arc::new(TracingSink),
            None,
        )
    }

    pub fn with_options(
        evaluators: Arc<EvaluatorSet>,
        comparison: ComparisonConfig,
        sink: SharedSink,
        call_timeout: Option<Duration>,
    ) -> Self {
        let comparator = Comparator::new(evaluators.clone(), comparison, sink.clone(), call_timeout);
        Self {
            evaluators,
            comparator,
            sink,
            call_timeout,
        }
    }

    pub async fn route(&self, request: &PermissionRequest) -> PermissionResponse {
        self.dispatch(request).await.response
    }

    /// Same as [`route`](Self::route) but also reports whether the response is
    /// a real decision, for callers that count failures.
    pub async fn dispatch(&self, request: &PermissionRequest) -> Routed {
        let backend = request.backend_hint();
        if backend == Backend::Both {
            return self.comparator.compare(request).await;
        }

        let Some(evaluator) = self.evaluators.get(backend) else {
            self.sink.record(&Observation::BackendUnavailable { backend });
            return Routed::failed(PermissionResponse::unavailable(backend));
        };

        let started = Instant::now();
        let outcome = invoke(evaluator.clone(), Arc::new(request.clone()), self.call_timeout).await;
        let elapsed_ms = elapsed_ms(started);
        match outcome {
            Ok(response) => {
                Routed::decided(stamp_elapsed(response.with_backend(backend), elapsed_ms))
            }
            Err(err) => {
                tracing::debug!(
                    backend = backend.as_str(),
                    actor = %request.actor,
                    resource = %request.resource,
                    permission = %request.permission,
                    error = %err,
                    "evaluator failed"
                );
                Routed::failed(
                    PermissionResponse::failure(backend, err.to_string()).with_elapsed_ms(elapsed_ms),
                )
            }
        }
    }
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("evaluators", &self.evaluators)
            .field("comparator", &self.comparator)
            .field("call_timeout", &self.call_timeout)
            .finish()
    }
}

/// Runs one evaluation on its own task so it can be bounded by a deadline and
/// so a panicking evaluator surfaces as an error instead of unwinding the caller.
pub(crate) async fn invoke(
    evaluator: Arc<dyn Evaluator>,
    request: Arc<PermissionRequest>,
    deadline: Option<Duration>,
) -> Result<PermissionResponse, EvaluatorError> {
    let task = tokio::spawn(async move {
        match deadline {
            Some(limit) => tokio::time::timeout(limit, evaluator.evaluate(&request))
                .await
                .unwrap_or_else(|_| {
                    Err(EvaluatorError::Timeout {
                        after_ms: u64::try_from(limit.as_millis()).unwrap_or(u64::MAX),
                    })
                }),
            None => evaluator.evaluate(&request).await,
        }
    });
    match task.await {
        Ok(result) => result,
        Err(e) => Err(EvaluatorError::internal(format!("evaluator task failed: {e}"))),
    }
}

pub(crate) fn elapsed_ms(started: Instant) -> f64 {
    started.elapsed().as_secs_f64() * 1000.0
}

/// Keeps an evaluator's own timing; fills in `measured` when it reported none.
pub(crate) fn stamp_elapsed(response: PermissionResponse, measured: f64) -> PermissionResponse {
    if response.elapsed_ms > 0.0 {
        response
    } else {
        response.with_elapsed_ms(measured)
    }
}
