#![allow(dead_code)]

use async_trait::async_trait;
use entitlement_core::{
    Backend, Evaluator, EvaluatorError, EvaluatorSet, Observation, ObservationSink,
    PermissionRequest, PermissionResponse, Router,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Collects every observation for later assertions.
#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<Observation>>,
}

impl RecordingSink {
    pub fn events(&self) -> Vec<Observation> {
        self.events.lock().unwrap().clone()
    }
}

impl ObservationSink for RecordingSink {
    fn record(&self, observation: &Observation) {
        self.events.lock().unwrap().push(observation.clone());
    }
}

/// Echoes the actor back as the response message, sleeps for the
/// `delay_ms` context value, and tracks peak concurrency.
#[derive(Default)]
pub struct ProbeEvaluator {
    pub allowed: bool,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    calls: AtomicUsize,
}

impl ProbeEvaluator {
    pub fn answering(allowed: bool) -> Self {
        Self {
            allowed,
            ..Self::default()
        }
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Evaluator for ProbeEvaluator {
    async fn evaluate(
        &self,
        request: &PermissionRequest,
    ) -> Result<PermissionResponse, EvaluatorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        let delay = request
            .context
            .get("delay_ms")
            .and_then(|d| d.parse::<u64>().ok())
            .unwrap_or(1);
        tokio::time::sleep(Duration::from_millis(delay)).await;

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(PermissionResponse::decided(self.allowed).with_message(request.actor.clone()))
    }

    fn name(&self) -> &'static str {
        "probe"
    }
}

pub fn router_with(backend: Backend, evaluator: Arc<dyn Evaluator>) -> Router {
    Router::new(Arc::new(EvaluatorSet::new().with(backend, evaluator)))
}

pub fn david() -> PermissionRequest {
    PermissionRequest::new("david", "acc123", "can_download_statement")
}
