//! Caller-facing operations, ready to be bound to a transport.

use crate::batch::BatchExecutor;
use crate::bench::BenchmarkHarness;
use crate::config::ServiceConfig;
use crate::evaluator::EvaluatorSet;
use crate::model::{
    Backend, BatchJob, BatchOutcome, BenchmarkPlan, BenchmarkReport, HealthStatus,
    PermissionRequest, PermissionResponse,
};
use crate::observe::{SharedSink, TracingSink};
use crate::router::Router;
use futures::{Stream, StreamExt};
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct EntitlementService {
    router: Router,
    batch: BatchExecutor,
    bench: BenchmarkHarness,
}

impl EntitlementService {
    pub fn new(router: Router) -> Self {
        Self {
            batch: BatchExecutor::new(router.clone()),
            bench: BenchmarkHarness::new(router.clone()),
            router,
        }
    }

    /// Builds evaluators from `config` and wires them with a `tracing` sink.
    pub fn from_config(config: &ServiceConfig) -> anyhow::Result<Self> {
        Self::from_config_with_sink(config, Arc::new(TracingSink))
    }

    pub fn from_config_with_sink(config: &ServiceConfig, sink: SharedSink) -> anyhow::Result<Self> {
        let evaluators: EvaluatorSet = config.build_evaluators()?;
        tracing::info!(
            backends = ?evaluators,
            primary = config.comparison.primary.as_str(),
            secondary = config.comparison.secondary.as_str(),
            policy = ?config.comparison.policy,
            "entitlement service ready"
        );
        Ok(Self::new(Router::with_options(
            Arc::new(evaluators),
            config.comparison,
            sink,
            config.call_timeout(),
        )))
    }

    pub async fn check_permission(&self, request: &PermissionRequest) -> PermissionResponse {
        self.router.route(request).await
    }

    pub async fn check_bulk_permissions(&self, job: BatchJob) -> BatchOutcome {
        self.batch.run_job(job).await
    }

    pub async fn benchmark(&self, plan: &BenchmarkPlan) -> BenchmarkReport {
        self.bench.run(plan).await
    }

    /// Routes requests as they arrive; responses come out in input order and
    /// the output ends when the input does.
    pub fn stream_permission_checks<S>(
        &self,
        requests: S,
    ) -> impl Stream<Item = PermissionResponse> + Send + 'static
    where
        S: Stream<Item = PermissionRequest> + Send + 'static,
    {
        let router = self.router.clone();
        requests.then(move |request| {
            let router = router.clone();
            async move { router.route(&request).await }
        })
    }

    pub fn health(&self, backend: Option<Backend>) -> HealthStatus {
        HealthStatus {
            healthy: true,
            backend: backend.unwrap_or(Backend::Unspecified),
            status_message: "OK".to_string(),
        }
    }
}
