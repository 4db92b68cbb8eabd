//! Dual-backend comparison.
//!
//! Both evaluations run concurrently and are always awaited. Reconciliation,
//! in priority order:
//!
//! 1. both failed: negative response embedding both failure texts
//! 2. one failed: the surviving response, noting which side was skipped
//! 3. both answered: the primary's response; disagreement is recorded and,
//!    under [`ReconcilePolicy::Strict`], withheld as `Unspecified`
//!
//! Every branch tags the response [`Backend::Both`].

use crate::errors::EvaluatorError;
use crate::evaluator::EvaluatorSet;
use crate::model::{Backend, PermissionRequest, PermissionResponse, Permissionship};
use crate::observe::{Observation, SharedSink};
use crate::router::{elapsed_ms, invoke, stamp_elapsed, Routed};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// What to return when both evaluators answer but disagree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconcilePolicy {
    /// Return the primary's decision; the disagreement is only recorded.
    #[default]
    PrimaryWins,
    /// Withhold a decision: `allowed = false`, permissionship `Unspecified`.
    Strict,
}

impl FromStr for ReconcilePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "primary_wins" | "primary-wins" | "primary" => Ok(Self::PrimaryWins),
            "strict" => Ok(Self::Strict),
            other => Err(format!(
                "unknown reconcile policy '{other}' (expected primary_wins or strict)"
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ComparisonConfig {
    pub primary: Backend,
    pub secondary: Backend,
    pub policy: ReconcilePolicy,
}

impl Default for ComparisonConfig {
    fn default() -> Self {
        Self {
            primary: Backend::Relationship,
            secondary: Backend::PropertyGraph,
            policy: ReconcilePolicy::PrimaryWins,
        }
    }
}

#[derive(Clone)]
pub struct Comparator {
    evaluators: Arc<EvaluatorSet>,
    config: ComparisonConfig,
    sink: SharedSink,
    call_timeout: Option<Duration>,
}

impl Comparator {
    pub fn new(
        evaluators: Arc<EvaluatorSet>,
        config: ComparisonConfig,
        sink: SharedSink,
        call_timeout: Option<Duration>,
    ) -> Self {
        Self {
            evaluators,
            config,
            sink,
            call_timeout,
        }
    }

    pub async fn compare_both(&self, request: &PermissionRequest) -> PermissionResponse {
        self.compare(request).await.response
    }

    pub(crate) async fn compare(&self, request: &PermissionRequest) -> Routed {
        let shared = Arc::new(request.clone());
        let started = Instant::now();
        let (primary, secondary) = tokio::join!(
            self.evaluate_side(self.config.primary, shared.clone()),
            self.evaluate_side(self.config.secondary, shared),
        );
        let elapsed_ms = elapsed_ms(started);
        let Routed { response, decided } = self.reconcile(request, primary, secondary);
        Routed {
            response: stamp_elapsed(response, elapsed_ms),
            decided,
        }
    }

    async fn evaluate_side(
        &self,
        backend: Backend,
        request: Arc<PermissionRequest>,
    ) -> Result<PermissionResponse, EvaluatorError> {
        match self.evaluators.get(backend) {
            Some(evaluator) => invoke(evaluator.clone(), request, self.call_timeout).await,
            None => Err(EvaluatorError::Unavailable { backend }),
        }
    }

    fn reconcile(
        &self,
        request: &PermissionRequest,
        primary: Result<PermissionResponse, EvaluatorError>,
        secondary: Result<PermissionResponse, EvaluatorError>,
    ) -> Routed {
        let ComparisonConfig {
            primary: p,
            secondary: s,
            policy,
        } = self.config;

        match (primary, secondary) {
            (Err(p_err), Err(s_err)) => {
                self.side_failed(p, &p_err);
                self.side_failed(s, &s_err);
                Routed::failed(PermissionResponse::failure(
                    Backend::Both,
                    format!(
                        "Both backends unavailable - {}: {}, {}: {}",
                        p.label(),
                        p_err,
                        s.label(),
                        s_err
                    ),
                ))
            }
            (Err(p_err), Ok(survivor)) => {
                self.side_failed(p, &p_err);
                Routed::decided(skipped(survivor, p, &p_err, s))
            }
            (Ok(survivor), Err(s_err)) => {
                self.side_failed(s, &s_err);
                Routed::decided(skipped(survivor, s, &s_err, p))
            }
            (Ok(p_resp), Ok(s_resp)) => {
                if p_resp.allowed == s_resp.allowed {
                    self.sink.record(&Observation::Match {
                        actor: request.actor.clone(),
                        resource: request.resource.clone(),
                        permission: request.permission.clone(),
                        primary: p,
                        secondary: s,
                        allowed: p_resp.allowed,
                    });
                    return Routed::decided(p_resp.with_backend(Backend::Both));
                }

                self.sink.record(&Observation::Mismatch {
                    actor: request.actor.clone(),
                    resource: request.resource.clone(),
                    permission: request.permission.clone(),
                    primary: p,
                    primary_allowed: p_resp.allowed,
                    secondary: s,
                    secondary_allowed: s_resp.allowed,
                });
                match policy {
                    ReconcilePolicy::PrimaryWins => {
                        Routed::decided(p_resp.with_backend(Backend::Both))
                    }
                    ReconcilePolicy::Strict => Routed::decided(
                        PermissionResponse::decided(false)
                            .with_permissionship(Permissionship::Unspecified)
                            .with_backend(Backend::Both)
                            .with_elapsed_ms(p_resp.elapsed_ms.max(s_resp.elapsed_ms))
                            .with_message(format!(
                                "backends disagree - {}: {}, {}: {}",
                                p.label(),
                                p_resp.allowed,
                                s.label(),
                                s_resp.allowed
                            )),
                    ),
                }
            }
        }
    }

    fn side_failed(&self, backend: Backend, err: &EvaluatorError) {
        self.sink.record(&Observation::SideFailed {
            backend,
            error: err.to_string(),
        });
    }
}

impl std::fmt::Debug for Comparator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Comparator")
            .field("config", &self.config)
            .field("call_timeout", &self.call_timeout)
            .finish()
    }
}

/// Rewrites the surviving side's response for a half-failed dual check.
fn skipped(
    survivor: PermissionResponse,
    failed: Backend,
    err: &EvaluatorError,
    used: Backend,
) -> PermissionResponse {
    let note = format!(
        "{} skipped ({}), using {} only",
        failed.label(),
        err,
        used.label()
    );
    let message = match survivor.message.as_deref() {
        Some(existing) if !existing.is_empty() => format!("{note}: {existing}"),
        _ => note,
    };
    survivor.with_backend(Backend::Both).with_message(message)
}
