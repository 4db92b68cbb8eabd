//! The evaluator seam: one trait, one immutable registry.

pub mod fixture;
pub mod graphql;

pub use fixture::{Grant, StaticEvaluator};
pub use graphql::GraphQlEvaluator;

use crate::errors::EvaluatorError;
use crate::model::{Backend, PermissionRequest, PermissionResponse};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Decides, for one request, whether a permission is granted.
///
/// Implementations own their transport, query language and schema. The
/// dispatch layer never looks at *why* a decision was reached.
#[async_trait]
pub trait Evaluator: Send + Sync {
    async fn evaluate(
        &self,
        request: &PermissionRequest,
    ) -> Result<PermissionResponse, EvaluatorError>;

    fn name(&self) -> &'static str;
}

/// Evaluators configured at startup, keyed by backend.
///
/// Built once and shared read-only behind an `Arc`; there is no way to add or
/// remove an evaluator after construction.
#[derive(Clone, Default)]
pub struct EvaluatorSet {
    evaluators: BTreeMap<Backend, Arc<dyn Evaluator>>,
}

impl EvaluatorSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `evaluator` for `backend`. Only single-evaluator backends
    /// can be registered; `Both` and `Unspecified` are ignored.
    pub fn with(mut self, backend: Backend, evaluator: Arc<dyn Evaluator>) -> Self {
        if backend.is_single() {
            self.evaluators.insert(backend, evaluator);
        } else {
            tracing::warn!(backend = backend.as_str(), "ignoring evaluator registered for non-evaluator backend");
        }
        self
    }

    pub fn get(&self, backend: Backend) -> Option<&Arc<dyn Evaluator>> {
        self.evaluators.get(&backend)
    }

    pub fn is_configured(&self, backend: Backend) -> bool {
        self.evaluators.contains_key(&backend)
    }

    pub fn backends(&self) -> impl Iterator<Item = Backend> + '_ {
        self.evaluators.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.evaluators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.evaluators.is_empty()
    }
}

impl fmt::Debug for EvaluatorSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(
                self.evaluators
                    .iter()
                    .map(|(backend, ev)| (backend.as_str(), ev.name())),
            )
            .finish()
    }
}
