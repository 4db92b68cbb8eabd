use super::Evaluator;
use crate::errors::EvaluatorError;
use crate::model::{PermissionRequest, PermissionResponse};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;

/// One granted `(actor, resource, permission)` triple.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Grant {
    pub actor: String,
    pub resource: String,
    pub permission: String,
}

impl Grant {
    pub fn new(
        actor: impl Into<String>,
        resource: impl Into<String>,
        permission: impl Into<String>,
    ) -> Self {
        Self {
            actor: actor.into(),
            resource: resource.into(),
            permission: permission.into(),
        }
    }
}

/// In-process evaluator backed by a fixed grant table.
///
/// Stands in for a real backend in fixture mode and tests. `fail_with`
/// simulates an unreachable backend; `latency` delays every answer.
#[derive(Debug, Clone, Default)]
pub struct StaticEvaluator {
    grants: HashSet<Grant>,
    fail_with: Option<String>,
    latency: Option<Duration>,
}

impl StaticEvaluator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_grant(mut self, grant: Grant) -> Self {
        self.grants.insert(grant);
        self
    }

    pub fn with_grants(mut self, grants: impl IntoIterator<Item = Grant>) -> Self {
        self.grants.extend(grants);
        self
    }

    pub fn failing(mut self, message: impl Into<String>) -> Self {
        self.fail_with = Some(message.into());
        self
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    fn is_granted(&self, request: &PermissionRequest) -> bool {
        self.grants.contains(&Grant::new(
            request.actor.as_str(),
            request.resource.as_str(),
            request.permission.as_str(),
        ))
    }
}

#[async_trait]
impl Evaluator for StaticEvaluator {
    async fn evaluate(
        &self,
        request: &PermissionRequest,
    ) -> Result<PermissionResponse, EvaluatorError> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        if let Some(message) = &self.fail_with {
            return Err(EvaluatorError::transport(message.clone()));
        }
        Ok(PermissionResponse::decided(self.is_granted(request)))
    }

    fn name(&self) -> &'static str {
        "static"
    }
}
