//! Service configuration: comparison pair, reconcile policy, per-call deadline
//! and the evaluators to build at startup.
//!
//! ```yaml
//! comparison:
//!   primary: spicedb
//!   secondary: neo4j
//!   policy: strict
//! call_timeout_ms: 2000
//! backends:
//!   spicedb:
//!     kind: static
//!     grants:
//!       - { actor: david, resource: acc123, permission: can_download_statement }
//!   graphql:
//!     kind: graphql
//!     endpoint: http://localhost:4000/
//! ```

use crate::compare::{ComparisonConfig, ReconcilePolicy};
use crate::evaluator::{graphql, EvaluatorSet, Grant, GraphQlEvaluator, StaticEvaluator};
use crate::model::Backend;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

pub const ENV_RECONCILE_POLICY: &str = "ENTITLEMENT_RECONCILE_POLICY";
pub const ENV_CALL_TIMEOUT_MS: &str = "ENTITLEMENT_CALL_TIMEOUT_MS";
pub const ENV_GRAPHQL_ENDPOINT: &str = "ENTITLEMENT_GRAPHQL_ENDPOINT";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case", deny_unknown_fields)]
pub enum BackendConfig {
    /// Fixed grant table evaluated in-process.
    Static {
        #[serde(default)]
        grants: Vec<Grant>,
        /// Every call fails with this message (simulates an outage).
        #[serde(default)]
        fail_with: Option<String>,
        #[serde(default)]
        latency_ms: u64,
    },
    /// GraphQL endpoint fronting the relational store.
    Graphql {
        endpoint: Url,
        #[serde(default = "default_graphql_timeout_ms")]
        timeout_ms: u64,
    },
}

fn default_graphql_timeout_ms() -> u64 {
    u64::try_from(graphql::DEFAULT_TIMEOUT.as_millis()).unwrap_or(u64::MAX)
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServiceConfig {
    pub comparison: ComparisonConfig,
    /// Per-call evaluator deadline. Unset means calls may wait indefinitely.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub call_timeout_ms: Option<u64>,
    pub backends: BTreeMap<Backend, BackendConfig>,
}

impl ServiceConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        Self::from_yaml_str(&raw).with_context(|| format!("invalid config {}", path.display()))
    }

    pub fn from_yaml_str(raw: &str) -> Result<Self> {
        let cfg: Self = serde_yaml::from_str(raw)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Applies `ENTITLEMENT_*` environment overrides on top of the file.
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(raw) = lookup(ENV_RECONCILE_POLICY) {
            self.comparison.policy = raw
                .parse::<ReconcilePolicy>()
                .map_err(anyhow::Error::msg)
                .with_context(|| format!("invalid {ENV_RECONCILE_POLICY}"))?;
        }
        if let Some(raw) = lookup(ENV_CALL_TIMEOUT_MS) {
            let ms: u64 = raw
                .trim()
                .parse()
                .with_context(|| format!("invalid {ENV_CALL_TIMEOUT_MS}: '{raw}'"))?;
            self.call_timeout_ms = (ms > 0).then_some(ms);
        }
        if let Some(raw) = lookup(ENV_GRAPHQL_ENDPOINT) {
            let endpoint = Url::parse(raw.trim())
                .with_context(|| format!("invalid {ENV_GRAPHQL_ENDPOINT}: '{raw}'"))?;
            let timeout_ms = match self.backends.get(&Backend::Relational) {
                Some(BackendConfig::Graphql { timeout_ms, .. }) => *timeout_ms,
                _ => default_graphql_timeout_ms(),
            };
            self.backends.insert(
                Backend::Relational,
                BackendConfig::Graphql {
                    endpoint,
                    timeout_ms,
                },
            );
        }
        self.validate()
    }

    pub fn validate(&self) -> Result<()> {
        let ComparisonConfig {
            primary, secondary, ..
        } = self.comparison;
        if !primary.is_single() || !secondary.is_single() {
            anyhow::bail!(
                "comparison backends must be spicedb, neo4j or graphql (got {} and {})",
                primary.as_str(),
                secondary.as_str()
            );
        }
        if primary == secondary {
            anyhow::bail!(
                "comparison primary and secondary must differ (both are {})",
                primary.as_str()
            );
        }
        if let Some(backend) = self.backends.keys().find(|b| !b.is_single()) {
            anyhow::bail!("'{}' cannot be configured as a backend", backend.as_str());
        }
        Ok(())
    }

    pub fn call_timeout(&self) -> Option<Duration> {
        self.call_timeout_ms.map(Duration::from_millis)
    }

    /// Builds one evaluator per configured backend.
    pub fn build_evaluators(&self) -> Result<EvaluatorSet> {
        let mut set = EvaluatorSet::new();
        for (backend, cfg) in &self.backends {
            set = match cfg {
                BackendConfig::Static {
                    grants,
                    fail_with,
                    latency_ms,
                } => {
                    let mut ev = StaticEvaluator::new().with_grants(grants.iter().cloned());
                    if let Some(message) = fail_with {
                        ev = ev.failing(message.clone());
                    }
                    if *latency_ms > 0 {
                        ev = ev.with_latency(Duration::from_millis(*latency_ms));
                    }
                    set.with(*backend, Arc::new(ev))
                }
                BackendConfig::Graphql {
                    endpoint,
                    timeout_ms,
                } => {
                    let ev = GraphQlEvaluator::new(
                        endpoint.clone(),
                        Duration::from_millis(*timeout_ms),
                    )
                    .with_context(|| format!("failed to build graphql client for {endpoint}"))?;
                    set.with(*backend, Arc::new(ev))
                }
            };
            tracing::debug!(backend = backend.as_str(), "configured evaluator");
        }
        Ok(set)
    }
}
