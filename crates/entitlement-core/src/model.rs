//! Request/response types shared by the router, comparator, batch executor and
//! benchmark harness.
//!
//! Every value here is created per call and dropped once the response has been
//! handed back; nothing in this module is shared process state.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Context key carrying the backend-selection hint.
pub const BACKEND_HINT_KEY: &str = "implementation";

/// Identifies which evaluator produced (or should produce) a decision.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub enum Backend {
    /// Producer unknown. Never selected by a hint.
    #[default]
    #[serde(rename = "unspecified")]
    Unspecified,
    /// Relationship-graph engine (SpiceDB-style).
    #[serde(rename = "spicedb", alias = "relationship")]
    Relationship,
    /// Property-graph engine (Neo4j-style).
    #[serde(rename = "neo4j", alias = "property_graph")]
    PropertyGraph,
    /// Relational-query engine behind a GraphQL endpoint.
    #[serde(rename = "graphql", alias = "relational")]
    Relational,
    /// Dual check through the comparator.
    #[serde(rename = "both", alias = "dual")]
    Both,
}

impl Backend {
    /// Backend used when a request carries no hint, or one we don't recognize.
    pub const DEFAULT: Backend = Backend::Relationship;

    /// Parse a hint string. Returns `None` for anything unrecognized so callers
    /// can decide on the fallback.
    pub fn from_hint(hint: &str) -> Option<Self> {
        match hint.trim().to_ascii_lowercase().as_str() {
            "spicedb" | "relationship" | "a" => Some(Self::Relationship),
            "neo4j" | "property_graph" | "b" => Some(Self::PropertyGraph),
            "graphql" | "relational" | "c" => Some(Self::Relational),
            "both" | "dual" => Some(Self::Both),
            _ => None,
        }
    }

    /// Wire identifier, also the hint value that selects this backend.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unspecified => "unspecified",
            Self::Relationship => "spicedb",
            Self::PropertyGraph => "neo4j",
            Self::Relational => "graphql",
            Self::Both => "both",
        }
    }

    /// Human-facing name used in diagnostic messages.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Unspecified => "Unspecified",
            Self::Relationship => "SpiceDB",
            Self::PropertyGraph => "Neo4j",
            Self::Relational => "GraphQL",
            Self::Both => "Both",
        }
    }

    /// True for backends that map to exactly one evaluator.
    pub fn is_single(&self) -> bool {
        matches!(
            self,
            Self::Relationship | Self::PropertyGraph | Self::Relational
        )
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Tri-state strength of a decision. Kept separate from the boolean so a caveat
/// that could not be evaluated is not mistaken for a plain denial.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permissionship {
    #[default]
    Unspecified,
    Denied,
    Granted,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionRequest {
    pub actor: String,
    pub resource: String,
    pub permission: String,
    /// Dynamic parameters (amount, as-of time) plus the backend hint.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub context: BTreeMap<String, String>,
}

impl PermissionRequest {
    pub fn new(
        actor: impl Into<String>,
        resource: impl Into<String>,
        permission: impl Into<String>,
    ) -> Self {
        Self {
            actor: actor.into(),
            resource: resource.into(),
            permission: permission.into(),
            context: BTreeMap::new(),
        }
    }

    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    /// Returns a copy that routes to `backend`, replacing any existing hint.
    pub fn with_backend_hint(self, backend: Backend) -> Self {
        self.with_context(BACKEND_HINT_KEY, backend.as_str())
    }

    /// Backend selected by the context hint. Absent or unrecognized hints fall
    /// back to [`Backend::DEFAULT`]; they never error.
    pub fn backend_hint(&self) -> Backend {
        self.context
            .get(BACKEND_HINT_KEY)
            .and_then(|hint| Backend::from_hint(hint))
            .unwrap_or(Backend::DEFAULT)
    }
}

/// Exactly one of these is produced per [`PermissionRequest`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PermissionResponse {
    pub allowed: bool,
    #[serde(default)]
    pub permissionship: Permissionship,
    #[serde(default)]
    pub backend: Backend,
    #[serde(default)]
    pub elapsed_ms: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl PermissionResponse {
    /// A definite decision from an evaluator.
    pub fn decided(allowed: bool) -> Self {
        Self {
            allowed,
            permissionship: if allowed {
                Permissionship::Granted
            } else {
                Permissionship::Denied
            },
            backend: Backend::Unspecified,
            elapsed_ms: 0.0,
            message: None,
        }
    }

    /// Negative response carrying a diagnostic instead of a decision.
    pub fn failure(backend: Backend, message: impl Into<String>) -> Self {
        Self {
            allowed: false,
            permissionship: Permissionship::Unspecified,
            backend,
            elapsed_ms: 0.0,
            message: Some(message.into()),
        }
    }

    /// Synthesized when the selected evaluator was never configured.
    pub fn unavailable(backend: Backend) -> Self {
        Self::failure(
            backend,
            format!(
                "{} backend not available - add a `{}` entry under `backends` in the service configuration",
                backend.label(),
                backend.as_str()
            ),
        )
    }

    pub fn with_backend(mut self, backend: Backend) -> Self {
        self.backend = backend;
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_permissionship(mut self, permissionship: Permissionship) -> Self {
        self.permissionship = permissionship;
        self
    }

    pub fn with_elapsed_ms(mut self, elapsed_ms: f64) -> Self {
        self.elapsed_ms = elapsed_ms;
        self
    }
}

/// Ordered requests plus a concurrency ceiling (`<= 0` means unlimited).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchJob {
    pub requests: Vec<PermissionRequest>,
    #[serde(default)]
    pub max_concurrency: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchOutcome {
    /// Positionally aligned with the submitted requests.
    pub responses: Vec<PermissionResponse>,
    pub success_count: usize,
    pub error_count: usize,
    pub total_time_ms: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkCase {
    pub name: String,
    #[serde(flatten)]
    pub request: PermissionRequest,
    /// Decision every iteration is expected to return.
    pub expected: bool,
}

/// Input to the benchmark harness.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkPlan {
    pub cases: Vec<BenchmarkCase>,
    pub iterations: i32,
    /// `<= 0` runs iterations sequentially.
    #[serde(default)]
    pub concurrency: i32,
    /// Overrides the hint carried by each case, when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backend: Option<Backend>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LatencyStats {
    pub min_ms: f64,
    pub avg_ms: f64,
    pub max_ms: f64,
    pub p95_ms: f64,
    pub p99_ms: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkResult {
    pub name: String,
    /// True when no iteration mismatched the expected decision.
    pub success: bool,
    pub total_requests: u32,
    pub successful_requests: u32,
    pub failed_requests: u32,
    pub latency: LatencyStats,
    pub backend: Backend,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkSummary {
    pub total_requests: u32,
    pub total_time_ms: f64,
    pub avg_response_time_ms: f64,
    pub throughput_rps: f64,
    pub backend: Backend,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkReport {
    pub results: Vec<BenchmarkResult>,
    pub summary: BenchmarkSummary,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub healthy: bool,
    pub backend: Backend,
    pub status_message: String,
}
