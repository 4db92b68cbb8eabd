//! Dispatch layer in front of interchangeable permission evaluators.
//!
//! ```text
//! caller ─► Router ─┬─► Evaluator (spicedb | neo4j | graphql)
//!                   └─► Comparator ─► Evaluator ×2 (concurrently)
//! caller ─► BatchExecutor ─► Router ×N (bounded, order-preserving)
//! caller ─► BenchmarkHarness ─► Router ×M (same request, latency stats)
//! ```
//!
//! No component here surfaces a hard failure to its caller: unavailable
//! backends and evaluator errors become negative responses with a diagnostic.

pub mod batch;
pub mod bench;
pub mod compare;
pub mod config;
pub mod errors;
pub mod evaluator;
pub mod gate;
pub mod model;
pub mod observe;
pub mod router;
pub mod service;

pub use batch::BatchExecutor;
pub use bench::BenchmarkHarness;
pub use compare::{Comparator, ComparisonConfig, ReconcilePolicy};
pub use config::{BackendConfig, ServiceConfig};
pub use errors::EvaluatorError;
pub use evaluator::{Evaluator, EvaluatorSet, Grant, GraphQlEvaluator, StaticEvaluator};
pub use model::{
    Backend, BatchJob, BatchOutcome, BenchmarkCase, BenchmarkPlan, BenchmarkReport,
    BenchmarkResult, BenchmarkSummary, HealthStatus, LatencyStats, PermissionRequest,
    PermissionResponse, Permissionship, BACKEND_HINT_KEY,
};
pub use observe::{NoopSink, Observation, ObservationSink, SharedSink, TracingSink};
pub use router::{Routed, Router};
pub use service::EntitlementService;
