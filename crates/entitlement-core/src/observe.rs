//! Observability sink for comparison and availability events.
//!
//! Sinks are called inline on the request path, so `record` must return
//! promptly and must never fail the call it observes.

use crate::model::Backend;
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Observation {
    /// Both sides of a dual check returned the same decision.
    Match {
        actor: String,
        resource: String,
        permission: String,
        primary: Backend,
        secondary: Backend,
        allowed: bool,
    },
    /// Both sides answered but disagreed. Recorded for audit; never an error.
    Mismatch {
        actor: String,
        resource: String,
        permission: String,
        primary: Backend,
        primary_allowed: bool,
        secondary: Backend,
        secondary_allowed: bool,
    },
    /// A request selected a backend that was never configured.
    BackendUnavailable { backend: Backend },
    /// One side of a dual check failed and was skipped.
    SideFailed { backend: Backend, error: String },
}

pub trait ObservationSink: Send + Sync {
    fn record(&self, observation: &Observation);
}

pub type SharedSink = Arc<dyn ObservationSink>;

/// Emits observations as `tracing` events.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl ObservationSink for TracingSink {
    fn record(&self, observation: &Observation) {
        match observation {
            Observation::Match {
                actor,
                resource,
                permission,
                primary,
                secondary,
                allowed,
            } => tracing::debug!(
                event = "match",
                %actor,
                %resource,
                %permission,
                primary = primary.as_str(),
                secondary = secondary.as_str(),
                allowed = *allowed,
                "both backends agree"
            ),
            Observation::Mismatch {
                actor,
                resource,
                permission,
                primary,
                primary_allowed,
                secondary,
                secondary_allowed,
            } => tracing::warn!(
                event = "mismatch",
                %actor,
                %resource,
                %permission,
                primary = primary.as_str(),
                primary_allowed = *primary_allowed,
                secondary = secondary.as_str(),
                secondary_allowed = *secondary_allowed,
                "backends disagree"
            ),
            Observation::BackendUnavailable { backend } => tracing::warn!(
                event = "backend_unavailable",
                backend = backend.as_str(),
                "selected backend is not configured"
            ),
            Observation::SideFailed { backend, error } => tracing::warn!(
                event = "side_failed",
                backend = backend.as_str(),
                %error,
                "dual check continuing with one backend"
            ),
        }
    }
}

/// Discards every observation.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl ObservationSink for NoopSink {
    fn record(&self, _observation: &Observation) {}
}
