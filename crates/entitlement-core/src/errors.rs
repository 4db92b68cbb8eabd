//! Failure taxonomy for evaluator calls.
//!
//! None of these ever reach the caller of the router: they are folded into a
//! negative [`PermissionResponse`](crate::model::PermissionResponse) carrying the
//! error text as its diagnostic message.

use crate::model::Backend;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EvaluatorError {
    /// The selected evaluator was never configured.
    #[error("{backend} backend not available")]
    Unavailable { backend: Backend },

    /// The underlying system could not be reached.
    #[error("transport error: {message}")]
    Transport { message: String },

    /// The underlying system refused the query.
    #[error("query rejected: {message}")]
    Rejected { message: String },

    /// The underlying system answered with something we can't interpret.
    #[error("invalid response: {message}")]
    InvalidResponse { message: String },

    /// The per-call deadline elapsed before the evaluator answered.
    #[error("evaluation timed out after {after_ms}ms")]
    Timeout { after_ms: u64 },

    /// The evaluator task itself failed (panic, cancellation).
    #[error("internal error: {message}")]
    Internal { message: String },
}

impl EvaluatorError {
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self::Rejected {
            message: message.into(),
        }
    }

    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::InvalidResponse {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}
