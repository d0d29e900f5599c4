//! Error types for the cache cluster
//!
//! One enum covers every failure the cache path can report. The type is
//! `Clone` because a single in-flight load may have many waiters that all
//! receive the same outcome.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Unified error type for the cache cluster.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// Empty key or malformed peer request path.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// No namespace by that name on this node.
    #[error("no such group: {0}")]
    GroupUnknown(String),

    /// The origin getter failed. May be masked by negative caching.
    #[error("origin load failed for key {key}: {reason}")]
    OriginFailure { key: String, reason: String },

    /// Remote fetch timed out or failed at the transport. Recoverable by
    /// falling through to a local origin load.
    #[error("peer unavailable: {0}")]
    PeerUnavailable(String),

    /// A peer returned a value that had already expired. Treated like a
    /// fetch failure.
    #[error("peer returned expired value for key {0}")]
    StaleFromPeer(String),

    /// Any other non-recoverable condition.
    #[error("internal error: {0}")]
    Internal(String),
}

impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let status = match &self {
            CacheError::BadRequest(_) => StatusCode::BAD_REQUEST,
            CacheError::GroupUnknown(_) => StatusCode::NOT_FOUND,
            CacheError::OriginFailure { .. }
            | CacheError::PeerUnavailable(_)
            | CacheError::StaleFromPeer(_)
            | CacheError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}

/// Convenience Result type for the cache cluster.
pub type Result<T> = std::result::Result<T, CacheError>;
