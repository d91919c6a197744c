//! Error types for the cache
//!
//! Provides unified error handling using thiserror.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::dynamo::StoreError;

// == Cache Error Enum ==
/// Unified error type for the cache.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Caller supplied a bad key, prefix, TTL or configuration value
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The value encoder could not represent or restore a value
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// The backing table store failed
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Broken internal invariant
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CacheError {
    /// Returns true if this wraps a transient network failure of the store.
    pub fn is_network(&self) -> bool {
        matches!(self, CacheError::Store(StoreError::Network(_)))
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let status = match &self {
            CacheError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            CacheError::Encoding(_) => StatusCode::UNPROCESSABLE_ENTITY,
            CacheError::Store(StoreError::Network(_)) => StatusCode::SERVICE_UNAVAILABLE,
            CacheError::Store(StoreError::Client(_)) => StatusCode::BAD_GATEWAY,
            CacheError::Store(StoreError::ResourceNotFound(_)) => StatusCode::NOT_FOUND,
            CacheError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the cache.
pub type Result<T> = std::result::Result<T, CacheError>;
