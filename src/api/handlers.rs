//! API Handlers
//!
//! HTTP request handlers for each cache server endpoint.

use std::sync::Arc;
use tokio::sync::RwLock;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::Value;

use crate::cache::{DynamoDbCache, Ttl};
use crate::config::{Config, EncoderKind};
use crate::dynamo::{BillingMode, InMemoryStore, TableConfig, TableCreator};
use crate::encoder::{Base64ItemEncoder, JsonItemEncoder};
use crate::error::{CacheError, Result};
use crate::models::{
    BatchResponse, DeleteResponse, ErrorResponse, GetMultipleRequest, GetResponse, HasResponse,
    HealthResponse, KeysRequest, SetMultipleRequest, SetRequest, SetResponse, ValuesResponse,
};

/// Application state shared across all handlers.
///
/// The cache sits behind a `RwLock`: reads and immediate writes share the
/// lock, `set-multiple` takes it exclusively for its deferred queue.
#[derive(Clone)]
pub struct AppState {
    /// Cache over JSON values
    pub cache: Arc<RwLock<DynamoDbCache<Value>>>,
    /// Table store backing the cache
    pub store: Arc<InMemoryStore>,
}

impl AppState {
    /// Creates a new AppState with the given cache and its store.
    pub fn new(cache: DynamoDbCache<Value>, store: Arc<InMemoryStore>) -> Self {
        Self {
            cache: Arc::new(RwLock::new(cache)),
            store,
        }
    }

    /// Creates a new AppState from configuration.
    ///
    /// Provisions the table in a fresh in-memory store, then builds the
    /// cache with the configured layout, prefix, encoder and error mode.
    pub fn from_config(config: &Config) -> Result<Self> {
        let store = Arc::new(InMemoryStore::new());
        let table = TableConfig {
            table_name: config.table_name.clone(),
            primary_field: config.primary_field.clone(),
            ttl_field: config.ttl_field.clone(),
            value_field: config.value_field.clone(),
        };

        let creator = TableCreator::new(store.clone(), table.clone());
        if !creator.create_if_not_exists(BillingMode::PayPerRequest)? {
            return Err(CacheError::Internal(format!(
                "Could not provision table '{}'",
                table.table_name
            )));
        }

        let mut builder = DynamoDbCache::<Value>::builder(table.table_name.clone(), store.clone())
            .with_table_config(table)
            .with_network_error_mode(config.network_error_mode);
        if let Some(prefix) = &config.key_prefix {
            builder = builder.with_prefix(prefix.clone());
        }
        builder = match config.encoder {
            EncoderKind::Json => builder.with_encoder(JsonItemEncoder::new()),
            EncoderKind::Base64 => {
                builder.with_encoder(Base64ItemEncoder::new(JsonItemEncoder::new()))
            }
        };

        Ok(Self::new(builder.build()?, store))
    }
}

/// Handler for PUT /set
///
/// Stores a value under a key with an optional TTL in seconds.
pub async fn set_handler(
    State(state): State<AppState>,
    Json(req): Json<SetRequest>,
) -> Result<Json<SetResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(CacheError::InvalidArgument(error_msg));
    }

    let cache = state.cache.read().await;
    let saved = cache.set(&req.key, req.value, req.ttl.map(Ttl::Seconds))?;

    Ok(Json(SetResponse::new(req.key, saved)))
}

/// Handler for GET /get/:key
///
/// Returns the value for a hit, 404 otherwise.
pub async fn get_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Response> {
    let cache = state.cache.read().await;

    match cache.get(&key)? {
        Some(value) => Ok(Json(GetResponse::new(key, value)).into_response()),
        None => Ok((
            StatusCode::NOT_FOUND,
            Json(ErrorResponse::new(format!("Key '{}' not found", key))),
        )
            .into_response()),
    }
}

/// Handler for GET /has/:key
pub async fn has_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<HasResponse>> {
    let cache = state.cache.read().await;
    let exists = cache.has(&key)?;

    Ok(Json(HasResponse { key, exists }))
}

/// Handler for DELETE /del/:key
pub async fn delete_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<DeleteResponse>> {
    let cache = state.cache.read().await;
    let deleted = cache.delete(&key)?;

    Ok(Json(DeleteResponse::new(key, deleted)))
}

/// Handler for POST /get-multiple
pub async fn get_multiple_handler(
    State(state): State<AppState>,
    Json(req): Json<GetMultipleRequest>,
) -> Result<Json<ValuesResponse>> {
    let cache = state.cache.read().await;
    let values = cache.get_multiple(&req.keys, req.default)?;

    Ok(Json(ValuesResponse { values }))
}

/// Handler for PUT /set-multiple
pub async fn set_multiple_handler(
    State(state): State<AppState>,
    Json(req): Json<SetMultipleRequest>,
) -> Result<Json<BatchResponse>> {
    if req.values.keys().any(String::is_empty) {
        return Err(CacheError::InvalidArgument("Key cannot be empty".to_string()));
    }

    // Deferred saves need exclusive access to the queue
    let mut cache = state.cache.write().await;
    let success = cache.set_multiple(req.values, req.ttl.map(Ttl::Seconds))?;

    Ok(Json(BatchResponse { success }))
}

/// Handler for POST /delete-multiple
pub async fn delete_multiple_handler(
    State(state): State<AppState>,
    Json(req): Json<KeysRequest>,
) -> Result<Json<BatchResponse>> {
    let cache = state.cache.read().await;
    let success = cache.delete_multiple(&req.keys)?;

    Ok(Json(BatchResponse { success }))
}

/// Handler for POST /clear
///
/// Removes every record under the configured prefix (the whole table
/// without one).
pub async fn clear_handler(State(state): State<AppState>) -> Result<Json<BatchResponse>> {
    let cache = state.cache.read().await;
    let success = cache.clear()?;

    Ok(Json(BatchResponse { success }))
}

/// Handler for GET /health
///
/// Returns health status of the server.
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}
