//! API Routes
//!
//! Configures the Axum router with all cache server endpoints.

use axum::{
    routing::{delete, get, post, put},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    clear_handler, delete_handler, delete_multiple_handler, get_handler, get_multiple_handler,
    has_handler, health_handler, set_handler, set_multiple_handler, AppState,
};

/// Creates the main router with all endpoints configured.
///
/// # Endpoints
/// - `PUT /set` - Store a value under a key
/// - `GET /get/:key` - Retrieve a value by key
/// - `GET /has/:key` - Check whether a key is a hit
/// - `DELETE /del/:key` - Delete a key
/// - `POST /get-multiple` - Retrieve several keys
/// - `PUT /set-multiple` - Store several values with a shared TTL
/// - `POST /delete-multiple` - Delete several keys
/// - `POST /clear` - Remove every record under the prefix
/// - `GET /health` - Health check endpoint
///
/// # Middleware
/// - CORS: Allows any origin (configurable for production)
/// - Tracing: Logs all requests for debugging
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/set", put(set_handler))
        .route("/get/:key", get(get_handler))
        .route("/has/:key", get(has_handler))
        .route("/del/:key", delete(delete_handler))
        .route("/get-multiple", post(get_multiple_handler))
        .route("/set-multiple", put(set_multiple_handler))
        .route("/delete-multiple", post(delete_multiple_handler))
        .route("/clear", post(clear_handler))
        .route("/health", get(health_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
