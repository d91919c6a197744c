//! API Module
//!
//! HTTP handlers and routing for the cache server REST API.
//!
//! # Endpoints
//! - `PUT /set` - Store a value under a key
//! - `GET /get/:key` - Retrieve a value by key
//! - `GET /has/:key` - Check whether a key is a hit
//! - `DELETE /del/:key` - Delete a key
//! - `POST /get-multiple`, `PUT /set-multiple`, `POST /delete-multiple` - Batch operations
//! - `POST /clear` - Remove every record under the prefix
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
