//! Dynamo Cache - a TTL-aware cache over a DynamoDB-style table
//!
//! Maps cache keys onto records of a key-value table, with per-record
//! expiry, deferred writes, batched reads and deletes, and pluggable value
//! encoders. Ships an in-memory table store and a small HTTP server.

pub mod api;
pub mod cache;
pub mod config;
pub mod converter;
pub mod dynamo;
pub mod encoder;
pub mod error;
pub mod models;
pub mod tasks;

pub use api::AppState;
pub use cache::{CacheItem, DynamoDbCache, DynamoDbCacheBuilder, NetworkErrorMode, PoolItem, Ttl};
pub use config::Config;
pub use error::{CacheError, Result};
pub use tasks::spawn_ttl_sweeper;
