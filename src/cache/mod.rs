//! Cache Module
//!
//! Provides a key-value cache over a remote table with per-record TTL,
//! deferred writes and batched reads and deletes.

mod builder;
mod clock;
mod item;
mod keys;
mod network;
mod store;

#[cfg(test)]
mod property_tests;

// Re-export public types
pub use builder::DynamoDbCacheBuilder;
pub use clock::{Clock, FixedClock, SystemClock};
pub use item::{CacheItem, PoolItem, Ttl};
pub use keys::{compliant_key, validate_key};
pub use network::NetworkErrorMode;
pub use store::DynamoDbCache;

// == Public Constants ==
/// Maximum stored key length in bytes
pub const MAX_KEY_LENGTH: usize = 2048;

/// Characters that may not appear in a cache key
pub const RESERVED_CHARACTERS: &str = "{}()/\\@:";
