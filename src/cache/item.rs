//! Cache Item Module
//!
//! Defines the unit of cached data and the capability trait shared by any
//! item type the cache accepts.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use crate::cache::Clock;
use crate::encoder::ItemEncoder;
use crate::error::{CacheError, Result};

// == Ttl ==
/// A relative lifetime passed to `expires_after`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ttl {
    /// Whole seconds
    Seconds(i64),
    /// A chrono duration
    Duration(Duration),
    /// A std duration
    Std(std::time::Duration),
}

impl Ttl {
    fn to_duration(self) -> Result<Duration> {
        let duration = match self {
            Ttl::Seconds(seconds) if seconds < 0 => None,
            Ttl::Seconds(seconds) => Duration::try_seconds(seconds),
            Ttl::Duration(duration) if duration < Duration::zero() => None,
            Ttl::Duration(duration) => Some(duration),
            Ttl::Std(duration) => Duration::from_std(duration).ok(),
        };
        duration.ok_or_else(|| {
            CacheError::InvalidArgument(format!(
                "The TTL must be a non-negative, representable duration, got {self:?}"
            ))
        })
    }
}

impl From<i64> for Ttl {
    fn from(seconds: i64) -> Self {
        Ttl::Seconds(seconds)
    }
}

impl From<Duration> for Ttl {
    fn from(duration: Duration) -> Self {
        Ttl::Duration(duration)
    }
}

impl From<std::time::Duration> for Ttl {
    fn from(duration: std::time::Duration) -> Self {
        Ttl::Std(duration)
    }
}

// == Pool Item ==
/// Capability interface of anything that can be saved to the cache.
///
/// [`CacheItem`] is the native implementation; other types are normalized
/// by the converter registry before they are written.
pub trait PoolItem<V>: Any {
    fn key(&self) -> &str;

    /// Decoded value, `None` when there is nothing stored.
    fn get(&self) -> Result<Option<V>>;

    fn is_hit(&self) -> bool;

    fn set(&mut self, value: V) -> Result<()>;

    fn expires_at(&mut self, at: Option<DateTime<Utc>>);

    fn expires_after(&mut self, ttl: Option<Ttl>) -> Result<()>;

    fn as_any(&self) -> &dyn Any;
}

// == Cache Item ==
/// A cached value with its key, hit flag and optional absolute expiry.
pub struct CacheItem<V> {
    key: String,
    is_hit: bool,
    encoded: Option<Vec<u8>>,
    expires_at: Option<DateTime<Utc>>,
    clock: Arc<dyn Clock>,
    encoder: Arc<dyn ItemEncoder<V>>,
}

impl<V> CacheItem<V> {
    // == Constructor ==
    /// Creates an empty, non-hit item to be populated and saved.
    pub fn new(
        key: impl Into<String>,
        clock: Arc<dyn Clock>,
        encoder: Arc<dyn ItemEncoder<V>>,
    ) -> Self {
        Self::from_parts(key.into(), false, None, None, clock, encoder)
    }

    pub(crate) fn from_parts(
        key: String,
        is_hit: bool,
        encoded: Option<Vec<u8>>,
        expires_at: Option<DateTime<Utc>>,
        clock: Arc<dyn Clock>,
        encoder: Arc<dyn ItemEncoder<V>>,
    ) -> Self {
        Self {
            key,
            is_hit,
            encoded,
            expires_at,
            clock,
            encoder,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    // == Is Hit ==
    /// Whether the item was found and has not expired yet.
    ///
    /// A record may still exist in the table after its expiry because the
    /// store removes expired records lazily, so expiry is re-checked here
    /// against the clock on every call.
    pub fn is_hit(&self) -> bool {
        self.is_hit
            && match self.expires_at {
                Some(expires_at) => self.clock.now() < expires_at,
                None => true,
            }
    }

    pub fn get(&self) -> Result<Option<V>> {
        self.encoded
            .as_deref()
            .map(|raw| self.encoder.decode(raw))
            .transpose()
    }

    pub fn set(&mut self, value: V) -> Result<&mut Self> {
        self.encoded = Some(self.encoder.encode(&value)?);
        Ok(self)
    }

    // == Expiration ==
    /// Sets the absolute expiry; `None` means the item never expires.
    pub fn expires_at(&mut self, at: Option<DateTime<Utc>>) -> &mut Self {
        self.expires_at = at;
        self
    }

    /// Sets the expiry relative to the clock's current time; `None` clears it.
    pub fn expires_after(&mut self, ttl: Option<Ttl>) -> Result<&mut Self> {
        self.expires_at = match ttl {
            None => None,
            Some(ttl) => {
                let duration = ttl.to_duration()?;
                let expires_at = self
                    .clock
                    .now()
                    .checked_add_signed(duration)
                    .ok_or_else(|| {
                        CacheError::InvalidArgument(format!("The TTL {ttl:?} overflows the clock"))
                    })?;
                Some(expires_at)
            }
        };
        Ok(self)
    }

    pub fn expiration(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    /// Encoded payload as written to the store.
    pub fn raw(&self) -> Option<&[u8]> {
        self.encoded.as_deref()
    }
}

impl<V> Clone for CacheItem<V> {
    fn clone(&self) -> Self {
        Self {
            key: self.key.clone(),
            is_hit: self.is_hit,
            encoded: self.encoded.clone(),
            expires_at: self.expires_at,
            clock: Arc::clone(&self.clock),
            encoder: Arc::clone(&self.encoder),
        }
    }
}

impl<V> fmt::Debug for CacheItem<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheItem")
            .field("key", &self.key)
            .field("is_hit", &self.is_hit)
            .field("encoded_len", &self.encoded.as_ref().map(Vec::len))
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

impl<V: 'static> PoolItem<V> for CacheItem<V> {
    fn key(&self) -> &str {
        CacheItem::key(self)
    }

    fn get(&self) -> Result<Option<V>> {
        CacheItem::get(self)
    }

    fn is_hit(&self) -> bool {
        CacheItem::is_hit(self)
    }

    fn set(&mut self, value: V) -> Result<()> {
        CacheItem::set(self, value).map(|_| ())
    }

    fn expires_at(&mut self, at: Option<DateTime<Utc>>) {
        CacheItem::expires_at(self, at);
    }

    fn expires_after(&mut self, ttl: Option<Ttl>) -> Result<()> {
        CacheItem::expires_after(self, ttl).map(|_| ())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
