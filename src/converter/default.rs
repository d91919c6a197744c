//! Catch-all converter.

use std::borrow::Cow;
use std::sync::Arc;

use super::CacheItemConverter;
use crate::cache::{CacheItem, Clock, PoolItem};
use crate::encoder::ItemEncoder;
use crate::error::Result;

/// Accepts every item.
///
/// Native items pass through untouched. Other items are rebuilt from their
/// key, hit flag and value; their expiry cannot be read through
/// [`PoolItem`] and is dropped.
pub struct DefaultCacheItemConverter<V> {
    encoder: Arc<dyn ItemEncoder<V>>,
    clock: Arc<dyn Clock>,
}

impl<V> DefaultCacheItemConverter<V> {
    pub fn new(encoder: Arc<dyn ItemEncoder<V>>, clock: Arc<dyn Clock>) -> Self {
        Self { encoder, clock }
    }
}

impl<V: 'static> CacheItemConverter<V> for DefaultCacheItemConverter<V> {
    fn supports(&self, _item: &dyn PoolItem<V>) -> bool {
        true
    }

    fn convert<'a>(&self, item: &'a dyn PoolItem<V>) -> Result<Cow<'a, CacheItem<V>>> {
        if let Some(native) = item.as_any().downcast_ref::<CacheItem<V>>() {
            return Ok(Cow::Borrowed(native));
        }

        let mut converted = CacheItem::from_parts(
            item.key().to_string(),
            item.is_hit(),
            None,
            None,
            self.clock.clone(),
            self.encoder.clone(),
        );
        if let Some(value) = item.get()? {
            converted.set(value)?;
        }

        Ok(Cow::Owned(converted))
    }

    fn is_default(&self) -> bool {
        true
    }
}
