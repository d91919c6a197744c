//! Converter Module
//!
//! Normalizes any [`PoolItem`] into the native [`CacheItem`] before it is
//! written to the store.

mod default;

use std::borrow::Cow;
use std::sync::Arc;

use tracing::debug;

use crate::cache::{CacheItem, Clock, PoolItem};
use crate::encoder::ItemEncoder;
use crate::error::{CacheError, Result};

pub use default::DefaultCacheItemConverter;

// == Converter ==
/// Strategy turning a foreign item into a [`CacheItem`].
pub trait CacheItemConverter<V>: Send + Sync {
    fn supports(&self, item: &dyn PoolItem<V>) -> bool;

    fn convert<'a>(&self, item: &'a dyn PoolItem<V>) -> Result<Cow<'a, CacheItem<V>>>;

    /// Marks the catch-all converter terminating every registry.
    fn is_default(&self) -> bool {
        false
    }
}

// == Converter Registry ==
/// Ordered chain of converters; the first one supporting an item wins.
///
/// Always holds exactly one default converter, appended last when none
/// was supplied.
pub struct ConverterRegistry<V> {
    converters: Vec<Box<dyn CacheItemConverter<V>>>,
}

impl<V: 'static> ConverterRegistry<V> {
    /// Builds a registry from `converters`, completing it with a default
    /// converter using `encoder` and `clock` when none is present.
    pub fn new(
        converters: Vec<Box<dyn CacheItemConverter<V>>>,
        encoder: Arc<dyn ItemEncoder<V>>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let mut seen_default = false;
        let mut chain = Vec::with_capacity(converters.len() + 1);
        for converter in converters {
            if converter.is_default() {
                if seen_default {
                    debug!("Dropping duplicate default cache item converter");
                    continue;
                }
                seen_default = true;
            }
            chain.push(converter);
        }

        if !seen_default {
            chain.push(Box::new(DefaultCacheItemConverter::new(encoder, clock)));
        }

        Self { converters: chain }
    }

    /// Registry holding only the default converter.
    pub fn with_defaults(encoder: Arc<dyn ItemEncoder<V>>, clock: Arc<dyn Clock>) -> Self {
        Self::new(Vec::new(), encoder, clock)
    }

    pub fn convert<'a>(&self, item: &'a dyn PoolItem<V>) -> Result<Cow<'a, CacheItem<V>>> {
        self.converters
            .iter()
            .find(|converter| converter.supports(item))
            .ok_or_else(|| CacheError::Internal("No suitable converter found".to_string()))?
            .convert(item)
    }

    pub fn len(&self) -> usize {
        self.converters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.converters.is_empty()
    }
}
