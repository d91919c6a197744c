//! Cache Store Module
//!
//! Main cache engine mapping cache keys onto records of a remote table.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::cache::keys::{compliant_key, validate_key};
use crate::cache::{CacheItem, Clock, DynamoDbCacheBuilder, NetworkErrorMode, PoolItem, Ttl};
use crate::converter::ConverterRegistry;
use crate::dynamo::{
    string_key, AttributeValue, Item, ScanFilter, StoreClient, StoreError, TableConfig,
    WriteRequest, BATCH_GET_LIMIT, BATCH_WRITE_LIMIT,
};
use crate::encoder::ItemEncoder;
use crate::error::{CacheError, Result};

// == Dynamo DB Cache ==
/// Cache backed by a table with per-record TTL.
///
/// Reads take `&self`; operations touching the deferred queue take
/// `&mut self`. Share an instance across threads behind a lock.
pub struct DynamoDbCache<V> {
    client: Arc<dyn StoreClient>,
    table: TableConfig,
    prefix: Option<String>,
    network_error_mode: NetworkErrorMode,
    clock: Arc<dyn Clock>,
    converter: ConverterRegistry<V>,
    encoder: Arc<dyn ItemEncoder<V>>,
    /// Items queued by `save_deferred`, in insertion order
    deferred: Vec<CacheItem<V>>,
}

impl<V: 'static> DynamoDbCache<V> {
    // == Constructor ==
    /// Starts a builder for a cache over `table_name`.
    pub fn builder(
        table_name: impl Into<String>,
        client: Arc<dyn StoreClient>,
    ) -> DynamoDbCacheBuilder<V> {
        DynamoDbCacheBuilder::new(table_name, client)
    }

    pub(crate) fn new(
        client: Arc<dyn StoreClient>,
        table: TableConfig,
        prefix: Option<String>,
        network_error_mode: NetworkErrorMode,
        clock: Arc<dyn Clock>,
        converter: ConverterRegistry<V>,
        encoder: Arc<dyn ItemEncoder<V>>,
    ) -> Self {
        Self {
            client,
            table,
            prefix,
            network_error_mode,
            clock,
            converter,
            encoder,
            deferred: Vec::new(),
        }
    }

    // == Accessors ==
    /// Table layout, e.g. to hand to a [`crate::dynamo::TableCreator`].
    pub fn table_config(&self) -> &TableConfig {
        &self.table
    }

    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    pub fn network_error_mode(&self) -> NetworkErrorMode {
        self.network_error_mode
    }

    /// Number of items still waiting for a successful commit.
    pub fn deferred_len(&self) -> usize {
        self.deferred.len()
    }

    /// Creates an empty item for `key` bound to this cache's clock and encoder.
    pub fn new_item(&self, key: &str) -> Result<CacheItem<V>> {
        Ok(CacheItem::new(
            self.storage_key(key)?,
            self.clock.clone(),
            self.encoder.clone(),
        ))
    }

    // == Get Item ==
    /// Fetches the item stored under `key`; absent records yield a miss.
    pub fn get_item(&self, key: &str) -> Result<CacheItem<V>> {
        let key = self.storage_key(key)?;
        match self.fetch_record(&key)? {
            Some(record) => Ok(self.item_from_record(key, &record)),
            None => Ok(self.miss(key)),
        }
    }

    // == Get Items ==
    /// Fetches several keys, one item per distinct key, in request order.
    ///
    /// Keys the store does not return (absent or left unprocessed) come
    /// back as misses.
    pub fn get_items<I, K>(&self, keys: I) -> Result<Vec<CacheItem<V>>>
    where
        I: IntoIterator<Item = K>,
        K: AsRef<str>,
    {
        let keys = self.storage_keys(keys)?;
        let requested: HashSet<&str> = keys.iter().map(String::as_str).collect();
        let mut found: HashMap<String, CacheItem<V>> = HashMap::new();

        for chunk in keys.chunks(BATCH_GET_LIMIT) {
            let request = chunk.iter().map(|key| self.record_key(key)).collect();
            let output = match self.client.batch_get_item(&self.table.table_name, request) {
                Ok(output) => output,
                Err(error @ StoreError::Network(_)) => {
                    self.on_network_error(error)?;
                    continue;
                }
                Err(error) => return Err(error.into()),
            };

            if !output.unprocessed_keys.is_empty() {
                debug!(
                    "Batch get left {} keys unprocessed, reporting them as misses",
                    output.unprocessed_keys.len()
                );
            }

            for record in &output.items {
                let Some(key) = record
                    .get(&self.table.primary_field)
                    .and_then(AttributeValue::as_s)
                else {
                    continue;
                };
                if requested.contains(key) {
                    found.insert(key.to_string(), self.item_from_record(key.to_string(), record));
                }
            }
        }

        debug!(
            "Batch get: {} keys requested, {} records returned",
            keys.len(),
            found.len()
        );

        Ok(keys
            .into_iter()
            .map(|key| match found.remove(&key) {
                Some(item) => item,
                None => self.miss(key),
            })
            .collect())
    }

    // == Has Item ==
    pub fn has_item(&self, key: &str) -> Result<bool> {
        Ok(self.get_item(key)?.is_hit())
    }

    // == Clear ==
    /// Deletes every record of the table, or only those under the prefix.
    ///
    /// Returns `false` if the store left any delete unprocessed.
    pub fn clear(&self) -> Result<bool> {
        let filter = self.prefix.as_ref().map(|prefix| ScanFilter::BeginsWith {
            attribute: self.table.primary_field.clone(),
            prefix: prefix.clone(),
        });
        let records = self.client.scan(&self.table.table_name, filter.as_ref())?;
        let keys: Vec<&str> = records
            .iter()
            .filter_map(|record| {
                record
                    .get(&self.table.primary_field)
                    .and_then(AttributeValue::as_s)
            })
            .collect();

        let mut unprocessed = Vec::new();
        for chunk in keys.chunks(BATCH_WRITE_LIMIT) {
            let requests = chunk
                .iter()
                .map(|key| WriteRequest::Delete {
                    key: self.record_key(key),
                })
                .collect();
            let output = self
                .client
                .batch_write_item(&self.table.table_name, requests)?;
            unprocessed.extend(output.unprocessed);
        }

        if !unprocessed.is_empty() {
            warn!(
                "Clear left {} of {} deletes unprocessed",
                unprocessed.len(),
                keys.len()
            );
        }
        Ok(unprocessed.is_empty())
    }

    // == Delete Item ==
    /// Deletes `key`; returns `false` if nothing was stored under it.
    pub fn delete_item(&self, key: &str) -> Result<bool> {
        let key = self.storage_key(key)?;
        self.delete_stored(&key)
    }

    /// Deletes the record a previously fetched item was read from.
    pub fn delete_cache_item(&self, item: &CacheItem<V>) -> Result<bool> {
        validate_key(item.key())?;
        self.delete_stored(item.key())
    }

    // == Delete Items ==
    /// Deletes several keys with batched writes.
    ///
    /// Returns `false` if the store left any delete unprocessed.
    pub fn delete_items<I, K>(&self, keys: I) -> Result<bool>
    where
        I: IntoIterator<Item = K>,
        K: AsRef<str>,
    {
        let keys = self.storage_keys(keys)?;
        let mut success = true;

        for chunk in keys.chunks(BATCH_WRITE_LIMIT) {
            let requests = chunk
                .iter()
                .map(|key| WriteRequest::Delete {
                    key: self.record_key(key),
                })
                .collect();
            let output = self
                .client
                .batch_write_item(&self.table.table_name, requests)?;
            if !output.unprocessed.is_empty() {
                warn!(
                    "Batch delete left {} requests unprocessed",
                    output.unprocessed.len()
                );
                success = false;
            }
        }

        Ok(success)
    }

    // == Save ==
    /// Writes an item immediately.
    ///
    /// Store failures are logged and reported as `Ok(false)`; invalid keys
    /// are errors.
    pub fn save(&self, item: &dyn PoolItem<V>) -> Result<bool> {
        let item = self.converter.convert(item)?;
        self.persist(&item)
    }

    // == Save Deferred ==
    /// Queues an item for the next [`commit`](Self::commit).
    pub fn save_deferred(&mut self, item: &dyn PoolItem<V>) -> Result<bool> {
        validate_key(item.key())?;
        let item = self.converter.convert(item)?.into_owned();
        ensure_value(&item)?;
        self.deferred.push(item);
        Ok(true)
    }

    // == Commit ==
    /// Saves every queued item in insertion order.
    ///
    /// Items that saved are dropped from the queue; the others stay queued
    /// for the next commit. Returns `true` only if all of them saved.
    pub fn commit(&mut self) -> Result<bool> {
        let mut pending = std::mem::take(&mut self.deferred).into_iter();
        let mut residual = Vec::new();
        let mut result = true;

        while let Some(item) = pending.next() {
            match self.persist(&item) {
                Ok(true) => {}
                Ok(false) => {
                    result = false;
                    residual.push(item);
                }
                Err(error) => {
                    residual.push(item);
                    residual.extend(pending);
                    self.deferred = residual;
                    return Err(error);
                }
            }
        }

        if !residual.is_empty() {
            debug!("{} deferred items kept for the next commit", residual.len());
        }
        self.deferred = residual;
        Ok(result)
    }

    // == Simple Cache Contract ==
    /// Returns the value stored under `key`, `None` unless it is a hit.
    pub fn get(&self, key: &str) -> Result<Option<V>> {
        let item = self.get_item(key)?;
        if !item.is_hit() {
            return Ok(None);
        }
        item.get()
    }

    /// Returns the value stored under `key`, or `default` unless it is a hit.
    pub fn get_or(&self, key: &str, default: V) -> Result<V> {
        Ok(self.get(key)?.unwrap_or(default))
    }

    /// Stores `value` under `key`. A `None` TTL keeps the stored expiry.
    pub fn set(&self, key: &str, value: V, ttl: Option<Ttl>) -> Result<bool> {
        let mut item = self.get_item(key)?;
        if ttl.is_some() {
            item.expires_after(ttl)?;
        }
        item.set(value)?;
        self.save(&item)
    }

    pub fn delete(&self, key: &str) -> Result<bool> {
        self.delete_item(key)
    }

    pub fn has(&self, key: &str) -> Result<bool> {
        self.has_item(key)
    }

    /// Returns a value for every requested key, `default` for non-hits.
    pub fn get_multiple<I, K>(&self, keys: I, default: Option<V>) -> Result<HashMap<String, Option<V>>>
    where
        V: Clone,
        I: IntoIterator<Item = K>,
        K: AsRef<str>,
    {
        let keys: Vec<String> = keys.into_iter().map(|key| key.as_ref().to_string()).collect();
        let items: HashMap<String, CacheItem<V>> = self
            .get_items(&keys)?
            .into_iter()
            .map(|item| (item.key().to_string(), item))
            .collect();

        let mut values = HashMap::with_capacity(keys.len());
        for key in keys {
            let value = match items.get(&self.storage_key(&key)?) {
                Some(item) if item.is_hit() => item.get()?,
                _ => default.clone(),
            };
            values.insert(key, value);
        }
        Ok(values)
    }

    /// Stores every pair with a shared TTL through one deferred commit.
    pub fn set_multiple<I, K>(&mut self, values: I, ttl: Option<Ttl>) -> Result<bool>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
    {
        let values: Vec<(K, V)> = values.into_iter().collect();
        for (key, _) in &values {
            self.storage_key(key.as_ref())?;
        }

        for (key, value) in values {
            let mut item = self.get_item(key.as_ref())?;
            item.set(value)?;
            if ttl.is_some() {
                item.expires_after(ttl)?;
            }
            self.save_deferred(&item)?;
        }

        self.commit()
    }

    pub fn delete_multiple<I, K>(&self, keys: I) -> Result<bool>
    where
        I: IntoIterator<Item = K>,
        K: AsRef<str>,
    {
        self.delete_items(keys)
    }

    // == Internals ==
    /// Validates a caller key and maps it to the key stored in the table.
    fn storage_key(&self, key: &str) -> Result<String> {
        validate_key(key)?;
        let key = match &self.prefix {
            Some(prefix) => format!("{prefix}{key}"),
            None => key.to_string(),
        };
        validate_key(&key)?;
        Ok(compliant_key(&key))
    }

    /// Maps every key before any store call; duplicates are collapsed.
    fn storage_keys<I, K>(&self, keys: I) -> Result<Vec<String>>
    where
        I: IntoIterator<Item = K>,
        K: AsRef<str>,
    {
        let mut seen = HashSet::new();
        let mut mapped = Vec::new();
        for key in keys {
            let key = self.storage_key(key.as_ref())?;
            if seen.insert(key.clone()) {
                mapped.push(key);
            }
        }
        Ok(mapped)
    }

    fn record_key(&self, key: &str) -> Item {
        string_key(&self.table.primary_field, key)
    }

    fn miss(&self, key: String) -> CacheItem<V> {
        CacheItem::from_parts(key, false, None, None, self.clock.clone(), self.encoder.clone())
    }

    fn item_from_record(&self, key: String, record: &Item) -> CacheItem<V> {
        let Some(payload) = record.get(&self.table.value_field).and_then(payload_bytes) else {
            return self.miss(key);
        };
        let expires_at = record
            .get(&self.table.ttl_field)
            .and_then(AttributeValue::as_n)
            .map(parse_timestamp);

        CacheItem::from_parts(
            key,
            true,
            Some(payload),
            expires_at,
            self.clock.clone(),
            self.encoder.clone(),
        )
    }

    fn fetch_record(&self, key: &str) -> Result<Option<Item>> {
        match self.client.get_item(&self.table.table_name, self.record_key(key)) {
            Ok(record) => Ok(record),
            Err(error @ StoreError::Network(_)) => {
                self.on_network_error(error)?;
                Ok(None)
            }
            Err(error) => Err(error.into()),
        }
    }

    fn on_network_error(&self, error: StoreError) -> Result<()> {
        match self.network_error_mode {
            NetworkErrorMode::Ignore => {
                debug!("Ignoring network error: {}", error);
                Ok(())
            }
            NetworkErrorMode::Warning => {
                warn!("Network error when connecting to the table store: {}", error);
                Ok(())
            }
            NetworkErrorMode::Throw => Err(error.into()),
        }
    }

    fn delete_stored(&self, key: &str) -> Result<bool> {
        let stored = self
            .fetch_record(key)?
            .is_some_and(|record| record.contains_key(&self.table.value_field));
        if !stored {
            return Ok(false);
        }

        self.client
            .delete_item(&self.table.table_name, self.record_key(key))?;
        Ok(true)
    }

    fn persist(&self, item: &CacheItem<V>) -> Result<bool> {
        validate_key(item.key())?;
        let raw = ensure_value(item)?;
        let key = compliant_key(item.key());

        let mut record = self.record_key(&key);
        let value = match std::str::from_utf8(raw) {
            Ok(text) => AttributeValue::S(text.to_string()),
            Err(_) => AttributeValue::B(raw.to_vec()),
        };
        record.insert(self.table.value_field.clone(), value);
        if let Some(expires_at) = item.expiration() {
            record.insert(
                self.table.ttl_field.clone(),
                AttributeValue::N(expires_at.timestamp().to_string()),
            );
        }

        match self.client.put_item(&self.table.table_name, record) {
            Ok(()) => Ok(true),
            Err(error) => {
                warn!("Failed to save cache item '{}': {}", key, error);
                Ok(false)
            }
        }
    }
}

// == Utility Functions ==
/// Returns the encoded payload, rejecting items that were never given a value.
fn ensure_value<V>(item: &CacheItem<V>) -> Result<&[u8]> {
    item.raw().ok_or_else(|| {
        CacheError::InvalidArgument(format!(
            "The cache item '{}' has no value to save",
            item.key()
        ))
    })
}

fn payload_bytes(value: &AttributeValue) -> Option<Vec<u8>> {
    match value {
        AttributeValue::S(text) => Some(text.as_bytes().to_vec()),
        AttributeValue::B(bytes) => Some(bytes.clone()),
        AttributeValue::N(_) => None,
    }
}

/// Parses a Unix-seconds number attribute.
///
/// Unparseable numbers read as the epoch. Seconds outside the representable
/// range clamp to its bounds so a far-past expiry stays a miss.
fn parse_timestamp(number: &str) -> DateTime<Utc> {
    let seconds = number
        .trim()
        .parse::<i64>()
        .ok()
        .or_else(|| number.trim().parse::<f64>().ok().map(|f| f.trunc() as i64))
        .unwrap_or(0);
    DateTime::from_timestamp(seconds, 0).unwrap_or(if seconds < 0 {
        DateTime::<Utc>::MIN_UTC
    } else {
        DateTime::<Utc>::MAX_UTC
    })
}
