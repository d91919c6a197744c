//! Cache construction.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::cache::keys::validate_key;
use crate::cache::{Clock, DynamoDbCache, NetworkErrorMode, SystemClock, MAX_KEY_LENGTH};
use crate::converter::ConverterRegistry;
use crate::dynamo::{StoreClient, TableConfig};
use crate::encoder::{ItemEncoder, SerializeItemEncoder};
use crate::error::{CacheError, Result};

// == Builder ==
/// Configures a [`DynamoDbCache`].
///
/// Unset collaborators default to the system clock, the bincode encoder
/// and a registry holding only the default converter.
pub struct DynamoDbCacheBuilder<V> {
    client: Arc<dyn StoreClient>,
    table: TableConfig,
    prefix: Option<String>,
    network_error_mode: NetworkErrorMode,
    clock: Option<Arc<dyn Clock>>,
    encoder: Option<Arc<dyn ItemEncoder<V>>>,
    converter: Option<ConverterRegistry<V>>,
}

impl<V: 'static> DynamoDbCacheBuilder<V> {
    pub fn new(table_name: impl Into<String>, client: Arc<dyn StoreClient>) -> Self {
        Self {
            client,
            table: TableConfig::new(table_name),
            prefix: None,
            network_error_mode: NetworkErrorMode::default(),
            clock: None,
            encoder: None,
            converter: None,
        }
    }

    /// Replaces the whole table layout, table name included.
    pub fn with_table_config(mut self, table: TableConfig) -> Self {
        self.table = table;
        self
    }

    pub fn with_primary_field(mut self, field: impl Into<String>) -> Self {
        self.table.primary_field = field.into();
        self
    }

    pub fn with_ttl_field(mut self, field: impl Into<String>) -> Self {
        self.table.ttl_field = field.into();
        self
    }

    pub fn with_value_field(mut self, field: impl Into<String>) -> Self {
        self.table.value_field = field.into();
        self
    }

    /// Namespaces every key; `clear` then only removes prefixed records.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    pub fn with_network_error_mode(mut self, mode: NetworkErrorMode) -> Self {
        self.network_error_mode = mode;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn with_encoder(mut self, encoder: impl ItemEncoder<V> + 'static) -> Self {
        self.encoder = Some(Arc::new(encoder));
        self
    }

    /// Uses a custom converter registry; it should share the cache's
    /// encoder and clock.
    pub fn with_converter_registry(mut self, registry: ConverterRegistry<V>) -> Self {
        self.converter = Some(registry);
        self
    }
}

impl<V> DynamoDbCacheBuilder<V>
where
    V: Serialize + DeserializeOwned + 'static,
{
    // == Build ==
    /// Validates the prefix and assembles the cache.
    pub fn build(self) -> Result<DynamoDbCache<V>> {
        if let Some(prefix) = &self.prefix {
            if prefix.len() >= MAX_KEY_LENGTH {
                return Err(CacheError::InvalidArgument(format!(
                    "The prefix cannot be longer or equal to the maximum length: {MAX_KEY_LENGTH} bytes"
                )));
            }
            validate_key(prefix)?;
        }

        let clock: Arc<dyn Clock> = match self.clock {
            Some(clock) => clock,
            None => Arc::new(SystemClock),
        };
        let encoder: Arc<dyn ItemEncoder<V>> = match self.encoder {
            Some(encoder) => encoder,
            None => Arc::new(SerializeItemEncoder::new()),
        };
        let converter = match self.converter {
            Some(converter) => converter,
            None => ConverterRegistry::with_defaults(encoder.clone(), clock.clone()),
        };

        Ok(DynamoDbCache::new(
            self.client,
            self.table,
            self.prefix,
            self.network_error_mode,
            clock,
            converter,
            encoder,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dynamo::InMemoryStore;

    fn store() -> Arc<InMemoryStore> {
        Arc::new(InMemoryStore::with_table("cache", "id"))
    }

    #[test]
    fn test_defaults() {
        let cache: DynamoDbCache<String> = DynamoDbCacheBuilder::new("cache", store())
            .build()
            .unwrap();

        assert_eq!(cache.table_config(), &TableConfig::new("cache"));
        assert_eq!(cache.prefix(), None);
        assert_eq!(cache.network_error_mode(), NetworkErrorMode::Warning);
    }

    #[test]
    fn test_custom_fields() {
        let cache: DynamoDbCache<String> = DynamoDbCacheBuilder::new("cache", store())
            .with_primary_field("pk")
            .with_ttl_field("expires")
            .with_value_field("data")
            .with_network_error_mode(NetworkErrorMode::Throw)
            .build()
            .unwrap();

        let table = cache.table_config();
        assert_eq!(table.primary_field, "pk");
        assert_eq!(table.ttl_field, "expires");
        assert_eq!(table.value_field, "data");
        assert_eq!(cache.network_error_mode(), NetworkErrorMode::Throw);
    }

    #[test]
    fn test_prefix_too_long() {
        let result = DynamoDbCacheBuilder::<String>::new("cache", store())
            .with_prefix("p".repeat(MAX_KEY_LENGTH))
            .build();
        assert!(matches!(result, Err(CacheError::InvalidArgument(_))));

        let result = DynamoDbCacheBuilder::<String>::new("cache", store())
            .with_prefix("p".repeat(MAX_KEY_LENGTH - 1))
            .build();
        assert!(result.is_ok());
    }

    #[test]
    fn test_prefix_with_reserved_character() {
        let result = DynamoDbCacheBuilder::<String>::new("cache", store())
            .with_prefix("app:")
            .build();
        assert!(matches!(result, Err(CacheError::InvalidArgument(_))));
    }
}
