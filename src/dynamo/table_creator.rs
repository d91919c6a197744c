//! Table Provisioning
//!
//! Creates the backing table for a cache and enables TTL on it.

use std::sync::Arc;
use std::thread::sleep;
use std::time::Duration;

use tracing::{info, warn};

use super::{BillingMode, StoreError, TableAdmin, TableStatus};
use crate::error::Result;

/// Default primary-key attribute name
pub const DEFAULT_PRIMARY_FIELD: &str = "id";
/// Default TTL attribute name
pub const DEFAULT_TTL_FIELD: &str = "ttl";
/// Default value attribute name
pub const DEFAULT_VALUE_FIELD: &str = "value";

// == Table Config ==
/// Table name and attribute layout shared by the cache and provisioning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableConfig {
    pub table_name: String,
    pub primary_field: String,
    pub ttl_field: String,
    pub value_field: String,
}

impl TableConfig {
    /// Creates a config for `table_name` with the default attribute names.
    pub fn new(table_name: impl Into<String>) -> Self {
        Self {
            table_name: table_name.into(),
            primary_field: DEFAULT_PRIMARY_FIELD.to_string(),
            ttl_field: DEFAULT_TTL_FIELD.to_string(),
            value_field: DEFAULT_VALUE_FIELD.to_string(),
        }
    }
}

// == Table Creator ==
/// Provisions the table described by a [`TableConfig`].
pub struct TableCreator {
    admin: Arc<dyn TableAdmin>,
    config: TableConfig,
    poll_interval: Duration,
    max_polls: usize,
}

impl TableCreator {
    pub fn new(admin: Arc<dyn TableAdmin>, config: TableConfig) -> Self {
        Self {
            admin,
            config,
            poll_interval: Duration::from_millis(2),
            max_polls: 5_000,
        }
    }

    /// Overrides how often and how long `create` waits for activation.
    pub fn with_polling(mut self, interval: Duration, max_polls: usize) -> Self {
        self.poll_interval = interval;
        self.max_polls = max_polls;
        self
    }

    pub fn config(&self) -> &TableConfig {
        &self.config
    }

    // == Exists ==
    /// Returns whether the table exists.
    pub fn exists(&self) -> Result<bool> {
        match self.admin.describe_table(&self.config.table_name) {
            Ok(_) => Ok(true),
            Err(StoreError::ResourceNotFound(_)) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    // == Create ==
    /// Creates the table, waits for it to become active, then enables TTL.
    ///
    /// Requests rejected by the store (including an already existing
    /// table) and activation timeouts yield `Ok(false)`.
    pub fn create(&self, mode: BillingMode) -> Result<bool> {
        let table = &self.config.table_name;

        match self.try_create(mode) {
            Ok(created) => Ok(created),
            Err(StoreError::Network(msg)) => Err(StoreError::Network(msg).into()),
            Err(e) => {
                warn!("Could not create table '{}': {}", table, e);
                Ok(false)
            }
        }
    }

    /// Creates the table unless it already exists.
    pub fn create_if_not_exists(&self, mode: BillingMode) -> Result<bool> {
        if self.exists()? {
            return Ok(true);
        }
        self.create(mode)
    }

    fn try_create(&self, mode: BillingMode) -> std::result::Result<bool, StoreError> {
        let table = &self.config.table_name;
        self.admin
            .create_table(table, &self.config.primary_field, mode)?;

        let mut polls = 0;
        while !self.is_active()? {
            polls += 1;
            if polls >= self.max_polls {
                warn!("Table '{}' did not become active after {} polls", table, polls);
                return Ok(false);
            }
            sleep(self.poll_interval);
        }

        self.admin
            .update_time_to_live(table, &self.config.ttl_field, true)?;
        info!(
            "Created table '{}' (key '{}', ttl '{}')",
            table, self.config.primary_field, self.config.ttl_field
        );
        Ok(true)
    }

    fn is_active(&self) -> std::result::Result<bool, StoreError> {
        match self.admin.describe_table(&self.config.table_name) {
            Ok(description) => Ok(description.status == TableStatus::Active),
            Err(StoreError::ResourceNotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::dynamo::InMemoryStore;

    fn creator(store: &Arc<InMemoryStore>) -> TableCreator {
        let mut config = TableConfig::new("cache");
        config.ttl_field = "expires".to_string();
        TableCreator::new(store.clone(), config)
            .with_polling(Duration::from_millis(1), 10)
    }

    #[test]
    fn test_table_config_defaults() {
        let config = TableConfig::new("cache");
        assert_eq!(config.primary_field, "id");
        assert_eq!(config.ttl_field, "ttl");
        assert_eq!(config.value_field, "value");
    }

    #[test]
    fn test_exists() {
        let store = Arc::new(InMemoryStore::new());
        let creator = creator(&store);
        assert!(!creator.exists().unwrap());

        store
            .create_table("cache", "id", BillingMode::PayPerRequest)
            .unwrap();
        assert!(creator.exists().unwrap());
    }

    #[test]
    fn test_create_waits_and_enables_ttl() {
        let store = Arc::new(InMemoryStore::new());
        store.set_activation_delay(3);

        assert!(creator(&store).create(BillingMode::Provisioned).unwrap());

        let description = store.describe_table("cache").unwrap();
        assert_eq!(description.status, TableStatus::Active);
        assert_eq!(description.hash_key, "id");
        assert_eq!(description.billing_mode, BillingMode::Provisioned);
        assert_eq!(description.ttl_attribute.as_deref(), Some("expires"));
    }

    #[test]
    fn test_create_existing_table_reports_false() {
        let store = Arc::new(InMemoryStore::with_table("cache", "id"));
        assert!(!creator(&store).create(BillingMode::PayPerRequest).unwrap());
    }

    #[test]
    fn test_create_times_out() {
        let store = Arc::new(InMemoryStore::new());
        store.set_activation_delay(100);
        assert!(!creator(&store).create(BillingMode::PayPerRequest).unwrap());
    }

    #[test]
    fn test_create_if_not_exists() {
        let store = Arc::new(InMemoryStore::new());
        let creator = creator(&store);

        assert!(creator.create_if_not_exists(BillingMode::PayPerRequest).unwrap());
        assert!(creator.create_if_not_exists(BillingMode::PayPerRequest).unwrap());
        assert!(creator.exists().unwrap());
    }
}
