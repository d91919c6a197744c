//! Table Store Module
//!
//! Narrow interfaces to the remote key-value table service the cache is
//! layered over, plus an in-memory implementation and table provisioning.

mod memory;
mod table_creator;

use std::collections::HashMap;

use thiserror::Error;

pub use memory::InMemoryStore;
pub use table_creator::{
    TableConfig, TableCreator, DEFAULT_PRIMARY_FIELD, DEFAULT_TTL_FIELD, DEFAULT_VALUE_FIELD,
};

// == Store Limits ==
/// Maximum number of keys accepted by one batch-get call
pub const BATCH_GET_LIMIT: usize = 100;

/// Maximum number of requests accepted by one batch-write call
pub const BATCH_WRITE_LIMIT: usize = 25;

// == Store Error ==
/// Failures reported by a table store client.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The store could not be reached (transient)
    #[error("Network error: {0}")]
    Network(String),

    /// The store rejected the request (throttling, malformed input, ...)
    #[error("Client error: {0}")]
    Client(String),

    /// The addressed table does not exist
    #[error("Resource not found: {0}")]
    ResourceNotFound(String),
}

// == Attribute Value ==
/// A typed attribute of a stored record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeValue {
    /// String attribute
    S(String),
    /// Number attribute, kept in its decimal string form
    N(String),
    /// Binary attribute
    B(Vec<u8>),
}

impl AttributeValue {
    pub fn as_s(&self) -> Option<&str> {
        match self {
            AttributeValue::S(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_n(&self) -> Option<&str> {
        match self {
            AttributeValue::N(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_b(&self) -> Option<&[u8]> {
        match self {
            AttributeValue::B(b) => Some(b),
            _ => None,
        }
    }
}

/// A stored record (or a key), keyed by attribute name.
pub type Item = HashMap<String, AttributeValue>;

/// Builds a single-attribute string key.
pub fn string_key(attribute: &str, value: impl Into<String>) -> Item {
    HashMap::from([(attribute.to_string(), AttributeValue::S(value.into()))])
}

// == Request / Response Shapes ==
/// One entry of a batch-write call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteRequest {
    Put { item: Item },
    Delete { key: Item },
}

/// Result of a batch-get call.
#[derive(Debug, Clone, Default)]
pub struct BatchGetOutput {
    /// Records that were found
    pub items: Vec<Item>,
    /// Keys the store did not get to; absent keys are simply not returned
    pub unprocessed_keys: Vec<Item>,
}

/// Result of a batch-write call.
#[derive(Debug, Clone, Default)]
pub struct BatchWriteOutput {
    /// Requests the store did not apply
    pub unprocessed: Vec<WriteRequest>,
}

/// Server-side filter applied to a scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanFilter {
    /// `begins_with(attribute, prefix)` on a string attribute
    BeginsWith { attribute: String, prefix: String },
}

impl ScanFilter {
    pub fn matches(&self, item: &Item) -> bool {
        match self {
            ScanFilter::BeginsWith { attribute, prefix } => item
                .get(attribute)
                .and_then(AttributeValue::as_s)
                .is_some_and(|value| value.starts_with(prefix.as_str())),
        }
    }
}

// == Store Client ==
/// Data-plane operations the cache engine consumes.
///
/// Implementations own transport concerns (retries, timeouts, paging).
/// Batch calls must reject more than [`BATCH_GET_LIMIT`] keys or
/// [`BATCH_WRITE_LIMIT`] requests the way the managed service does.
pub trait StoreClient: Send + Sync {
    /// Fetches one record by key, `None` if absent.
    fn get_item(&self, table: &str, key: Item) -> Result<Option<Item>, StoreError>;

    /// Fetches up to [`BATCH_GET_LIMIT`] records.
    fn batch_get_item(&self, table: &str, keys: Vec<Item>) -> Result<BatchGetOutput, StoreError>;

    /// Writes (inserts or replaces) one record.
    fn put_item(&self, table: &str, item: Item) -> Result<(), StoreError>;

    /// Deletes one record; deleting an absent key is not an error.
    fn delete_item(&self, table: &str, key: Item) -> Result<(), StoreError>;

    /// Applies up to [`BATCH_WRITE_LIMIT`] put/delete requests.
    fn batch_write_item(
        &self,
        table: &str,
        requests: Vec<WriteRequest>,
    ) -> Result<BatchWriteOutput, StoreError>;

    /// Returns every record of the table matching the optional filter.
    fn scan(&self, table: &str, filter: Option<&ScanFilter>) -> Result<Vec<Item>, StoreError>;
}

// == Table Administration ==
/// Capacity billing mode of a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BillingMode {
    Provisioned,
    #[default]
    PayPerRequest,
}

/// Lifecycle status of a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableStatus {
    Creating,
    Active,
}

/// Table metadata returned by `describe_table`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableDescription {
    pub name: String,
    pub hash_key: String,
    pub billing_mode: BillingMode,
    pub status: TableStatus,
    /// Attribute holding item expiry, when TTL is enabled
    pub ttl_attribute: Option<String>,
}

/// Control-plane operations used by provisioning only.
pub trait TableAdmin: Send + Sync {
    fn describe_table(&self, table: &str) -> Result<TableDescription, StoreError>;

    /// Creates a table with a single string hash key.
    fn create_table(
        &self,
        table: &str,
        hash_key: &str,
        billing_mode: BillingMode,
    ) -> Result<(), StoreError>;

    fn update_time_to_live(
        &self,
        table: &str,
        attribute: &str,
        enabled: bool,
    ) -> Result<(), StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attribute_accessors() {
        assert_eq!(AttributeValue::S("a".into()).as_s(), Some("a"));
        assert_eq!(AttributeValue::S("a".into()).as_n(), None);
        assert_eq!(AttributeValue::N("12".into()).as_n(), Some("12"));
        assert_eq!(AttributeValue::B(vec![1, 2]).as_b(), Some(&[1u8, 2][..]));
    }

    #[test]
    fn test_begins_with_filter() {
        let filter = ScanFilter::BeginsWith {
            attribute: "id".into(),
            prefix: "app_".into(),
        };

        assert!(filter.matches(&string_key("id", "app_user")));
        assert!(!filter.matches(&string_key("id", "other_user")));
        assert!(!filter.matches(&string_key("pk", "app_user")));
    }
}
