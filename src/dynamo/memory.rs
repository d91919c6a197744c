//! In-Memory Table Store
//!
//! A local stand-in for the managed table service. Enforces the service's
//! batch limits and table lifecycle so the cache engine can be exercised
//! without a network, and exposes hooks to inject failures.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use tracing::debug;

use super::{
    AttributeValue, BatchGetOutput, BatchWriteOutput, BillingMode, Item, ScanFilter, StoreClient,
    StoreError, TableAdmin, TableDescription, TableStatus, WriteRequest, BATCH_GET_LIMIT,
    BATCH_WRITE_LIMIT,
};

// == Table ==
#[derive(Debug)]
struct Table {
    hash_key: String,
    billing_mode: BillingMode,
    ttl_attribute: Option<String>,
    /// Describe calls left before the table reports `Active`
    pending_activation: usize,
    items: HashMap<String, Item>,
}

impl Table {
    fn key_of(&self, item: &Item) -> Result<String, StoreError> {
        item.get(&self.hash_key)
            .and_then(AttributeValue::as_s)
            .map(str::to_string)
            .ok_or_else(|| {
                StoreError::Client(format!(
                    "One or more parameter values were invalid: Missing the key {} in the item",
                    self.hash_key
                ))
            })
    }
}

// == In-Memory Store ==
/// Thread-safe in-memory table store.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    tables: RwLock<HashMap<String, Table>>,
    /// Errors returned by the next data-plane calls, in order
    failures: Mutex<VecDeque<StoreError>>,
    /// Max requests applied per batch-write; the rest come back unprocessed
    batch_write_throughput: Mutex<Option<usize>>,
    /// Describe calls a newly created table stays in `Creating`
    activation_delay: Mutex<usize>,
    operations: Mutex<Vec<&'static str>>,
}

impl InMemoryStore {
    // == Constructor ==
    /// Creates an empty store without tables.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store holding one active table keyed by `hash_key`.
    pub fn with_table(table: &str, hash_key: &str) -> Self {
        let store = Self::new();
        store.tables_mut().insert(
            table.to_string(),
            Table {
                hash_key: hash_key.to_string(),
                billing_mode: BillingMode::PayPerRequest,
                ttl_attribute: None,
                pending_activation: 0,
                items: HashMap::new(),
            },
        );
        store
    }

    // == Test Hooks ==
    /// Makes the next data-plane call fail with `error`.
    pub fn fail_next(&self, error: StoreError) {
        lock(&self.failures).push_back(error);
    }

    /// Limits how many requests a single batch-write applies.
    pub fn throttle_batch_writes(&self, per_call: Option<usize>) {
        *lock(&self.batch_write_throughput) = per_call;
    }

    /// Number of describe calls a created table reports `Creating`.
    pub fn set_activation_delay(&self, describes: usize) {
        *lock(&self.activation_delay) = describes;
    }

    /// Data-plane operations performed so far, by name.
    pub fn operations(&self) -> Vec<&'static str> {
        lock(&self.operations).clone()
    }

    pub fn reset_operations(&self) {
        lock(&self.operations).clear();
    }

    // == Inspection ==
    /// Returns a copy of the record stored under `key`.
    pub fn raw_item(&self, table: &str, key: &str) -> Option<Item> {
        self.tables()
            .get(table)
            .and_then(|t| t.items.get(key))
            .cloned()
    }

    /// Number of records in `table` (0 if missing).
    pub fn item_count(&self, table: &str) -> usize {
        self.tables().get(table).map_or(0, |t| t.items.len())
    }

    // == TTL Emulation ==
    /// Removes records whose TTL attribute lies at or before `now`.
    ///
    /// Only tables with TTL enabled are swept. Returns the number of
    /// records removed.
    pub fn purge_expired(&self, now: DateTime<Utc>) -> usize {
        let cutoff = now.timestamp();
        let mut removed = 0;

        for table in self.tables_mut().values_mut() {
            let Some(ttl_attribute) = table.ttl_attribute.clone() else {
                continue;
            };
            let before = table.items.len();
            table.items.retain(|_, item| {
                match item
                    .get(&ttl_attribute)
                    .and_then(AttributeValue::as_n)
                    .and_then(|n| n.parse::<i64>().ok())
                {
                    Some(expires) => expires > cutoff,
                    None => true,
                }
            });
            removed += before - table.items.len();
        }

        removed
    }

    // == Internals ==
    fn tables(&self) -> RwLockReadGuard<'_, HashMap<String, Table>> {
        self.tables.read().unwrap_or_else(|e| e.into_inner())
    }

    fn tables_mut(&self) -> RwLockWriteGuard<'_, HashMap<String, Table>> {
        self.tables.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Logs the operation and pops an injected failure, if any.
    fn begin(&self, operation: &'static str) -> Result<(), StoreError> {
        lock(&self.operations).push(operation);
        match lock(&self.failures).pop_front() {
            Some(error) => {
                debug!("Injected failure for {}: {}", operation, error);
                Err(error)
            }
            None => Ok(()),
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

fn missing_table(table: &str) -> StoreError {
    StoreError::ResourceNotFound(format!("Requested resource not found: Table: {table} not found"))
}

// == Store Client ==
impl StoreClient for InMemoryStore {
    fn get_item(&self, table: &str, key: Item) -> Result<Option<Item>, StoreError> {
        self.begin("get_item")?;
        let tables = self.tables();
        let table = tables.get(table).ok_or_else(|| missing_table(table))?;
        let key = table.key_of(&key)?;
        Ok(table.items.get(&key).cloned())
    }

    fn batch_get_item(&self, table: &str, keys: Vec<Item>) -> Result<BatchGetOutput, StoreError> {
        self.begin("batch_get_item")?;
        if keys.len() > BATCH_GET_LIMIT {
            return Err(StoreError::Client(format!(
                "Too many items requested for the BatchGetItem call: {} > {}",
                keys.len(),
                BATCH_GET_LIMIT
            )));
        }

        let tables = self.tables();
        let table = tables.get(table).ok_or_else(|| missing_table(table))?;
        let mut output = BatchGetOutput::default();
        for key in &keys {
            if let Some(item) = table.items.get(&table.key_of(key)?) {
                output.items.push(item.clone());
            }
        }
        Ok(output)
    }

    fn put_item(&self, table: &str, item: Item) -> Result<(), StoreError> {
        self.begin("put_item")?;
        let mut tables = self.tables_mut();
        let table = tables.get_mut(table).ok_or_else(|| missing_table(table))?;
        let key = table.key_of(&item)?;
        table.items.insert(key, item);
        Ok(())
    }

    fn delete_item(&self, table: &str, key: Item) -> Result<(), StoreError> {
        self.begin("delete_item")?;
        let mut tables = self.tables_mut();
        let table = tables.get_mut(table).ok_or_else(|| missing_table(table))?;
        let key = table.key_of(&key)?;
        table.items.remove(&key);
        Ok(())
    }

    fn batch_write_item(
        &self,
        table: &str,
        requests: Vec<WriteRequest>,
    ) -> Result<BatchWriteOutput, StoreError> {
        self.begin("batch_write_item")?;
        if requests.len() > BATCH_WRITE_LIMIT {
            return Err(StoreError::Client(format!(
                "Too many items requested for the BatchWriteItem call: {} > {}",
                requests.len(),
                BATCH_WRITE_LIMIT
            )));
        }

        let throughput = *lock(&self.batch_write_throughput);
        let mut tables = self.tables_mut();
        let table = tables.get_mut(table).ok_or_else(|| missing_table(table))?;

        let mut output = BatchWriteOutput::default();
        for (index, request) in requests.into_iter().enumerate() {
            if throughput.is_some_and(|limit| index >= limit) {
                output.unprocessed.push(request);
                continue;
            }
            match &request {
                WriteRequest::Put { item } => {
                    let key = table.key_of(item)?;
                    table.items.insert(key, item.clone());
                }
                WriteRequest::Delete { key } => {
                    let key = table.key_of(key)?;
                    table.items.remove(&key);
                }
            }
        }
        Ok(output)
    }

    fn scan(&self, table: &str, filter: Option<&ScanFilter>) -> Result<Vec<Item>, StoreError> {
        self.begin("scan")?;
        let tables = self.tables();
        let table = tables.get(table).ok_or_else(|| missing_table(table))?;
        Ok(table
            .items
            .values()
            .filter(|item| filter.map_or(true, |f| f.matches(item)))
            .cloned()
            .collect())
    }
}

// == Table Admin ==
impl TableAdmin for InMemoryStore {
    fn describe_table(&self, table: &str) -> Result<TableDescription, StoreError> {
        let mut tables = self.tables_mut();
        let entry = tables.get_mut(table).ok_or_else(|| missing_table(table))?;

        let status = if entry.pending_activation > 0 {
            entry.pending_activation -= 1;
            TableStatus::Creating
        } else {
            TableStatus::Active
        };

        Ok(TableDescription {
            name: table.to_string(),
            hash_key: entry.hash_key.clone(),
            billing_mode: entry.billing_mode,
            status,
            ttl_attribute: entry.ttl_attribute.clone(),
        })
    }

    fn create_table(
        &self,
        table: &str,
        hash_key: &str,
        billing_mode: BillingMode,
    ) -> Result<(), StoreError> {
        let pending_activation = *lock(&self.activation_delay);
        let mut tables = self.tables_mut();
        if tables.contains_key(table) {
            return Err(StoreError::Client(format!(
                "Table already exists: {table}"
            )));
        }

        tables.insert(
            table.to_string(),
            Table {
                hash_key: hash_key.to_string(),
                billing_mode,
                ttl_attribute: None,
                pending_activation,
                items: HashMap::new(),
            },
        );
        Ok(())
    }

    fn update_time_to_live(
        &self,
        table: &str,
        attribute: &str,
        enabled: bool,
    ) -> Result<(), StoreError> {
        let mut tables = self.tables_mut();
        let entry = tables.get_mut(table).ok_or_else(|| missing_table(table))?;
        entry.ttl_attribute = enabled.then(|| attribute.to_string());
        Ok(())
    }
}
