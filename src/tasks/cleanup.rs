//! TTL Sweeper Task
//!
//! Background task that removes expired records from the in-memory table
//! store, the way the managed service deletes items past their TTL.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::Clock;
use crate::dynamo::InMemoryStore;

/// Spawns a background task that periodically purges expired records.
///
/// Only tables with TTL enabled are swept. Reads never depend on the
/// sweep: the cache treats records past their expiry as misses anyway.
///
/// # Returns
/// A JoinHandle for the spawned task, which can be used to abort the task
/// during graceful shutdown.
///
/// # Example
/// ```ignore
/// let store = Arc::new(InMemoryStore::new());
/// let sweeper = spawn_ttl_sweeper(store.clone(), Arc::new(SystemClock), Duration::from_secs(1));
/// // Later, during shutdown:
/// sweeper.abort();
/// ```
pub fn spawn_ttl_sweeper(
    store: Arc<InMemoryStore>,
    clock: Arc<dyn Clock>,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!("Starting TTL sweeper with interval of {:?}", interval);

        loop {
            tokio::time::sleep(interval).await;

            let removed = store.purge_expired(clock.now());
            if removed > 0 {
                info!("TTL sweep: removed {} expired records", removed);
            } else {
                debug!("TTL sweep: no expired records found");
            }
        }
    })
}
