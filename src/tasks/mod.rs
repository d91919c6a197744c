//! Background Tasks Module
//!
//! Contains background tasks that run periodically during server operation.
//!
//! # Tasks
//! - TTL Sweeper: Removes expired records from the in-memory table store

mod cleanup;

pub use cleanup::spawn_ttl_sweeper;
