//! Sync-engine state persistence.

mod repository;

pub use repository::{SyncStateDB, SyncStateRepository};
