//! Cloud sync client for the Diecast collection manager.
//!
//! Implements the core remote contracts against the REST catalog/object API:
//! point reads and writes keyed by owner and record, changed-since queries,
//! the shared barcode dataset, and upload/delete by object path.

mod client;
mod error;
mod types;

pub use client::CollectionApiClient;
pub use error::{CloudSyncError, Result};
pub use types::*;
