//! Core domain and synchronization services for the Diecast collection
//! manager: records and photos, the conflict resolver, the full and
//! incremental sync passes, the scheduler, and the network-state signal.
//!
//! Storage and remote collaborators are trait contracts implemented by the
//! `diecast-storage-sqlite` and `diecast-cloud-sync` crates.

pub mod collection;
pub mod errors;
pub mod sync;
pub mod utils;

pub use errors::{Error, Result};
