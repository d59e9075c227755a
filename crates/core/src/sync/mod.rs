//! Synchronization domain: conflict resolution, the full and incremental
//! sync passes, scheduling, and network state.

mod conflict_resolver;
mod engine;
mod network_monitor;
mod remote;
mod scheduler;
mod sync_model;
mod sync_service;

pub use conflict_resolver::*;
pub use engine::*;
pub use network_monitor::*;
pub use remote::*;
pub use scheduler::*;
pub use sync_model::*;
pub use sync_service::*;

#[cfg(test)]
mod test_support;
