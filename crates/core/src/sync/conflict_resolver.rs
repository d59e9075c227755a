//! Whole-record, last-writer-wins conflict resolution.
//!
//! Pure functions over the two change sets; callers persist the results.

use std::collections::{HashMap, HashSet};

use crate::collection::CollectibleCar;

/// Which side of a conflicting pair survives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictWinner {
    Local,
    Remote,
}

/// Output of [`resolve`]: winners routed to the side that still needs them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Resolution {
    /// Local records to push to the remote store.
    pub to_push: Vec<CollectibleCar>,
    /// Remote records to apply to the local store.
    pub to_apply: Vec<CollectibleCar>,
}

/// Decide the winner of one conflicting pair.
///
/// Order of precedence:
/// 1. a tombstoned side wins unconditionally (both deleted: either is fine);
/// 2. strictly higher `version` wins;
/// 3. versions equal: strictly later `updated_at` wins;
/// 4. full tie: local wins (deterministic policy default).
pub fn resolve_pair(local: &CollectibleCar, remote: &CollectibleCar) -> ConflictWinner {
    if local.is_deleted || remote.is_deleted {
        return if local.is_deleted {
            ConflictWinner::Local
        } else {
            ConflictWinner::Remote
        };
    }

    if local.version != remote.version {
        return if local.version > remote.version {
            ConflictWinner::Local
        } else {
            ConflictWinner::Remote
        };
    }

    if local.updated_at != remote.updated_at {
        return if local.updated_at > remote.updated_at {
            ConflictWinner::Local
        } else {
            ConflictWinner::Remote
        };
    }

    ConflictWinner::Local
}

/// Pair the two change sets by record identity and emit exactly one winner
/// per group. Unilateral changes pass straight through; the loser of a
/// conflicting pair is discarded (no field-level merge).
///
/// Duplicate ids within one input list are a caller bug.
pub fn resolve(
    local_changes: Vec<CollectibleCar>,
    remote_changes: Vec<CollectibleCar>,
) -> Resolution {
    debug_assert_unique_ids(&local_changes);
    debug_assert_unique_ids(&remote_changes);

    let mut remote_by_id: HashMap<String, CollectibleCar> = remote_changes
        .iter()
        .map(|car| (car.id.clone(), car.clone()))
        .collect();

    let mut resolution = Resolution::default();

    for local in local_changes {
        match remote_by_id.remove(&local.id) {
            None => resolution.to_push.push(local),
            Some(remote) => match resolve_pair(&local, &remote) {
                ConflictWinner::Local => resolution.to_push.push(local),
                ConflictWinner::Remote => resolution.to_apply.push(remote),
            },
        }
    }

    // Remaining remote-only changes, in their original order.
    for remote in remote_changes {
        if remote_by_id.remove(&remote.id).is_some() {
            resolution.to_apply.push(remote);
        }
    }

    resolution
}

fn debug_assert_unique_ids(changes: &[CollectibleCar]) {
    if cfg!(debug_assertions) {
        let mut seen = HashSet::new();
        for car in changes {
            debug_assert!(
                seen.insert(car.id.as_str()),
                "duplicate record id '{}' within one change list",
                car.id
            );
        }
    }
}
