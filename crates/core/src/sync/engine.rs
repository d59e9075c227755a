//! Retry classification and backoff helpers shared by the sync services and
//! the scheduler.

use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::errors::{Error, RemoteError};

/// Retry policy classification for sync failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncRetryClass {
    Retryable,
    Permanent,
    ReauthRequired,
}

/// Classify HTTP status into retry behavior.
pub fn classify_http_status(status: u16) -> SyncRetryClass {
    match status {
        401 | 403 => SyncRetryClass::ReauthRequired,
        408 | 409 | 423 | 425 | 429 => SyncRetryClass::Retryable,
        500..=599 => SyncRetryClass::Retryable,
        _ => SyncRetryClass::Permanent,
    }
}

/// Classify a core error for retry purposes. Transport failures are always
/// worth another attempt; local store and serialization failures are not.
pub fn classify_error(error: &Error) -> SyncRetryClass {
    match error {
        Error::Remote(RemoteError::Api { status, .. }) => classify_http_status(*status),
        Error::Remote(RemoteError::Transport(_)) => SyncRetryClass::Retryable,
        Error::Io(_) => SyncRetryClass::Retryable,
        Error::Database(_) | Error::Serialization(_) | Error::Validation(_) | Error::Sync(_) => {
            SyncRetryClass::Permanent
        }
    }
}

/// Exponential backoff in seconds with cap.
pub fn backoff_seconds(consecutive_failures: i32) -> i64 {
    const MAX_EXPONENT: i32 = 8;
    const BASE_DELAY_SECONDS: i64 = 5;

    let capped = i64::from(consecutive_failures.clamp(0, MAX_EXPONENT));
    2_i64.pow(capped as u32) * BASE_DELAY_SECONDS
}

/// Periodic cadence with uniform jitter so a fleet of devices does not hit
/// the backend in lockstep.
pub fn interval_with_jitter(base: Duration, max_jitter: Duration) -> Duration {
    let jitter_ms = rand::thread_rng().gen_range(0..=max_jitter.as_millis().max(1) as u64);
    base + Duration::from_millis(jitter_ms)
}
