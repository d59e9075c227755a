//! Wall-clock helpers.
//!
//! The data model keeps timestamps as epoch milliseconds; engine-state
//! bookkeeping uses RFC3339 strings.

use chrono::Utc;

/// Current time as epoch milliseconds.
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Current time as an RFC3339 string.
pub fn now_rfc3339() -> String {
    Utc::now().to_rfc3339()
}
