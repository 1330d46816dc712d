//! Utility functions for the draft coordination service

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Generate a unique identifier for a transport connection
pub fn generate_connection_id() -> Uuid {
    Uuid::new_v4()
}

/// Get the current UTC timestamp
pub fn current_timestamp() -> DateTime<Utc> {
    Utc::now()
}

/// Whole seconds remaining until `deadline`, rounded up, floored at zero
pub fn remaining_whole_seconds(deadline: DateTime<Utc>, now: DateTime<Utc>) -> u64 {
    let millis = (deadline - now).num_milliseconds();
    if millis <= 0 {
        0
    } else {
        (millis as u64).div_ceil(1000)
    }
}
