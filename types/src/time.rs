//! Wall-clock access.
//!
//! Timestamps are Unix epoch seconds (UTC). Slot discipline requires clock
//! synchronization between nodes (NTP or equivalent).

use std::time::{SystemTime, UNIX_EPOCH};

/// Current Unix time in seconds.
pub fn now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock before Unix epoch")
        .as_secs()
}
