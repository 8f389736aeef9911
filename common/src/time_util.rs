use std::time::{SystemTime, UNIX_EPOCH};

/// Current wall-clock time, seconds since the Unix epoch.
pub fn now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock is before the Unix epoch")
        .as_secs()
}
