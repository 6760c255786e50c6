use std::time::{SystemTime, UNIX_EPOCH};

/// return millisecond since epoch
pub(crate) fn now_ms() -> i64 {
    let now = SystemTime::now();
    let since_epoch = now.duration_since(UNIX_EPOCH).expect("Time went backwards");
    since_epoch.as_millis() as i64
}

/// A hint written at `writetime_ms` with `ttl_secs` is dead once its expiry
/// instant has passed. Both sides of the comparison are in milliseconds.
pub(crate) fn hint_expired(writetime_ms: i64, ttl_secs: u32, now_ms: i64) -> bool {
    writetime_ms.saturating_add(ttl_secs as i64 * 1000) < now_ms
}
