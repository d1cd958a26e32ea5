use std::time::{SystemTime, UNIX_EPOCH};

use crate::version::Timestamp;

/// Wall-clock capability, injected so tests can control `now()` without a
/// real sleep. Production code uses `SystemClock`; tests can substitute a
/// `FixedClock`/`SteppedClock` to assert exact timestamps.
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> Timestamp;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> Timestamp {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system clock before unix epoch")
            .as_millis() as Timestamp
    }
}
