use std::time::Duration;

/// Tunables for the sync orchestrator. Construct with `SyncConfig::default()`
/// and override individual knobs with the `with_*` builders.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Periodic sync cadence. `Duration::ZERO` disables the periodic ticker.
    pub sync_interval: Duration,
    /// Maximum changes sent in a single push batch.
    pub batch_size: usize,
    /// Total push/pull attempts before giving up, including the first.
    pub retry_attempts: u32,
    /// Base retry delay; backoff is `retry_delay * 2^(attempt - 1)`.
    pub retry_delay: Duration,
    /// Coalescing window for push after a local mutation.
    pub debounce_delay: Duration,
    /// Fixed interval for the online reachability probe.
    pub online_probe_interval: Duration,
    /// Delay after an offline -> online transition before triggering sync.
    pub post_online_sync_delay: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        SyncConfig {
            sync_interval: Duration::from_millis(30_000),
            batch_size: 100,
            retry_attempts: 3,
            retry_delay: Duration::from_millis(1_000),
            debounce_delay: Duration::from_millis(1_000),
            online_probe_interval: Duration::from_millis(10_000),
            post_online_sync_delay: Duration::from_millis(1_000),
        }
    }
}

impl SyncConfig {
    pub fn with_sync_interval(mut self, interval: Duration) -> Self {
        self.sync_interval = interval;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_retry_attempts(mut self, retry_attempts: u32) -> Self {
        self.retry_attempts = retry_attempts;
        self
    }

    pub fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }

    pub fn with_debounce_delay(mut self, debounce_delay: Duration) -> Self {
        self.debounce_delay = debounce_delay;
        self
    }

    pub fn with_online_probe_interval(mut self, interval: Duration) -> Self {
        self.online_probe_interval = interval;
        self
    }

    pub fn with_post_online_sync_delay(mut self, delay: Duration) -> Self {
        self.post_online_sync_delay = delay;
        self
    }
}
