use crate::version::Timestamp;

/// Recomputed on demand, never persisted as such — a point-in-time snapshot
/// emitted on `STATE_CHANGED` and returned by `SyncOrchestrator::sync_state`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncState {
    pub last_pull_ts: Timestamp,
    pub last_push_ts: Timestamp,
    pub pending_changes: usize,
    pub is_online: bool,
    pub is_syncing: bool,
}
