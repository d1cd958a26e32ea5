/// Error surface shared by the store/transport/resolver capabilities and the
/// change tracker's persistence handoff. The orchestrator never lets one of
/// these escape `sync()`; it converts every variant into a `SYNC_FAILED`
/// event instead (see `docsync-engine::orchestrator`).
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("store operation failed: {0}")]
    Store(String),

    #[error("transport operation failed: {0}")]
    Transport(String),

    #[error("serialization failed: {0}")]
    Serialization(String),

    #[error("failed to resolve conflict for {id}: {reason}")]
    Resolver { id: String, reason: String },

    #[error("document not found: {0}")]
    NotFound(String),

    #[error("{0}")]
    Other(String),
}

pub type SyncResult<T> = Result<T, SyncError>;
