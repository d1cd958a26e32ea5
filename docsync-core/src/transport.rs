use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::change::{ChangeBatch, ChangeRecord};
use crate::error::SyncError;
use crate::resolver::ConflictInfo;
use crate::version::Timestamp;

/// Result of `Transport::push`. `success: false` is treated identically to
/// a raised transport error for retry purposes.
#[derive(Debug, Clone)]
pub struct PushResult<T> {
    pub success: bool,
    pub conflicts: Vec<ConflictInfo<T>>,
    pub error: Option<String>,
    pub timestamp: Option<Timestamp>,
}

impl<T> PushResult<T> {
    pub fn ok(timestamp: Timestamp) -> Self {
        PushResult {
            success: true,
            conflicts: Vec::new(),
            error: None,
            timestamp: Some(timestamp),
        }
    }
}

/// Result of `Transport::pull`.
#[derive(Debug, Clone)]
pub struct PullResult<T> {
    pub success: bool,
    pub changes: Vec<ChangeRecord<T>>,
    pub timestamp: Timestamp,
    pub error: Option<String>,
}

impl<T> PullResult<T> {
    pub fn ok(changes: Vec<ChangeRecord<T>>, timestamp: Timestamp) -> Self {
        PullResult {
            success: true,
            changes,
            timestamp,
            error: None,
        }
    }
}

/// Network transport capability consumed by the orchestrator. Concrete
/// implementations (HTTP, WebSocket, ...) are external collaborators; only
/// this contract is in scope here.
///
/// The transport owns remote connectivity state; `is_online` is a cheap
/// reachability probe, not a full health check.
#[async_trait]
pub trait Transport<T>: Send + Sync
where
    T: Send + Sync + Clone,
{
    async fn push(&self, batch: ChangeBatch<T>) -> Result<PushResult<T>, SyncError>;
    async fn pull(&self, since: Timestamp) -> Result<PullResult<T>, SyncError>;
    async fn is_online(&self) -> bool;

    /// Optional real-time push channel. Transports that can't stream remote
    /// changes (most HTTP polling transports) return `None`; the
    /// orchestrator only subscribes when this returns `Some`.
    async fn subscribe_remote_changes(&self) -> Option<mpsc::Receiver<Vec<ChangeRecord<T>>>> {
        None
    }
}
