use async_trait::async_trait;

use crate::change::ChangeRecord;
use crate::document::Document;
use crate::error::SyncError;
use crate::version::{DocumentId, Timestamp};

/// Durable persistence capability consumed by the orchestrator. Concrete
/// implementations (a SQLite file, an IndexedDB wrapper, ...) are external
/// collaborators; only this contract is in scope here.
///
/// The store owns durable document state and the durable
/// `lastSyncTimestamp`; the orchestrator owns everything else.
#[async_trait]
pub trait Store<T>: Send + Sync
where
    T: Send + Sync + Clone,
{
    async fn get(&self, id: &DocumentId) -> Result<Option<Document<T>>, SyncError>;
    async fn put(&self, doc: Document<T>) -> Result<(), SyncError>;
    async fn delete(&self, id: &DocumentId) -> Result<(), SyncError>;

    async fn get_batch(&self, ids: &[DocumentId]) -> Result<Vec<Document<T>>, SyncError> {
        let mut out = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(doc) = self.get(id).await? {
                out.push(doc);
            }
        }
        Ok(out)
    }

    async fn put_batch(&self, docs: Vec<Document<T>>) -> Result<(), SyncError> {
        for doc in docs {
            self.put(doc).await?;
        }
        Ok(())
    }

    async fn get_all(&self) -> Result<Vec<Document<T>>, SyncError>;
    async fn get_all_ids(&self) -> Result<Vec<DocumentId>, SyncError>;

    async fn get_changes_since(&self, ts: Timestamp) -> Result<Vec<ChangeRecord<T>>, SyncError>;
    async fn put_change(&self, change: ChangeRecord<T>) -> Result<(), SyncError>;
    async fn clear_changes_before(&self, ts: Timestamp) -> Result<(), SyncError>;

    async fn get_last_sync_timestamp(&self) -> Result<Timestamp, SyncError>;
    async fn set_last_sync_timestamp(&self, ts: Timestamp) -> Result<(), SyncError>;

    /// Most stores have nothing to flush; the default is a no-op.
    async fn close(&self) -> Result<(), SyncError> {
        Ok(())
    }
}
