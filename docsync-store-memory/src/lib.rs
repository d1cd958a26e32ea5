//! A `Store` backed by nothing but a `HashMap`. Useful for tests, demos,
//! and clients that accept losing local state on restart.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;

use docsync_core::{ChangeRecord, Document, DocumentId, Store, SyncResult, Timestamp};

struct State<T> {
    docs: HashMap<DocumentId, Document<T>>,
    changes: Vec<ChangeRecord<T>>,
    last_sync_ts: Timestamp,
}

impl<T> Default for State<T> {
    fn default() -> Self {
        State {
            docs: HashMap::new(),
            changes: Vec::new(),
            last_sync_ts: 0,
        }
    }
}

/// In-memory `Store<T>`. Holds no lock across an `.await` point — every
/// critical section is a synchronous `HashMap`/`Vec` operation.
pub struct MemoryStore<T> {
    state: Mutex<State<T>>,
}

impl<T> Default for MemoryStore<T> {
    fn default() -> Self {
        MemoryStore {
            state: Mutex::new(State::default()),
        }
    }
}

impl<T> MemoryStore<T> {
    pub fn new() -> Self {
        MemoryStore::default()
    }
}

#[async_trait]
impl<T> Store<T> for MemoryStore<T>
where
    T: Send + Sync + Clone,
{
    async fn get(&self, id: &DocumentId) -> SyncResult<Option<Document<T>>> {
        Ok(self.state.lock().docs.get(id).cloned())
    }

    async fn put(&self, doc: Document<T>) -> SyncResult<()> {
        self.state.lock().docs.insert(doc.id.clone(), doc);
        Ok(())
    }

    async fn delete(&self, id: &DocumentId) -> SyncResult<()> {
        self.state.lock().docs.remove(id);
        Ok(())
    }

    async fn get_all(&self) -> SyncResult<Vec<Document<T>>> {
        Ok(self.state.lock().docs.values().cloned().collect())
    }

    async fn get_all_ids(&self) -> SyncResult<Vec<DocumentId>> {
        Ok(self.state.lock().docs.keys().cloned().collect())
    }

    async fn get_changes_since(&self, ts: Timestamp) -> SyncResult<Vec<ChangeRecord<T>>> {
        Ok(self
            .state
            .lock()
            .changes
            .iter()
            .filter(|c| c.local_ts > ts)
            .cloned()
            .collect())
    }

    async fn put_change(&self, change: ChangeRecord<T>) -> SyncResult<()> {
        self.state.lock().changes.push(change);
        Ok(())
    }

    async fn clear_changes_before(&self, ts: Timestamp) -> SyncResult<()> {
        self.state.lock().changes.retain(|c| c.local_ts >= ts);
        Ok(())
    }

    async fn get_last_sync_timestamp(&self) -> SyncResult<Timestamp> {
        Ok(self.state.lock().last_sync_ts)
    }

    async fn set_last_sync_timestamp(&self, ts: Timestamp) -> SyncResult<()> {
        self.state.lock().last_sync_ts = ts;
        Ok(())
    }
}
