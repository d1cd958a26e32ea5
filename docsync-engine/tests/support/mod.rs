use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;

use docsync_core::{
    ChangeBatch, ChangeRecord, Clock, ConflictInfo, Document, DocumentId, PullResult, PushResult,
    Store, SyncError, SyncResult, Timestamp, Transport,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payload {
    pub name: String,
}

impl Payload {
    pub fn new(name: impl Into<String>) -> Self {
        Payload { name: name.into() }
    }
}

/// Deterministic clock, advanced explicitly by the test rather than by
/// sleeping real time.
pub struct TestClock {
    now: AtomicU64,
}

impl TestClock {
    pub fn new(start: Timestamp) -> Arc<Self> {
        Arc::new(TestClock { now: AtomicU64::new(start) })
    }

    pub fn advance(&self, by: Timestamp) {
        self.now.fetch_add(by, Ordering::SeqCst);
    }
}

impl Clock for TestClock {
    fn now_ms(&self) -> Timestamp {
        self.now.load(Ordering::SeqCst)
    }
}

#[derive(Default)]
struct MemoryStoreState {
    docs: HashMap<DocumentId, Document<Payload>>,
    changes: Vec<ChangeRecord<Payload>>,
    last_sync_ts: Timestamp,
}

/// Hand-rolled in-memory `Store`, good enough to exercise the orchestrator
/// against without a real persistence backend.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<MemoryStoreState>,
}

impl MemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(MemoryStore::default())
    }

    pub fn seed(&self, doc: Document<Payload>) {
        self.state.lock().docs.insert(doc.id.clone(), doc);
    }

    pub fn contains(&self, id: &DocumentId) -> bool {
        self.state.lock().docs.contains_key(id)
    }
}

#[async_trait]
impl Store<Payload> for Arc<MemoryStore> {
    async fn get(&self, id: &DocumentId) -> SyncResult<Option<Document<Payload>>> {
        Ok(self.state.lock().docs.get(id).cloned())
    }

    async fn put(&self, doc: Document<Payload>) -> SyncResult<()> {
        self.state.lock().docs.insert(doc.id.clone(), doc);
        Ok(())
    }

    async fn delete(&self, id: &DocumentId) -> SyncResult<()> {
        self.state.lock().docs.remove(id);
        Ok(())
    }

    async fn get_all(&self) -> SyncResult<Vec<Document<Payload>>> {
        Ok(self.state.lock().docs.values().cloned().collect())
    }

    async fn get_all_ids(&self) -> SyncResult<Vec<DocumentId>> {
        Ok(self.state.lock().docs.keys().cloned().collect())
    }

    async fn get_changes_since(&self, ts: Timestamp) -> SyncResult<Vec<ChangeRecord<Payload>>> {
        Ok(self.state.lock().changes.iter().filter(|c| c.local_ts > ts).cloned().collect())
    }

    async fn put_change(&self, change: ChangeRecord<Payload>) -> SyncResult<()> {
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

#[derive(Default)]
struct MockTransportState {
    online: bool,
    pull_queue: Vec<ChangeRecord<Payload>>,
    pull_timestamp: Timestamp,
    push_conflicts: Vec<ConflictInfo<Payload>>,
    push_timestamp: Option<Timestamp>,
    fail_push: bool,
    fail_pull: bool,
    pushed_batches: Vec<ChangeBatch<Payload>>,
}

/// Hand-rolled mock transport: scriptable pull/push outcomes, no real
/// network. Mirrors what a client-side test harness fakes out in practice.
pub struct MockTransport {
    state: Mutex<MockTransportState>,
}

impl MockTransport {
    pub fn new(online: bool) -> Arc<Self> {
        Arc::new(MockTransport {
            state: Mutex::new(MockTransportState {
                online,
                ..Default::default()
            }),
        })
    }

    pub fn set_online(&self, online: bool) {
        self.state.lock().online = online;
    }

    pub fn queue_remote_change(&self, change: ChangeRecord<Payload>, timestamp: Timestamp) {
        let mut state = self.state.lock();
        state.pull_queue.push(change);
        state.pull_timestamp = timestamp;
    }

    pub fn set_fail_push(&self, fail: bool) {
        self.state.lock().fail_push = fail;
    }

    pub fn set_fail_pull(&self, fail: bool) {
        self.state.lock().fail_pull = fail;
    }

    pub fn set_push_timestamp(&self, ts: Timestamp) {
        self.state.lock().push_timestamp = Some(ts);
    }

    pub fn pushed_batches(&self) -> Vec<ChangeBatch<Payload>> {
        self.state.lock().pushed_batches.clone()
    }
}

#[async_trait]
impl Transport<Payload> for Arc<MockTransport> {
    async fn push(&self, batch: ChangeBatch<Payload>) -> SyncResult<PushResult<Payload>> {
        let mut state = self.state.lock();
        if state.fail_push {
            return Err(SyncError::Transport("simulated push failure".into()));
        }
        state.pushed_batches.push(batch);
        Ok(PushResult {
            success: true,
            conflicts: std::mem::take(&mut state.push_conflicts),
            error: None,
            timestamp: state.push_timestamp,
        })
    }

    async fn pull(&self, _since: Timestamp) -> SyncResult<PullResult<Payload>> {
        let mut state = self.state.lock();
        if state.fail_pull {
            return Err(SyncError::Transport("simulated pull failure".into()));
        }
        let changes = std::mem::take(&mut state.pull_queue);
        Ok(PullResult::ok(changes, state.pull_timestamp))
    }

    async fn is_online(&self) -> bool {
        self.state.lock().online
    }

    async fn subscribe_remote_changes(&self) -> Option<mpsc::Receiver<Vec<ChangeRecord<Payload>>>> {
        None
    }
}

/// Captures every emitted event kind (by debug string) in order, for
/// sequence assertions.
pub struct EventLog {
    pub entries: Mutex<Vec<String>>,
}

impl EventLog {
    pub fn new() -> Arc<Self> {
        Arc::new(EventLog { entries: Mutex::new(Vec::new()) })
    }

    pub fn push(&self, label: impl Into<String>) {
        self.entries.lock().push(label.into());
    }

    pub fn snapshot(&self) -> Vec<String> {
        self.entries.lock().clone()
    }
}
