use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::clock::Clock;
use crate::document::Document;
use crate::version::{DocumentId, Timestamp, Version};

/// The closed tagged variant of a local mutation. `Delete` carries no data
/// payload by construction, rather than by convention for dynamically
/// typed clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeOp {
    Create,
    Update,
    Delete,
}

/// A queued description of a local create/update/delete, eventually
/// transmitted in a push batch. `local_ts` is stamped when the change is
/// recorded, not when the mutation's version was computed — the two
/// normally coincide but are conceptually distinct clocks.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound(serialize = "T: Serialize", deserialize = "T: DeserializeOwned"))]
pub struct ChangeRecord<T> {
    pub id: DocumentId,
    pub op: ChangeOp,
    pub data: Option<T>,
    pub version: Version,
    pub local_ts: Timestamp,
}

/// The payload of a single push: an ordered subsequence of the pending
/// queue, up to `batchSize` entries, plus the last push timestamp the
/// server can use to compute a delta.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound(serialize = "T: Serialize", deserialize = "T: DeserializeOwned"))]
pub struct ChangeBatch<T> {
    pub changes: Vec<ChangeRecord<T>>,
    pub last_sync_ts: Option<Timestamp>,
}

/// Persistable snapshot of tracker state, for store handoff
/// (`exportState`/`importState`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound(serialize = "T: Serialize", deserialize = "T: DeserializeOwned"))]
pub struct ChangeTrackerSnapshot<T> {
    pub queue: Vec<ChangeRecord<T>>,
}

struct TrackerState<T> {
    queue: VecDeque<ChangeRecord<T>>,
    index: HashMap<DocumentId, ChangeRecord<T>>,
}

impl<T> Default for TrackerState<T> {
    fn default() -> Self {
        TrackerState {
            queue: VecDeque::new(),
            index: HashMap::new(),
        }
    }
}

/// In-memory, append-only queue of pending local changes plus a
/// latest-per-document index. Purely in-memory, so it never fails.
///
/// The queue is the sync payload ("what needs to go out"); the index is the
/// "what is the current intent" view used for quick per-document lookups.
/// `mergeChanges` can leave multiple records per id in the queue by design.
pub struct ChangeTracker<T> {
    state: Mutex<TrackerState<T>>,
    clock: Arc<dyn Clock>,
}

impl<T: Clone> ChangeTracker<T> {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        ChangeTracker {
            state: Mutex::new(TrackerState::default()),
            clock,
        }
    }

    fn record(&self, id: DocumentId, op: ChangeOp, data: Option<T>, version: Version) -> ChangeRecord<T> {
        let record = ChangeRecord {
            id: id.clone(),
            op,
            data,
            version,
            local_ts: self.clock.now_ms(),
        };
        let mut state = self.state.lock();
        state.index.insert(id, record.clone());
        state.queue.push_back(record.clone());
        record
    }

    pub fn record_create(&self, doc: &Document<T>) -> ChangeRecord<T> {
        self.record(doc.id.clone(), ChangeOp::Create, Some(doc.data.clone()), doc.version.clone())
    }

    pub fn record_update(&self, doc: &Document<T>) -> ChangeRecord<T> {
        self.record(doc.id.clone(), ChangeOp::Update, Some(doc.data.clone()), doc.version.clone())
    }

    pub fn record_delete(&self, id: DocumentId, version: Version) -> ChangeRecord<T> {
        self.record(id, ChangeOp::Delete, None, version)
    }

    pub fn get_pending_changes(&self) -> Vec<ChangeRecord<T>> {
        self.state.lock().queue.iter().cloned().collect()
    }

    pub fn get_pending_change_count(&self) -> usize {
        self.state.lock().queue.len()
    }

    pub fn has_pending_changes(&self) -> bool {
        !self.state.lock().queue.is_empty()
    }

    pub fn get_changes_since(&self, ts: Timestamp) -> Vec<ChangeRecord<T>> {
        self.state
            .lock()
            .queue
            .iter()
            .filter(|c| c.local_ts > ts)
            .cloned()
            .collect()
    }

    pub fn get_latest_change(&self, id: &DocumentId) -> Option<ChangeRecord<T>> {
        self.state.lock().index.get(id).cloned()
    }

    /// Retain only records committed at or after `cutoff` in both the queue
    /// and the index. Called after a successful push with
    /// `cutoff = max(localTs over pushed changes) + 1`.
    pub fn clear_changes_before(&self, cutoff: Timestamp) {
        let mut state = self.state.lock();
        state.queue.retain(|c| c.local_ts >= cutoff);
        state.index.retain(|_, c| c.local_ts >= cutoff);
    }

    /// Accept externally produced records (e.g. a conflict resolution).
    /// The index entry is replaced only if the incoming record's version is
    /// newer; the queue always grows, since it drives the next push.
    pub fn merge_changes(&self, external: Vec<ChangeRecord<T>>) {
        let mut state = self.state.lock();
        for record in external {
            let replace = match state.index.get(&record.id) {
                Some(existing) => record.version.ts > existing.version.ts,
                None => true,
            };
            if replace {
                state.index.insert(record.id.clone(), record.clone());
            }
            state.queue.push_back(record);
        }
    }

    pub fn clear_all_changes(&self) {
        let mut state = self.state.lock();
        state.queue.clear();
        state.index.clear();
    }

    pub fn export_state(&self) -> ChangeTrackerSnapshot<T> {
        ChangeTrackerSnapshot {
            queue: self.get_pending_changes(),
        }
    }

    pub fn import_state(&self, snapshot: ChangeTrackerSnapshot<T>) {
        let mut state = self.state.lock();
        state.queue.clear();
        state.index.clear();
        for record in snapshot.queue {
            state.index.insert(record.id.clone(), record.clone());
            state.queue.push_back(record);
        }
    }
}
