use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::document::Document;
use crate::resolver::{ConflictInfo, ConflictResolution};
use crate::state::SyncState;
use crate::version::{DocumentId, Version};

/// Which half-sync an event belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncKind {
    Pull,
    Push,
}

/// The literal event taxonomy, carried as a closed enum rather than
/// stringly-typed names. The discriminant doubles as the subscription key
/// (see `SyncEventKind`).
#[derive(Debug, Clone)]
pub enum SyncEvent<T> {
    DocumentCreated { document: Document<T> },
    DocumentUpdated { document: Document<T>, previous_version: Version },
    DocumentDeleted { id: DocumentId, version: Version },
    SyncStarted { kind: SyncKind },
    SyncCompleted { kind: SyncKind, change_count: usize },
    SyncFailed { kind: SyncKind, error: String },
    ConflictDetected { conflict: ConflictInfo<T> },
    ConflictResolved { id: DocumentId, resolution: ConflictResolution<T> },
    ConnectionOnline,
    ConnectionOffline,
    StateChanged { state: SyncState },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyncEventKind {
    DocumentCreated,
    DocumentUpdated,
    DocumentDeleted,
    SyncStarted,
    SyncCompleted,
    SyncFailed,
    ConflictDetected,
    ConflictResolved,
    ConnectionOnline,
    ConnectionOffline,
    StateChanged,
}

impl<T> SyncEvent<T> {
    pub fn kind(&self) -> SyncEventKind {
        match self {
            SyncEvent::DocumentCreated { .. } => SyncEventKind::DocumentCreated,
            SyncEvent::DocumentUpdated { .. } => SyncEventKind::DocumentUpdated,
            SyncEvent::DocumentDeleted { .. } => SyncEventKind::DocumentDeleted,
            SyncEvent::SyncStarted { .. } => SyncEventKind::SyncStarted,
            SyncEvent::SyncCompleted { .. } => SyncEventKind::SyncCompleted,
            SyncEvent::SyncFailed { .. } => SyncEventKind::SyncFailed,
            SyncEvent::ConflictDetected { .. } => SyncEventKind::ConflictDetected,
            SyncEvent::ConflictResolved { .. } => SyncEventKind::ConflictResolved,
            SyncEvent::ConnectionOnline => SyncEventKind::ConnectionOnline,
            SyncEvent::ConnectionOffline => SyncEventKind::ConnectionOffline,
            SyncEvent::StateChanged { .. } => SyncEventKind::StateChanged,
        }
    }
}

type Listener<T> = Arc<dyn Fn(&SyncEvent<T>) + Send + Sync>;

/// Handle returned by `EventBus::on`. `unsubscribe` is idempotent: calling
/// it twice, or after `removeAllListeners`, is a no-op.
pub struct Subscription<T> {
    bus: Arc<EventBus<T>>,
    kind: SyncEventKind,
    id: u64,
}

impl<T> Subscription<T> {
    pub fn unsubscribe(&self) {
        self.bus.off(self.kind, self.id);
    }
}

/// Typed publish/subscribe over the event taxonomy. A listener that panics
/// does not prevent subsequent listeners from running and does not
/// propagate out of `emit` — the panic is caught, logged on the
/// `"sync::events"` diagnostic target, and swallowed.
pub struct EventBus<T> {
    listeners: Mutex<HashMap<SyncEventKind, Vec<(u64, Listener<T>)>>>,
    next_id: AtomicU64,
}

impl<T> Default for EventBus<T> {
    fn default() -> Self {
        EventBus {
            listeners: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(0),
        }
    }
}

impl<T> EventBus<T> {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn on(
        self: &Arc<Self>,
        kind: SyncEventKind,
        listener: impl Fn(&SyncEvent<T>) + Send + Sync + 'static,
    ) -> Subscription<T> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.listeners
            .lock()
            .entry(kind)
            .or_default()
            .push((id, Arc::new(listener)));
        Subscription {
            bus: self.clone(),
            kind,
            id,
        }
    }

    /// Removes a specific listener by subscription id. Freeing the last
    /// listener for a kind drops the per-event slot entirely.
    pub fn off(&self, kind: SyncEventKind, id: u64) {
        let mut listeners = self.listeners.lock();
        if let Some(slot) = listeners.get_mut(&kind) {
            slot.retain(|(existing, _)| *existing != id);
            if slot.is_empty() {
                listeners.remove(&kind);
            }
        }
    }

    pub fn remove_all_listeners(&self, kind: Option<SyncEventKind>) {
        match kind {
            Some(kind) => {
                self.listeners.lock().remove(&kind);
            }
            None => self.listeners.lock().clear(),
        }
    }

    pub fn emit(&self, event: SyncEvent<T>) {
        let kind = event.kind();
        let callbacks: Vec<Listener<T>> = self
            .listeners
            .lock()
            .get(&kind)
            .map(|slot| slot.iter().map(|(_, cb)| cb.clone()).collect())
            .unwrap_or_default();

        for callback in callbacks {
            let event_ref = &event;
            let outcome = catch_unwind(AssertUnwindSafe(|| callback(event_ref)));
            if outcome.is_err() {
                tracing::warn!(target: "sync::events", kind = ?kind, "event listener panicked; continuing");
            }
        }
    }
}
