use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinHandle;

use docsync_core::{
    ChangeBatch, ChangeOp, ChangeRecord, ChangeTracker, Clock, ConflictInfo, ConflictResolver,
    Document, DocumentId, EventBus, PullResult, PushResult, Store, SyncError, SyncEvent, SyncKind,
    SyncResult, SyncState, Timestamp, Transport, Version,
};

use crate::config::SyncConfig;
use crate::retry::retry_with_backoff;

/// Coordinates local document CRUD, the pending-change log, and the
/// pull/push/apply/resolve state machine against an injected store,
/// transport, and conflict resolver.
///
/// Always constructed behind an `Arc` (`SyncOrchestrator::new`) because
/// timers and the real-time intake handler need to hold a reference back
/// into the orchestrator across task boundaries.
pub struct SyncOrchestrator<T, St, Tr, Cr> {
    store: St,
    transport: Tr,
    resolver: Cr,
    tracker: ChangeTracker<T>,
    clock: Arc<dyn Clock>,
    events: Arc<EventBus<T>>,
    config: SyncConfig,

    last_pull_ts: Mutex<Timestamp>,
    last_push_ts: Mutex<Timestamp>,
    is_online: Mutex<bool>,
    started: AtomicBool,

    sync_permit: Arc<Semaphore>,
    tickers: Mutex<Vec<JoinHandle<()>>>,
    debounce_handle: Mutex<Option<JoinHandle<()>>>,
}

impl<T, St, Tr, Cr> SyncOrchestrator<T, St, Tr, Cr>
where
    T: Send + Sync + Clone + 'static,
    St: Store<T> + Send + Sync + 'static,
    Tr: Transport<T> + Send + Sync + 'static,
    Cr: ConflictResolver<T> + Send + Sync + 'static,
{
    pub fn new(store: St, transport: Tr, resolver: Cr, clock: Arc<dyn Clock>, config: SyncConfig) -> Arc<Self> {
        Arc::new(SyncOrchestrator {
            store,
            transport,
            resolver,
            tracker: ChangeTracker::new(clock.clone()),
            clock,
            events: EventBus::new(),
            config,
            last_pull_ts: Mutex::new(0),
            last_push_ts: Mutex::new(0),
            is_online: Mutex::new(false),
            started: AtomicBool::new(false),
            sync_permit: Arc::new(Semaphore::new(1)),
            tickers: Mutex::new(Vec::new()),
            debounce_handle: Mutex::new(None),
        })
    }

    pub fn events(&self) -> &Arc<EventBus<T>> {
        &self.events
    }

    pub fn sync_state(&self) -> SyncState {
        SyncState {
            last_pull_ts: *self.last_pull_ts.lock(),
            last_push_ts: *self.last_push_ts.lock(),
            pending_changes: self.tracker.get_pending_change_count(),
            is_online: *self.is_online.lock(),
            is_syncing: self.sync_permit.available_permits() == 0,
        }
    }

    fn emit_state_changed(&self) {
        self.events.emit(SyncEvent::StateChanged { state: self.sync_state() });
    }

    // ---- lifecycle ----

    /// Idempotent: re-entry while already started is a no-op.
    pub async fn start(self: &Arc<Self>) {
        if self.started.swap(true, Ordering::SeqCst) {
            return;
        }

        let initial_pull_ts = match self.store.get_last_sync_timestamp().await {
            Ok(ts) => ts,
            Err(err) => {
                tracing::warn!(error = %err, "failed to load last sync timestamp; resetting to 0");
                0
            }
        };
        *self.last_pull_ts.lock() = initial_pull_ts;
        *self.last_push_ts.lock() = initial_pull_ts;

        self.probe_online().await;

        if self.config.sync_interval > Duration::ZERO {
            let this = self.clone();
            let interval = self.config.sync_interval;
            let handle = tokio::spawn(async move {
                let mut ticker = tokio::time::interval(interval);
                ticker.tick().await;
                loop {
                    ticker.tick().await;
                    this.sync().await;
                }
            });
            self.tickers.lock().push(handle);
        }

        {
            let this = self.clone();
            let interval = self.config.online_probe_interval;
            let handle = tokio::spawn(async move {
                let mut ticker = tokio::time::interval(interval);
                ticker.tick().await;
                loop {
                    ticker.tick().await;
                    this.probe_online().await;
                }
            });
            self.tickers.lock().push(handle);
        }

        if let Some(mut rx) = self.transport.subscribe_remote_changes().await {
            let this = self.clone();
            let handle = tokio::spawn(async move {
                while let Some(changes) = rx.recv().await {
                    if !this.started.load(Ordering::SeqCst) {
                        break;
                    }
                    for change in changes {
                        this.apply_single_remote_change(change).await;
                    }
                    this.emit_state_changed();
                }
            });
            self.tickers.lock().push(handle);
        }

        if *self.is_online.lock() {
            self.sync().await;
        }
    }

    /// Cancels every ticker and the pending debounce timer, then closes the
    /// store. Calling `start()` again afterwards is legal.
    pub async fn stop(self: &Arc<Self>) {
        self.started.store(false, Ordering::SeqCst);
        for handle in self.tickers.lock().drain(..) {
            handle.abort();
        }
        if let Some(handle) = self.debounce_handle.lock().take() {
            handle.abort();
        }
        if let Err(err) = self.store.close().await {
            tracing::warn!(error = %err, "store close failed during stop");
        }
    }

    async fn probe_online(self: &Arc<Self>) {
        let online = self.transport.is_online().await;
        let was_online = {
            let mut guard = self.is_online.lock();
            let was = *guard;
            *guard = online;
            was
        };

        if online == was_online {
            return;
        }

        if online {
            self.events.emit(SyncEvent::ConnectionOnline);
        } else {
            self.events.emit(SyncEvent::ConnectionOffline);
        }
        self.emit_state_changed();

        if online && !was_online {
            let this = self.clone();
            let delay = self.config.post_online_sync_delay;
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                this.sync().await;
            });
        }
    }

    // ---- local CRUD ----

    pub async fn get(&self, id: &DocumentId) -> SyncResult<Option<Document<T>>> {
        self.store.get(id).await
    }

    pub async fn create(self: &Arc<Self>, data: T, id: Option<DocumentId>) -> SyncResult<Document<T>> {
        let id = id.unwrap_or_else(DocumentId::generate);
        let now = self.clock.now_ms();
        let doc = Document::new(id, data, now);
        self.store.put(doc.clone()).await?;
        self.tracker.record_create(&doc);
        self.events.emit(SyncEvent::DocumentCreated { document: doc.clone() });
        self.schedule_debounced_push();
        Ok(doc)
    }

    /// Idempotent raw write. `previous_version` in the emitted
    /// `DocumentUpdated` event intentionally reports the version just
    /// written, not the prior stored version (a documented imprecision —
    /// see DESIGN.md).
    pub async fn put(self: &Arc<Self>, doc: Document<T>) -> SyncResult<()> {
        self.store.put(doc.clone()).await?;
        self.tracker.record_update(&doc);
        self.events.emit(SyncEvent::DocumentUpdated {
            document: doc.clone(),
            previous_version: doc.version.clone(),
        });
        self.schedule_debounced_push();
        Ok(())
    }

    pub async fn update(self: &Arc<Self>, id: &DocumentId, data: T) -> SyncResult<Option<Document<T>>> {
        let Some(existing) = self.store.get(id).await? else {
            return Ok(None);
        };
        let previous_version = existing.version.clone();
        let now = self.clock.now_ms();
        let next_ts = docsync_core::next_timestamp(now, existing.version.ts);
        let version = Version::new(id.clone(), next_ts);
        let updated = Document::with_version(id.clone(), data, version);

        self.store.put(updated.clone()).await?;
        self.tracker.record_update(&updated);
        self.events.emit(SyncEvent::DocumentUpdated {
            document: updated.clone(),
            previous_version,
        });
        self.schedule_debounced_push();
        Ok(Some(updated))
    }

    pub async fn delete(self: &Arc<Self>, id: &DocumentId) -> SyncResult<bool> {
        let Some(existing) = self.store.get(id).await? else {
            return Ok(false);
        };
        self.store.delete(id).await?;
        self.tracker.record_delete(id.clone(), existing.version.clone());
        self.events.emit(SyncEvent::DocumentDeleted {
            id: id.clone(),
            version: existing.version,
        });
        self.schedule_debounced_push();
        Ok(true)
    }

    fn schedule_debounced_push(self: &Arc<Self>) {
        if let Some(handle) = self.debounce_handle.lock().take() {
            handle.abort();
        }
        let this = self.clone();
        let delay = self.config.debounce_delay;
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            this.push().await;
        });
        *self.debounce_handle.lock() = Some(handle);
    }

    // ---- sync state machine ----

    pub async fn sync(self: &Arc<Self>) {
        self.pull().await;
        self.push().await;
    }

    pub async fn pull(self: &Arc<Self>) {
        if !*self.is_online.lock() {
            return;
        }
        let Ok(permit) = self.sync_permit.clone().try_acquire_owned() else {
            return;
        };

        self.events.emit(SyncEvent::SyncStarted { kind: SyncKind::Pull });
        let since = *self.last_pull_ts.lock();
        let attempts = self.config.retry_attempts;
        let delay = self.config.retry_delay;

        let result = retry_with_backoff(attempts, delay, || async {
            let result = self.transport.pull(since).await?;
            if !result.success {
                return Err(SyncError::Transport(
                    result.error.unwrap_or_else(|| "pull returned success=false".into()),
                ));
            }
            Ok(result)
        })
        .await;

        match result {
            Ok(PullResult { changes, timestamp, .. }) => {
                let count = changes.len();
                for change in changes {
                    self.apply_single_remote_change(change).await;
                }
                *self.last_pull_ts.lock() = timestamp;
                if let Err(err) = self.store.set_last_sync_timestamp(timestamp).await {
                    tracing::warn!(error = %err, "failed to persist last pull timestamp");
                }
                self.events.emit(SyncEvent::SyncCompleted {
                    kind: SyncKind::Pull,
                    change_count: count,
                });
            }
            Err(err) => {
                self.events.emit(SyncEvent::SyncFailed {
                    kind: SyncKind::Pull,
                    error: err.to_string(),
                });
            }
        }

        drop(permit);
        self.emit_state_changed();
    }

    pub async fn push(self: &Arc<Self>) {
        if !*self.is_online.lock() || !self.tracker.has_pending_changes() {
            return;
        }
        let Ok(permit) = self.sync_permit.clone().try_acquire_owned() else {
            return;
        };

        self.events.emit(SyncEvent::SyncStarted { kind: SyncKind::Push });

        let pending = self.tracker.get_pending_changes();
        let batch_len = pending.len().min(self.config.batch_size);
        let batch: Vec<ChangeRecord<T>> = pending.into_iter().take(batch_len).collect();
        let last_sync_ts = Some(*self.last_push_ts.lock());
        let cutoff = batch.iter().map(|c| c.local_ts).max().map(|ts| ts + 1);

        let attempts = self.config.retry_attempts;
        let delay = self.config.retry_delay;
        let result = retry_with_backoff(attempts, delay, || {
            let changes = batch.clone();
            async {
                let result = self
                    .transport
                    .push(ChangeBatch {
                        changes,
                        last_sync_ts,
                    })
                    .await?;
                if !result.success {
                    return Err(SyncError::Transport(
                        result.error.clone().unwrap_or_else(|| "push returned success=false".into()),
                    ));
                }
                Ok(result)
            }
        })
        .await;

        match result {
            Ok(PushResult { conflicts, timestamp, .. }) => {
                for conflict in conflicts {
                    self.resolve_and_apply_conflict(conflict).await;
                }
                if let Some(cutoff) = cutoff {
                    self.tracker.clear_changes_before(cutoff);
                }
                if let Some(ts) = timestamp {
                    *self.last_push_ts.lock() = ts;
                    if let Err(err) = self.store.set_last_sync_timestamp(ts).await {
                        tracing::warn!(error = %err, "failed to persist last push timestamp");
                    }
                }
                self.events.emit(SyncEvent::SyncCompleted {
                    kind: SyncKind::Push,
                    change_count: batch_len,
                });
            }
            Err(err) => {
                self.events.emit(SyncEvent::SyncFailed {
                    kind: SyncKind::Push,
                    error: err.to_string(),
                });
            }
        }

        drop(permit);
        self.emit_state_changed();
    }

    // ---- applying remote changes ----

    async fn apply_single_remote_change(self: &Arc<Self>, change: ChangeRecord<T>) {
        let outcome: SyncResult<()> = async {
            match change.op {
                ChangeOp::Delete => {
                    self.store.delete(&change.id).await?;
                }
                ChangeOp::Create | ChangeOp::Update => {
                    let local = self.store.get(&change.id).await?;
                    if let Some(local) = &local {
                        if local.version.ts > change.version.ts {
                            let conflict = ConflictInfo {
                                document_id: change.id.clone(),
                                local_version: local.version.clone(),
                                remote_version: change.version.clone(),
                                local_data: Some(local.data.clone()),
                                remote_data: change.data.clone(),
                            };
                            self.resolve_and_apply_conflict(conflict).await;
                            return Ok(());
                        }
                    }
                    let data = change.data.clone().ok_or_else(|| {
                        SyncError::Other(format!("remote {:?} for {} carried no data", change.op, change.id))
                    })?;
                    let doc = Document::with_version(change.id.clone(), data, change.version.clone());
                    self.store.put(doc).await?;
                }
            }
            Ok(())
        }
        .await;

        if let Err(err) = outcome {
            self.events.emit(SyncEvent::SyncFailed {
                kind: SyncKind::Pull,
                error: format!("failed to apply remote change for {}: {err}", change.id),
            });
        }
    }

    // ---- conflict resolution ----

    async fn resolve_and_apply_conflict(self: &Arc<Self>, conflict: ConflictInfo<T>) {
        let id = conflict.document_id.clone();
        self.events.emit(SyncEvent::ConflictDetected { conflict: conflict.clone() });

        let max_ts = conflict.local_version.ts.max(conflict.remote_version.ts);
        let resolution = match self.resolver.resolve(conflict).await {
            Ok(resolution) => resolution,
            Err(err) => {
                self.events.emit(SyncEvent::SyncFailed {
                    kind: SyncKind::Push,
                    error: format!("Failed to resolve conflict for {id}: {err}"),
                });
                return;
            }
        };

        if let Err(err) = self.write_resolution(&id, resolution.clone(), max_ts).await {
            self.events.emit(SyncEvent::SyncFailed {
                kind: SyncKind::Push,
                error: format!("Failed to resolve conflict for {id}: {err}"),
            });
            return;
        }

        self.events.emit(SyncEvent::ConflictResolved { id, resolution });
    }

    /// Clamps `resolution.resolved_version.ts` up to `floor` if the resolver
    /// returned something lower, preserving the monotonicity invariant
    /// instead of rejecting the resolver's output outright.
    async fn write_resolution(
        self: &Arc<Self>,
        id: &DocumentId,
        mut resolution: docsync_core::ConflictResolution<T>,
        floor: Timestamp,
    ) -> SyncResult<()> {
        if resolution.resolved_version.ts < floor {
            resolution.resolved_version = Version::new(id.clone(), floor);
        }

        match resolution.resolved_data {
            Some(data) => {
                let doc = Document::with_version(id.clone(), data, resolution.resolved_version.clone());
                self.store.put(doc.clone()).await?;
                self.tracker.record_update(&doc);
            }
            None => {
                self.store.delete(id).await?;
                self.tracker.record_delete(id.clone(), resolution.resolved_version);
            }
        }
        Ok(())
    }
}

/// Real-time remote change channel type, re-exported for transports that
/// implement `Transport::subscribe_remote_changes`.
pub type RemoteChangeReceiver<T> = mpsc::Receiver<Vec<ChangeRecord<T>>>;
