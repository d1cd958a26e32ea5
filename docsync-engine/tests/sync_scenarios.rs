mod support;

use std::sync::Arc;
use std::time::Duration;

use docsync_core::{ChangeOp, ChangeRecord, Document, DocumentId, LastWriteWins, Store, SyncEventKind, Version};
use docsync_engine::{SyncConfig, SyncOrchestrator};
use support::{EventLog, MemoryStore, MockTransport, Payload, TestClock};

type Engine = SyncOrchestrator<Payload, Arc<MemoryStore>, Arc<MockTransport>, LastWriteWins>;

fn test_config() -> SyncConfig {
    SyncConfig::default()
        .with_sync_interval(Duration::ZERO)
        .with_debounce_delay(Duration::from_millis(10))
        .with_retry_delay(Duration::from_millis(5))
        .with_online_probe_interval(Duration::from_secs(3600))
}

fn orchestrator(online: bool, config: SyncConfig) -> (Arc<Engine>, Arc<MemoryStore>, Arc<MockTransport>) {
    let store = MemoryStore::new();
    let transport = MockTransport::new(online);
    let clock = TestClock::new(1_000);
    let engine = SyncOrchestrator::new(store.clone(), transport.clone(), LastWriteWins, clock, config);
    (engine, store, transport)
}

fn subscribe_all(engine: &Arc<Engine>, log: &Arc<EventLog>) {
    for kind in [
        SyncEventKind::DocumentCreated,
        SyncEventKind::DocumentUpdated,
        SyncEventKind::DocumentDeleted,
        SyncEventKind::SyncStarted,
        SyncEventKind::SyncCompleted,
        SyncEventKind::SyncFailed,
        SyncEventKind::ConflictDetected,
        SyncEventKind::ConflictResolved,
        SyncEventKind::ConnectionOnline,
        SyncEventKind::ConnectionOffline,
    ] {
        let log = log.clone();
        std::mem::forget(engine.events().on(kind, move |event| {
            log.push(format!("{:?}", event.kind()));
        }));
    }
}

// S1 — create/update/delete produces the matching event sequence and three
// pending changes, with no sync ever invoked.
#[tokio::test]
async fn create_update_delete_event_sequence() {
    let (engine, _store, _transport) = orchestrator(true, test_config());
    let log = EventLog::new();
    subscribe_all(&engine, &log);

    let doc = engine.create(Payload::new("x"), None).await.unwrap();
    engine.update(&doc.id, Payload::new("y")).await.unwrap();
    engine.delete(&doc.id).await.unwrap();

    assert_eq!(
        log.snapshot(),
        vec!["DocumentCreated", "DocumentUpdated", "DocumentDeleted"]
    );
    assert_eq!(engine.sync_state().pending_changes, 3);
}

// S2 — push drains the pending queue built up by three mutations.
#[tokio::test]
async fn push_drains_pending_queue() {
    let (engine, store, transport) = orchestrator(true, test_config());
    let log = EventLog::new();
    subscribe_all(&engine, &log);
    transport.set_push_timestamp(5_000);

    let doc = engine.create(Payload::new("a"), None).await.unwrap();
    engine.update(&doc.id, Payload::new("b")).await.unwrap();
    engine.delete(&doc.id).await.unwrap();

    engine.push().await;

    assert_eq!(engine.sync_state().pending_changes, 0);
    assert_eq!(engine.sync_state().last_push_ts, 5_000);
    assert_eq!(store.get_last_sync_timestamp().await.unwrap(), 5_000);
    assert!(log.snapshot().contains(&"SyncCompleted".to_string()));
}

// S3 — pull applies a remote create and advances last_pull_ts.
#[tokio::test]
async fn pull_applies_remote_create() {
    let (engine, _store, transport) = orchestrator(true, test_config());

    let remote_id = DocumentId::new("r");
    let version = Version::new(remote_id.clone(), 11_000);
    transport.queue_remote_change(
        ChangeRecord {
            id: remote_id.clone(),
            op: ChangeOp::Create,
            data: Some(Payload::new("R")),
            version,
            local_ts: 11_000,
        },
        11_000,
    );

    engine.pull().await;

    let fetched = engine.get(&remote_id).await.unwrap().expect("remote doc applied");
    assert_eq!(fetched.data, Payload::new("R"));
    assert_eq!(engine.sync_state().last_pull_ts, 11_000);
}

// S4 — offline queues a change; once online, the probe ticker notices the
// transition and the scheduled post-online sync drains the queue.
#[tokio::test(start_paused = true)]
async fn offline_queues_then_drains_once_online() {
    let config = test_config()
        .with_online_probe_interval(Duration::from_millis(50))
        .with_post_online_sync_delay(Duration::from_millis(20));
    let (engine, _store, transport) = orchestrator(false, config);

    engine.start().await;
    engine.create(Payload::new("offline"), None).await.unwrap();

    tokio::time::advance(Duration::from_millis(15)).await;
    assert_eq!(engine.sync_state().pending_changes, 1);
    assert!(!engine.sync_state().is_online);

    transport.set_online(true);
    transport.set_push_timestamp(20_000);

    // Past the probe interval: the ticker observes the offline->online
    // transition and schedules a sync after post_online_sync_delay.
    tokio::time::advance(Duration::from_millis(60)).await;
    tokio::task::yield_now().await;

    // Past the scheduled delay: the sync runs and drains the queue.
    tokio::time::advance(Duration::from_millis(40)).await;
    tokio::task::yield_now().await;

    assert_eq!(engine.sync_state().pending_changes, 0);
    engine.stop().await;
}

// S5 — a push failure leaves the pending change in the queue.
#[tokio::test]
async fn push_failure_retains_pending_change() {
    let (engine, _store, transport) = orchestrator(true, test_config());
    let log = EventLog::new();
    subscribe_all(&engine, &log);
    transport.set_fail_push(true);

    engine.create(Payload::new("keep"), None).await.unwrap();
    engine.push().await;

    assert!(log.snapshot().contains(&"SyncFailed".to_string()));
    assert_eq!(engine.sync_state().pending_changes, 1);
}

// S6 — local-newer-vs-remote conflict is resolved in favor of local data by
// LWW, and the resolution is re-queued as a pending update.
#[tokio::test]
async fn local_newer_conflict_resolved_by_lww() {
    let (engine, store, transport) = orchestrator(true, test_config());
    let log = EventLog::new();
    subscribe_all(&engine, &log);

    let id = DocumentId::new("x");
    let local_version = Version::new(id.clone(), 200);
    store.seed(Document::with_version(id.clone(), Payload::new("local"), local_version));

    transport.queue_remote_change(
        ChangeRecord {
            id: id.clone(),
            op: ChangeOp::Update,
            data: Some(Payload::new("remote")),
            version: Version::new(id.clone(), 100),
            local_ts: 100,
        },
        150,
    );

    engine.pull().await;

    assert_eq!(
        log.snapshot(),
        vec!["SyncStarted", "ConflictDetected", "ConflictResolved", "SyncCompleted", "StateChanged"]
    );
    let doc = engine.get(&id).await.unwrap().unwrap();
    assert_eq!(doc.data, Payload::new("local"));
    assert!(engine.sync_state().pending_changes >= 1);
}
