//! Reference implementation of the docsync wire protocol: `GET /health`,
//! `GET /sync/pull?since=`, `POST /sync/push`. Backed by nothing but a
//! `HashMap` plus an append-only change log — good enough to exercise
//! `docsync-transport-http` end to end, not a production sync backend.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use clap::Parser;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use docsync_core::{ChangeBatch, ChangeOp, ChangeRecord, ConflictInfo, Document, DocumentId, Timestamp, Version};

#[derive(Parser)]
#[command(name = "docsync-server", about = "Reference docsync wire-protocol server")]
struct Cli {
    /// Address to bind, e.g. 0.0.0.0:8080.
    #[arg(long, default_value = "0.0.0.0:8080")]
    addr: SocketAddr,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WirePullResponse {
    success: bool,
    changes: Vec<ChangeRecord<Value>>,
    timestamp: Timestamp,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WirePushResponse {
    success: bool,
    #[serde(default)]
    conflicts: Vec<ConflictInfo<Value>>,
    #[serde(default)]
    timestamp: Option<Timestamp>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PullQuery {
    #[serde(default)]
    since: Timestamp,
}

/// Everything the server knows: the current document set and the
/// append-only log of applied changes, ordered by the server's own
/// revision counter (distinct from any client-supplied version).
#[derive(Default)]
struct Backend {
    docs: HashMap<DocumentId, Document<Value>>,
    log: Vec<ChangeRecord<Value>>,
}

struct AppState {
    backend: Mutex<Backend>,
    revision: AtomicU64,
}

impl AppState {
    fn new() -> Arc<Self> {
        Arc::new(AppState {
            backend: Mutex::new(Backend::default()),
            revision: AtomicU64::new(0),
        })
    }

    fn next_revision(&self) -> Timestamp {
        self.revision.fetch_add(1, Ordering::SeqCst) + 1
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let state = AppState::new();

    let app = Router::new()
        .route("/health", get(health))
        .route("/sync/pull", get(pull))
        .route("/sync/push", post(push))
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(cli.addr).await.expect("bind listen address");
    tracing::info!(addr = %cli.addr, "docsync-server listening");
    axum::serve(listener, app.into_make_service()).await.expect("server crashed");
}

async fn health() -> &'static str {
    "ok"
}

async fn pull(State(state): State<Arc<AppState>>, Query(query): Query<PullQuery>) -> Json<WirePullResponse> {
    let backend = state.backend.lock();
    let changes: Vec<ChangeRecord<Value>> = backend
        .log
        .iter()
        .filter(|c| c.local_ts > query.since)
        .cloned()
        .collect();
    let timestamp = backend.log.last().map(|c| c.local_ts).unwrap_or(query.since);
    drop(backend);

    tracing::debug!(since = query.since, returned = changes.len(), "pull served");
    Json(WirePullResponse {
        success: true,
        changes,
        timestamp,
        error: None,
    })
}

async fn push(
    State(state): State<Arc<AppState>>,
    Json(batch): Json<ChangeBatch<Value>>,
) -> Result<Json<WirePushResponse>, (StatusCode, Json<WirePushResponse>)> {
    let mut backend = state.backend.lock();
    let mut conflicts = Vec::new();
    let mut applied = 0usize;

    for change in &batch.changes {
        if let Some(existing) = backend.docs.get(&change.id) {
            if existing.version.ts > change.version.ts {
                conflicts.push(ConflictInfo {
                    document_id: change.id.clone(),
                    local_version: change.version.clone(),
                    remote_version: existing.version.clone(),
                    local_data: change.data.clone(),
                    remote_data: Some(existing.data.clone()),
                });
                continue;
            }
        }

        match change.op {
            ChangeOp::Delete => {
                backend.docs.remove(&change.id);
            }
            ChangeOp::Create | ChangeOp::Update => {
                let Some(data) = change.data.clone() else {
                    return Err((
                        StatusCode::BAD_REQUEST,
                        Json(WirePushResponse {
                            success: false,
                            conflicts: Vec::new(),
                            timestamp: None,
                            error: Some(format!("{:?} for {} carried no data", change.op, change.id)),
                        }),
                    ));
                };
                let doc = Document::with_version(change.id.clone(), data, change.version.clone());
                backend.docs.insert(change.id.clone(), doc);
            }
        }

        let revision = state.next_revision();
        let mut recorded = change.clone();
        recorded.local_ts = revision;
        backend.log.push(recorded);
        applied += 1;
    }

    let timestamp = backend.log.last().map(|c| c.local_ts);
    let conflict_count = conflicts.len();
    drop(backend);

    tracing::info!(applied, conflicts = conflict_count, "push applied");
    Ok(Json(WirePushResponse {
        success: true,
        conflicts,
        timestamp,
        error: None,
    }))
}
