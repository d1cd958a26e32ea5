//! Worked example: wires a `MemoryStore`, the reqwest-backed `HttpTransport`,
//! and `LastWriteWins` behind the `SyncOrchestrator`, then exposes a handful
//! of CRUD/sync subcommands. Each invocation is a fresh process — state
//! lives only in the remote `docsync-server`, not locally, since the memory
//! store holds nothing across runs. A real client would pair the
//! orchestrator with a persistent `Store` instead.

use std::error::Error;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use console::style;
use serde_json::Value;

use docsync_core::{Document, DocumentId, LastWriteWins, SyncState, SystemClock};
use docsync_engine::{SyncConfig, SyncOrchestrator};
use docsync_store_memory::MemoryStore;
use docsync_transport_http::HttpTransport;

type Engine = SyncOrchestrator<Value, MemoryStore<Value>, HttpTransport, LastWriteWins>;

#[derive(Parser)]
#[command(name = "docsync", about = "docsync worked-example CLI")]
struct Cli {
    /// Base URL of a docsync-server-compatible endpoint.
    #[arg(long, default_value = "http://localhost:8080")]
    server: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create a document from a JSON payload and push it immediately.
    Create {
        /// JSON-encoded document body, e.g. '{"name":"todo"}'.
        data: String,
        /// Explicit document id; generated if omitted.
        #[arg(long)]
        id: Option<String>,
    },
    /// Read a document by id from local state.
    Get { id: String },
    /// Replace a document's data, bumping its version, and push it.
    Update { id: String, data: String },
    /// Soft-delete a document and push the tombstone.
    Delete { id: String },
    /// Run one pull/push cycle immediately.
    Sync,
    /// Print the current `SyncState` snapshot.
    Status,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt::try_init().ok();

    let cli = Cli::parse();
    let engine = build_engine(&cli.server);
    engine.start().await;

    let outcome = run_command(&engine, cli.command).await;
    engine.stop().await;
    outcome
}

fn build_engine(server: &str) -> Arc<Engine> {
    let store = MemoryStore::new();
    let transport = HttpTransport::new(server);
    let clock = Arc::new(SystemClock);
    SyncOrchestrator::new(store, transport, LastWriteWins, clock, SyncConfig::default())
}

async fn run_command(engine: &Arc<Engine>, command: Command) -> Result<(), Box<dyn Error>> {
    match command {
        Command::Create { data, id } => {
            let payload: Value = serde_json::from_str(&data)?;
            let doc = engine.create(payload, id.map(DocumentId::new)).await?;
            engine.push().await;
            print_document(&doc);
        }
        Command::Get { id } => match engine.get(&DocumentId::new(id)).await? {
            Some(doc) => print_document(&doc),
            None => println!("{}", style("not found").yellow()),
        },
        Command::Update { id, data } => {
            let payload: Value = serde_json::from_str(&data)?;
            match engine.update(&DocumentId::new(id.clone()), payload).await? {
                Some(doc) => {
                    engine.push().await;
                    print_document(&doc);
                }
                None => println!("{}: {}", style("not found").yellow(), id),
            }
        }
        Command::Delete { id } => {
            let deleted = engine.delete(&DocumentId::new(id.clone())).await?;
            if deleted {
                engine.push().await;
                println!("{} {}", style("deleted").red(), id);
            } else {
                println!("{}: {}", style("not found").yellow(), id);
            }
        }
        Command::Sync => {
            engine.sync().await;
            print_state(&engine.sync_state());
        }
        Command::Status => {
            print_state(&engine.sync_state());
        }
    }
    Ok(())
}

fn print_document(doc: &Document<Value>) {
    println!(
        "{} id={} ts={} data={}",
        style("document").green(),
        doc.id,
        doc.version.ts,
        doc.data
    );
}

fn print_state(state: &SyncState) {
    println!(
        "{} online={} syncing={} pending={} last_pull={} last_push={}",
        style("sync-state").cyan(),
        state.is_online,
        state.is_syncing,
        state.pending_changes,
        state.last_pull_ts,
        state.last_push_ts
    );
}
