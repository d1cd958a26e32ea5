//! The sync orchestrator: the pull/push/apply/resolve state machine that
//! coordinates local document CRUD, the pending-change log, and scheduled
//! sync against the injected `Store`/`Transport`/`ConflictResolver`
//! capabilities from `docsync-core`.

mod config;
mod orchestrator;
mod retry;

pub use config::SyncConfig;
pub use orchestrator::{RemoteChangeReceiver, SyncOrchestrator};
