//! Core data model and capability contracts for the offline-first document
//! sync engine: versioned documents, the pending-change log, pointwise
//! conflict resolution, a typed event bus, and the `Store`/`Transport`
//! capabilities the orchestrator (in `docsync-engine`) coordinates.
//!
//! This crate has no opinion on how documents get to disk or over the
//! wire — those are the injected `Store` and `Transport` capabilities.

mod change;
mod clock;
mod document;
mod error;
mod events;
mod resolver;
mod state;
mod store;
mod transport;
mod version;

pub use change::{ChangeBatch, ChangeOp, ChangeRecord, ChangeTracker, ChangeTrackerSnapshot};
pub use clock::{Clock, SystemClock};
pub use document::{next_timestamp, Document};
pub use error::{SyncError, SyncResult};
pub use events::{EventBus, Subscription, SyncEvent, SyncEventKind, SyncKind};
pub use resolver::{ConflictInfo, ConflictResolution, ConflictResolver, LastWriteWins, MergeWithFallback};
pub use state::SyncState;
pub use store::Store;
pub use transport::{PullResult, PushResult, Transport};
pub use version::{DocumentId, Timestamp, Version};
