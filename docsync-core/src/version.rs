use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Millisecond-resolution wall clock reading. Not guaranteed monotonic on
/// its own — callers that need monotonicity (new document versions) apply
/// the defense in `document::next_version`.
pub type Timestamp = u64;

/// Opaque, stable document identity. Never re-validated beyond "not empty"
/// at construction; callers that synthesize ids (`SyncOrchestrator::create`)
/// use `DocumentId::generate`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DocumentId(String);

impl DocumentId {
    pub fn new<T: Into<String>>(value: T) -> Self {
        DocumentId(value.into())
    }

    pub fn generate() -> Self {
        DocumentId(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DocumentId {
    fn from(value: &str) -> Self {
        DocumentId::new(value)
    }
}

impl From<String> for DocumentId {
    fn from(value: String) -> Self {
        DocumentId::new(value)
    }
}

/// A `(timestamp, id)` pair providing a deterministic total order. Two
/// writers stamping the same millisecond are broken by id, so conflict
/// resolution is reproducible across clients.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Version {
    pub id: DocumentId,
    pub ts: Timestamp,
}

impl Version {
    pub fn new(id: DocumentId, ts: Timestamp) -> Self {
        Version { id, ts }
    }

    /// Returns -1/0/+1: first by `ts`, then lexicographically by `id`.
    pub fn compare(a: &Version, b: &Version) -> i8 {
        match a.cmp(b) {
            Ordering::Less => -1,
            Ordering::Equal => 0,
            Ordering::Greater => 1,
        }
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.ts.cmp(&other.ts).then_with(|| self.id.cmp(&other.id))
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
