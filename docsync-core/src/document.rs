use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::version::{DocumentId, Timestamp, Version};

/// A versioned document. `version.id` always equals `id` — enforced by
/// construction rather than trusted, since the two are computed from the
/// same call site everywhere in this crate.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound(serialize = "T: Serialize", deserialize = "T: DeserializeOwned"))]
pub struct Document<T> {
    pub id: DocumentId,
    pub data: T,
    pub version: Version,
    pub deleted: bool,
}

impl<T> Document<T> {
    pub fn new(id: DocumentId, data: T, ts: Timestamp) -> Self {
        let version = Version::new(id.clone(), ts);
        Document {
            id,
            data,
            version,
            deleted: false,
        }
    }

    pub fn with_version(id: DocumentId, data: T, version: Version) -> Self {
        debug_assert_eq!(version.id, id, "version.id must match document id");
        Document {
            id,
            data,
            version,
            deleted: false,
        }
    }

    pub fn tombstone(id: DocumentId, data: T, version: Version) -> Self {
        debug_assert_eq!(version.id, id, "version.id must match document id");
        Document {
            id,
            data,
            version,
            deleted: true,
        }
    }
}

/// Compute a successor timestamp that is guaranteed strictly greater than
/// `prior`: if wall-clock `now` would not advance past `prior`, fall back
/// to `prior + 1` rather than stalling or silently reusing a version.
pub fn next_timestamp(now: Timestamp, prior: Timestamp) -> Timestamp {
    if now > prior {
        now
    } else {
        prior + 1
    }
}
