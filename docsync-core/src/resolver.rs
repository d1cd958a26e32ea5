use std::marker::PhantomData;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::error::SyncError;
use crate::version::{DocumentId, Timestamp, Version};

/// A side-by-side choice the orchestrator needs made, either because the
/// server reported divergence or because an incoming remote version is
/// older than the local head.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound(serialize = "T: Serialize", deserialize = "T: DeserializeOwned"))]
pub struct ConflictInfo<T> {
    pub document_id: DocumentId,
    pub local_version: Version,
    pub remote_version: Version,
    pub local_data: Option<T>,
    pub remote_data: Option<T>,
}

/// The resolver's verdict. `resolved_version.ts` must be `>= max(local.ts,
/// remote.ts)` — callers clamp or reject at write time rather than trust
/// the resolver blindly; see `SyncOrchestrator::write_resolution`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound(serialize = "T: Serialize", deserialize = "T: DeserializeOwned"))]
pub struct ConflictResolution<T> {
    pub resolved_data: Option<T>,
    pub resolved_version: Version,
}

/// Pointwise conflict resolution contract. `resolve` may suspend (it can
/// call out to a user merge function, prompt a user, etc.) so it is async
/// rather than a plain closure.
#[async_trait]
pub trait ConflictResolver<T>: Send + Sync
where
    T: Send + Sync + Clone,
{
    async fn resolve(&self, conflict: ConflictInfo<T>) -> Result<ConflictResolution<T>, SyncError>;
}

/// Default resolver: greater timestamp wins; ties are broken by the
/// lexicographically greater id. The chosen side's version is returned
/// verbatim — LWW never invents a new version.
#[derive(Debug, Default, Clone, Copy)]
pub struct LastWriteWins;

#[async_trait]
impl<T> ConflictResolver<T> for LastWriteWins
where
    T: Send + Sync + Clone,
{
    async fn resolve(&self, conflict: ConflictInfo<T>) -> Result<ConflictResolution<T>, SyncError> {
        let remote_wins = match conflict.remote_version.ts.cmp(&conflict.local_version.ts) {
            std::cmp::Ordering::Greater => true,
            std::cmp::Ordering::Less => false,
            std::cmp::Ordering::Equal => conflict.remote_version.id > conflict.local_version.id,
        };

        Ok(if remote_wins {
            ConflictResolution {
                resolved_data: conflict.remote_data,
                resolved_version: conflict.remote_version,
            }
        } else {
            ConflictResolution {
                resolved_data: conflict.local_data,
                resolved_version: conflict.local_version,
            }
        })
    }
}

/// Runs a user merge function; on success, synthesizes a version with
/// `ts = max(local.ts, remote.ts)`. On failure or a `None` merge result,
/// delegates to the fallback resolver instead of guessing.
pub struct MergeWithFallback<T, F, R> {
    merge_fn: F,
    fallback: R,
    _marker: PhantomData<T>,
}

impl<T, F, R> MergeWithFallback<T, F, R>
where
    F: Fn(&T, &T) -> Option<T> + Send + Sync,
    R: ConflictResolver<T>,
{
    pub fn new(merge_fn: F, fallback: R) -> Self {
        MergeWithFallback {
            merge_fn,
            fallback,
            _marker: PhantomData,
        }
    }

    fn synthesize_version(id: &DocumentId, local_ts: Timestamp, remote_ts: Timestamp) -> Version {
        Version::new(id.clone(), local_ts.max(remote_ts))
    }
}

#[async_trait]
impl<T, F, R> ConflictResolver<T> for MergeWithFallback<T, F, R>
where
    T: Send + Sync + Clone,
    F: Fn(&T, &T) -> Option<T> + Send + Sync,
    R: ConflictResolver<T> + Send + Sync,
{
    async fn resolve(&self, conflict: ConflictInfo<T>) -> Result<ConflictResolution<T>, SyncError> {
        if let (Some(local), Some(remote)) = (&conflict.local_data, &conflict.remote_data) {
            if let Some(merged) = (self.merge_fn)(local, remote) {
                let version = Self::synthesize_version(
                    &conflict.document_id,
                    conflict.local_version.ts,
                    conflict.remote_version.ts,
                );
                return Ok(ConflictResolution {
                    resolved_data: Some(merged),
                    resolved_version: version,
                });
            }
        }
        self.fallback.resolve(conflict).await
    }
}
