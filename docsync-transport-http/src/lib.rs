//! Reference `Transport` implementation speaking the plain JSON protocol a
//! `docsync-server`-compatible endpoint exposes: `GET /sync/pull`,
//! `POST /sync/push`, `GET /health`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use docsync_core::{ChangeBatch, ChangeRecord, ConflictInfo, PullResult, PushResult, SyncError, SyncResult, Timestamp, Transport};

const DEFAULT_TIMEOUT: Duration = Duration::from_millis(30_000);
const HEALTH_TIMEOUT: Duration = Duration::from_millis(5_000);

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound(serialize = "T: Serialize", deserialize = "T: DeserializeOwned"))]
struct WirePullResponse<T> {
    success: bool,
    #[serde(default = "Vec::new")]
    changes: Vec<ChangeRecord<T>>,
    timestamp: Timestamp,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound(serialize = "T: Serialize", deserialize = "T: DeserializeOwned"))]
struct WirePushResponse<T> {
    success: bool,
    #[serde(default = "Vec::new")]
    conflicts: Vec<ConflictInfo<T>>,
    #[serde(default)]
    timestamp: Option<Timestamp>,
    #[serde(default)]
    error: Option<String>,
}

/// Extra per-request customization beyond the `Authorization` bearer
/// header — e.g. a tenant id — applied to every request this transport
/// issues.
pub type ExtraHeaders = Vec<(String, String)>;

/// HTTP `Transport<T>` over `reqwest`. One instance per remote endpoint;
/// cheap to clone (the underlying `reqwest::Client` is reference-counted).
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    extra_headers: ExtraHeaders,
}

impl HttpTransport {
    pub fn new(base_url: impl Into<String>) -> Self {
        HttpTransport {
            client: Client::new(),
            base_url: base_url.into(),
            api_key: None,
            extra_headers: Vec::new(),
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_extra_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra_headers.push((name.into(), value.into()));
        self
    }

    fn apply_headers(&self, mut req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }
        for (name, value) in &self.extra_headers {
            req = req.header(name, value);
        }
        req
    }
}

#[async_trait]
impl<T> Transport<T> for HttpTransport
where
    T: Send + Sync + Clone + Serialize + DeserializeOwned,
{
    async fn push(&self, batch: ChangeBatch<T>) -> SyncResult<PushResult<T>> {
        let url = format!("{}/sync/push", self.base_url);
        let req = self
            .apply_headers(self.client.post(&url).timeout(DEFAULT_TIMEOUT))
            .json(&batch);

        let response = req.send().await.map_err(|e| SyncError::Transport(e.to_string()))?;
        let wire: WirePushResponse<T> = response
            .error_for_status()
            .map_err(|e| SyncError::Transport(e.to_string()))?
            .json()
            .await
            .map_err(|e| SyncError::Serialization(e.to_string()))?;

        Ok(PushResult {
            success: wire.success,
            conflicts: wire.conflicts,
            error: wire.error,
            timestamp: wire.timestamp,
        })
    }

    async fn pull(&self, since: Timestamp) -> SyncResult<PullResult<T>> {
        let url = format!("{}/sync/pull", self.base_url);
        let req = self
            .apply_headers(self.client.get(&url).timeout(DEFAULT_TIMEOUT))
            .query(&[("since", since)]);

        let response = req.send().await.map_err(|e| SyncError::Transport(e.to_string()))?;
        let wire: WirePullResponse<T> = response
            .error_for_status()
            .map_err(|e| SyncError::Transport(e.to_string()))?
            .json()
            .await
            .map_err(|e| SyncError::Serialization(e.to_string()))?;

        Ok(PullResult {
            success: wire.success,
            changes: wire.changes,
            timestamp: wire.timestamp,
            error: wire.error,
        })
    }

    async fn is_online(&self) -> bool {
        let url = format!("{}/health", self.base_url);
        let req = self.apply_headers(self.client.get(&url).timeout(HEALTH_TIMEOUT));
        matches!(req.send().await, Ok(response) if response.status().is_success())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{extract::Query, routing::get, Json, Router};
    use docsync_core::{ChangeOp, DocumentId, Version};
    use std::collections::HashMap;
    use std::net::SocketAddr;
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    async fn pull_handler(Query(params): Query<HashMap<String, String>>) -> Json<WirePullResponse<String>> {
        let since: Timestamp = params.get("since").and_then(|s| s.parse().ok()).unwrap_or(0);
        Json(WirePullResponse {
            success: true,
            changes: vec![ChangeRecord {
                id: DocumentId::new("r"),
                op: ChangeOp::Create,
                data: Some("remote".to_string()),
                version: Version::new(DocumentId::new("r"), since + 1),
                local_ts: since + 1,
            }],
            timestamp: since + 1,
            error: None,
        })
    }

    async fn health_handler() -> &'static str {
        "ok"
    }

    async fn serve(router: Router) -> (SocketAddr, JoinHandle<()>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            axum::serve(listener, router.into_make_service()).await.unwrap();
        });
        (addr, handle)
    }

    #[tokio::test]
    async fn pull_deserializes_the_wire_response() {
        let app = Router::new().route("/sync/pull", get(pull_handler));
        let (addr, _handle) = serve(app).await;

        let transport = HttpTransport::new(format!("http://{addr}"));
        let result = transport.pull(10).await.unwrap();

        assert!(result.success);
        assert_eq!(result.timestamp, 11);
        assert_eq!(result.changes.len(), 1);
        assert_eq!(result.changes[0].data, Some("remote".to_string()));
    }

    #[tokio::test]
    async fn is_online_reflects_health_status() {
        let app = Router::new().route("/health", get(health_handler));
        let (addr, _handle) = serve(app).await;

        let transport = HttpTransport::new(format!("http://{addr}"));
        assert!(transport.is_online().await);
    }

    #[tokio::test]
    async fn is_online_is_false_when_unreachable() {
        let transport = HttpTransport::new("http://127.0.0.1:1");
        assert!(!transport.is_online().await);
    }
}
