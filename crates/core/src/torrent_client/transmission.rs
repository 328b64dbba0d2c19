//! Transmission RPC client implementation.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::config::TransmissionConfig;

use super::{Item, ItemStats, SessionStats, TorrentClient, TorrentClientError, TransferStats};

/// Header carrying Transmission's CSRF token.
const SESSION_HEADER: &str = "X-Transmission-Session-Id";

/// Fields requested by `torrent-get`.
const ITEM_FIELDS: &[&str] = &["id", "hashString", "name", "downloadDir", "labels", "trackers"];

/// Fields requested by `torrent-get` for transfer stats.
const STATS_FIELDS: &[&str] = &[
    "id",
    "hashString",
    "name",
    "status",
    "labels",
    "uploadedEver",
    "downloadedEver",
];

/// Transmission client implementation.
pub struct TransmissionClient {
    client: Client,
    config: TransmissionConfig,
    /// Session id handed out by the daemon (refreshed on HTTP 409).
    session: Arc<RwLock<Option<String>>>,
}

impl TransmissionClient {
    /// Create a new Transmission client.
    pub fn new(config: TransmissionConfig) -> Result<Self, TorrentClientError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs as u64))
            .build()
            .map_err(|e| TorrentClientError::ConnectionFailed(e.to_string()))?;

        Ok(Self {
            client,
            config,
            session: Arc::new(RwLock::new(None)),
        })
    }

    /// Send one request with the current session id.
    async fn send<A: Serialize>(
        &self,
        request: &RpcRequest<'_, A>,
    ) -> Result<reqwest::Response, TorrentClientError> {
        let mut builder = self.client.post(&self.config.url).json(request);

        if !self.config.username.is_empty() {
            builder = builder.basic_auth(&self.config.username, Some(&self.config.password));
        }
        if let Some(session_id) = self.session.read().await.as_deref() {
            builder = builder.header(SESSION_HEADER, session_id);
        }

        builder.send().await.map_err(map_send_error)
    }

    /// Make an RPC call, performing the session-id handshake if needed.
    async fn call<A, R>(&self, method: &str, arguments: A) -> Result<R, TorrentClientError>
    where
        A: Serialize,
        R: DeserializeOwned,
    {
        let request = RpcRequest { method, arguments };
        let mut response = self.send(&request).await?;

        if response.status() == StatusCode::CONFLICT {
            // Session id missing or rotated, retry with the one offered
            let session_id = response
                .headers()
                .get(SESSION_HEADER)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
                .ok_or_else(|| {
                    TorrentClientError::InvalidResponse(format!(
                        "HTTP 409 without {} header",
                        SESSION_HEADER
                    ))
                })?;
            debug!("Transmission session id refreshed");
            *self.session.write().await = Some(session_id);

            response = self.send(&request).await?;
        }

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(TorrentClientError::AuthenticationFailed(
                "Invalid credentials".to_string(),
            ));
        }
        if !status.is_success() {
            return Err(TorrentClientError::ApiError(format!("HTTP {}", status)));
        }

        let body = response
            .text()
            .await
            .map_err(|e| TorrentClientError::ApiError(e.to_string()))?;
        parse_rpc_response(method, &body)
    }
}

fn map_send_error(e: reqwest::Error) -> TorrentClientError {
    if e.is_timeout() {
        TorrentClientError::Timeout
    } else if e.is_connect() {
        TorrentClientError::ConnectionFailed(e.to_string())
    } else {
        TorrentClientError::ApiError(e.to_string())
    }
}

/// Decode an RPC envelope, failing on any `result` other than "success".
fn parse_rpc_response<R: DeserializeOwned>(method: &str, body: &str) -> Result<R, TorrentClientError> {
    let envelope: RpcResponse = serde_json::from_str(body).map_err(|e| {
        TorrentClientError::InvalidResponse(format!("Failed to parse {} response: {}", method, e))
    })?;

    if envelope.result != "success" {
        warn!(method, result = %envelope.result, "Transmission rejected request");
        return Err(TorrentClientError::ApiError(envelope.result));
    }

    let arguments = match envelope.arguments {
        serde_json::Value::Null => serde_json::Value::Object(Default::default()),
        arguments => arguments,
    };

    serde_json::from_value(arguments).map_err(|e| {
        TorrentClientError::InvalidResponse(format!("Failed to parse {} arguments: {}", method, e))
    })
}

/// Decode each torrent on its own, skipping entries that do not fit `T`.
fn decode_torrents<T: DeserializeOwned>(torrents: Vec<serde_json::Value>) -> Vec<T> {
    torrents
        .into_iter()
        .filter_map(|raw| {
            let id = raw.get("id").cloned().unwrap_or_default();
            let hash = raw
                .get("hashString")
                .and_then(serde_json::Value::as_str)
                .unwrap_or_default()
                .to_string();
            match serde_json::from_value(raw) {
                Ok(torrent) => Some(torrent),
                Err(e) => {
                    warn!(%id, %hash, error = %e, "Skipping torrent that failed to decode");
                    None
                }
            }
        })
        .collect()
}

/// Name of a `torrent-get` status code.
fn status_name(code: i64) -> &'static str {
    match code {
        0 => "stopped",
        1 => "check_pending",
        2 => "checking",
        3 => "download_pending",
        4 => "downloading",
        5 => "seed_pending",
        6 => "seeding",
        _ => "unknown",
    }
}

#[derive(Debug, Serialize)]
struct RpcRequest<'a, A> {
    method: &'a str,
    arguments: A,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    result: String,
    #[serde(default)]
    arguments: serde_json::Value,
}

#[derive(Debug, Serialize)]
struct TorrentGetArgs<'a> {
    fields: &'a [&'a str],
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TorrentSetArgs<'a> {
    ids: [i64; 1],
    #[serde(skip_serializing_if = "Option::is_none")]
    tracker_add: Option<&'a [String]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    labels: Option<&'a [String]>,
}

#[derive(Debug, Deserialize)]
struct TorrentGetResult {
    torrents: Vec<serde_json::Value>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Empty {}

/// Transmission torrent as returned by `torrent-get`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TrTorrent {
    id: i64,
    hash_string: String,
    name: String,
    download_dir: String,
    #[serde(default)]
    labels: Vec<String>,
    #[serde(default)]
    trackers: Vec<TrTracker>,
}

#[derive(Debug, Deserialize)]
struct TrTracker {
    announce: String,
}

/// Transfer counters of a torrent as returned by `torrent-get`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TrTorrentStats {
    hash_string: String,
    name: String,
    status: i64,
    #[serde(default)]
    labels: Vec<String>,
    uploaded_ever: u64,
    downloaded_ever: u64,
}

impl TrTorrentStats {
    fn into_stats(self) -> ItemStats {
        ItemStats {
            hash: self.hash_string.to_lowercase(),
            name: self.name,
            status: status_name(self.status).to_string(),
            labels: self.labels.into_iter().collect(),
            uploaded_ever: self.uploaded_ever,
            downloaded_ever: self.downloaded_ever,
        }
    }
}

/// `session-stats` result.
#[derive(Debug, Deserialize)]
struct TrSessionStats {
    #[serde(rename = "current-stats")]
    current: TrTransfer,
    #[serde(rename = "cumulative-stats")]
    cumulative: TrTransfer,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TrTransfer {
    uploaded_bytes: u64,
    downloaded_bytes: u64,
}

impl From<TrTransfer> for TransferStats {
    fn from(t: TrTransfer) -> Self {
        Self {
            uploaded_bytes: t.uploaded_bytes,
            downloaded_bytes: t.downloaded_bytes,
        }
    }
}

impl TrTorrent {
    fn into_item(self) -> Item {
        Item {
            id: self.id,
            hash: self.hash_string.to_lowercase(),
            name: self.name,
            download_dir: self.download_dir,
            labels: self.labels.into_iter().collect(),
            trackers: self.trackers.into_iter().map(|t| t.announce).collect(),
        }
    }
}

#[async_trait]
impl TorrentClient for TransmissionClient {
    fn name(&self) -> &str {
        "transmission"
    }

    async fn list_items(&self) -> Result<Vec<Item>, TorrentClientError> {
        let result: TorrentGetResult = self
            .call("torrent-get", TorrentGetArgs { fields: ITEM_FIELDS })
            .await?;

        Ok(decode_torrents(result.torrents)
            .into_iter()
            .map(TrTorrent::into_item)
            .collect())
    }

    async fn add_trackers(&self, id: i64, trackers: &[String]) -> Result<(), TorrentClientError> {
        let args = TorrentSetArgs {
            ids: [id],
            tracker_add: Some(trackers),
            labels: None,
        };
        let _: Empty = self.call("torrent-set", args).await?;
        Ok(())
    }

    async fn set_labels(&self, id: i64, labels: &[String]) -> Result<(), TorrentClientError> {
        let args = TorrentSetArgs {
            ids: [id],
            tracker_add: None,
            labels: Some(labels),
        };
        let _: Empty = self.call("torrent-set", args).await?;
        Ok(())
    }

    async fn session_stats(&self) -> Result<SessionStats, TorrentClientError> {
        let stats: TrSessionStats = self.call("session-stats", Empty {}).await?;
        Ok(SessionStats {
            current: stats.current.into(),
            cumulative: stats.cumulative.into(),
        })
    }

    async fn item_stats(&self) -> Result<Vec<ItemStats>, TorrentClientError> {
        let result: TorrentGetResult = self
            .call("torrent-get", TorrentGetArgs { fields: STATS_FIELDS })
            .await?;

        Ok(decode_torrents(result.torrents)
            .into_iter()
            .map(TrTorrentStats::into_stats)
            .collect())
    }
}
