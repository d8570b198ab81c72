//! put.io remote service implementation.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use futures::StreamExt;
use reqwest::{header, Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::PutioConfig;

use super::{ByteStream, RemoteError, RemoteFile, RemoteService, RemoteTransfer, TransferStatus};

/// put.io API v2 client.
pub struct PutioClient {
    client: Client,
    config: PutioConfig,
}

impl PutioClient {
    /// Create a new put.io client.
    pub fn new(config: PutioConfig) -> Result<Self, RemoteError> {
        let mut headers = header::HeaderMap::new();
        let bearer = header::HeaderValue::from_str(&format!("Bearer {}", config.oauth_token))
            .map_err(|e| RemoteError::AuthenticationFailed(e.to_string()))?;
        headers.insert(header::AUTHORIZATION, bearer);

        // No client-wide total timeout: it would also cut off long downloads.
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(config.timeout_secs as u64))
            .default_headers(headers)
            .build()
            .map_err(|e| RemoteError::ConnectionFailed(e.to_string()))?;

        Ok(Self { client, config })
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(self.config.timeout_secs as u64)
    }

    /// Get the base URL without trailing slash.
    fn base_url(&self) -> &str {
        self.config.api_url.trim_end_matches('/')
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url(), endpoint)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, RemoteError> {
        let response = request.send().await.map_err(map_reqwest_error)?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<PutioErrorBody>(&body)
            .ok()
            .and_then(|e| e.error_message.or(e.error_type))
            .unwrap_or_else(|| body.chars().take(200).collect());

        Err(match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                RemoteError::AuthenticationFailed(message)
            }
            StatusCode::NOT_FOUND => RemoteError::NotFound(message),
            _ => RemoteError::Api(format!("HTTP {}: {}", status, message)),
        })
    }

    /// Send an API call bounded by the configured timeout, body included.
    async fn send_api(&self, request: RequestBuilder) -> Result<Response, RemoteError> {
        self.send(request.timeout(self.timeout())).await
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, RemoteError> {
        let response = self.send_api(request).await?;
        let text = response.text().await.map_err(map_reqwest_error)?;
        serde_json::from_str(&text)
            .map_err(|e| RemoteError::Api(format!("Failed to parse response: {}", e)))
    }
}

fn map_reqwest_error(e: reqwest::Error) -> RemoteError {
    if e.is_timeout() {
        RemoteError::Timeout
    } else if e.is_connect() {
        RemoteError::ConnectionFailed(e.to_string())
    } else {
        RemoteError::Api(e.to_string())
    }
}

#[derive(Debug, Deserialize)]
struct PutioErrorBody {
    error_type: Option<String>,
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TransferEnvelope {
    transfer: PutioTransfer,
}

#[derive(Debug, Deserialize)]
struct TransferListEnvelope {
    transfers: Vec<PutioTransfer>,
}

#[derive(Debug, Deserialize)]
struct FileEnvelope {
    file: PutioFile,
}

#[derive(Debug, Deserialize)]
struct FileListEnvelope {
    files: Vec<PutioFile>,
}

/// put.io transfer object.
#[derive(Debug, Deserialize)]
struct PutioTransfer {
    id: i64,
    #[serde(default)]
    name: Option<String>,
    status: TransferStatus,
    #[serde(default)]
    created_at: Option<String>,
    #[serde(default)]
    finished_at: Option<String>,
    #[serde(default)]
    estimated_time: Option<i64>,
    #[serde(default)]
    down_speed: Option<i64>,
    #[serde(default)]
    up_speed: Option<i64>,
    #[serde(default)]
    peers_connected: Option<i64>,
    #[serde(default)]
    peers_sending_to_us: Option<i64>,
    #[serde(default)]
    peers_getting_from_us: Option<i64>,
    #[serde(default)]
    size: Option<i64>,
    #[serde(default)]
    downloaded: Option<i64>,
    #[serde(default)]
    uploaded: Option<i64>,
    #[serde(default)]
    availability: Option<i64>,
    #[serde(default)]
    status_message: Option<String>,
    #[serde(default)]
    error_message: Option<String>,
    #[serde(default)]
    file_id: Option<i64>,
    #[serde(default)]
    magneturi: Option<String>,
    #[serde(default)]
    source: Option<String>,
}

impl PutioTransfer {
    fn into_remote_transfer(self) -> RemoteTransfer {
        RemoteTransfer {
            id: self.id,
            name: self.name.unwrap_or_default(),
            status: self.status,
            created_at: self.created_at.as_deref().and_then(parse_putio_time),
            finished_at: self.finished_at.as_deref().and_then(parse_putio_time),
            estimated_secs: self.estimated_time.unwrap_or(0).max(0),
            download_speed: self.down_speed.unwrap_or(0),
            upload_speed: self.up_speed.unwrap_or(0),
            peers_connected: self.peers_connected.unwrap_or(0),
            peers_sending_to_us: self.peers_sending_to_us.unwrap_or(0),
            peers_getting_from_us: self.peers_getting_from_us.unwrap_or(0),
            size_bytes: self.size.unwrap_or(0),
            downloaded_bytes: self.downloaded.unwrap_or(0),
            uploaded_bytes: self.uploaded.unwrap_or(0),
            availability: self.availability.unwrap_or(0),
            status_message: non_empty(self.status_message),
            error_message: non_empty(self.error_message),
            file_id: self.file_id.filter(|id| *id > 0),
            magnet_uri: non_empty(self.magneturi),
            source: non_empty(self.source),
        }
    }
}

/// put.io file object.
#[derive(Debug, Deserialize)]
struct PutioFile {
    id: i64,
    name: String,
    #[serde(default)]
    content_type: String,
    #[serde(default)]
    size: i64,
    #[serde(default)]
    parent_id: Option<i64>,
}

impl From<PutioFile> for RemoteFile {
    fn from(file: PutioFile) -> Self {
        RemoteFile {
            id: file.id,
            name: file.name,
            content_type: file.content_type,
            size_bytes: file.size,
            parent_id: file.parent_id,
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.is_empty())
}

/// Stream a response body, failing if no chunk arrives within `stall`.
///
/// The stream ends after the first error.
fn stall_guarded(response: Response, stall: Duration) -> ByteStream {
    let body = Box::pin(response.bytes_stream());
    let stream = futures::stream::unfold(Some(body), move |state| async move {
        let mut body = state?;
        match tokio::time::timeout(stall, body.next()).await {
            Ok(Some(Ok(chunk))) => Some((Ok(chunk), Some(body))),
            Ok(Some(Err(e))) => Some((Err(RemoteError::Stream(e.to_string())), None)),
            Ok(None) => None,
            Err(_) => Some((Err(RemoteError::Timeout), None)),
        }
    });
    Box::pin(stream)
}

/// put.io reports naive `YYYY-MM-DDTHH:MM:SS` timestamps in UTC.
fn parse_putio_time(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    match NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S") {
        Ok(naive) => Some(naive.and_utc()),
        Err(e) => {
            warn!("Unparseable put.io timestamp {:?}: {}", s, e);
            None
        }
    }
}

#[async_trait]
impl RemoteService for PutioClient {
    fn name(&self) -> &str {
        "putio"
    }

    async fn add_transfer(&self, magnet_uri: &str) -> Result<RemoteTransfer, RemoteError> {
        let parent = self.config.save_parent_id.to_string();
        let request = self
            .client
            .post(self.url("/transfers/add"))
            .form(&[("url", magnet_uri), ("save_parent_id", parent.as_str())]);

        let envelope: TransferEnvelope = self.send_json(request).await?;
        debug!(id = envelope.transfer.id, "put.io transfer created");
        Ok(envelope.transfer.into_remote_transfer())
    }

    async fn get_transfer(&self, id: i64) -> Result<RemoteTransfer, RemoteError> {
        let request = self.client.get(self.url(&format!("/transfers/{}", id)));
        let envelope: TransferEnvelope = self.send_json(request).await?;
        Ok(envelope.transfer.into_remote_transfer())
    }

    async fn list_transfers(&self) -> Result<Vec<RemoteTransfer>, RemoteError> {
        let request = self.client.get(self.url("/transfers/list"));
        let envelope: TransferListEnvelope = self.send_json(request).await?;
        Ok(envelope
            .transfers
            .into_iter()
            .map(PutioTransfer::into_remote_transfer)
            .collect())
    }

    async fn get_file(&self, id: i64) -> Result<RemoteFile, RemoteError> {
        let request = self.client.get(self.url(&format!("/files/{}", id)));
        let envelope: FileEnvelope = self.send_json(request).await?;
        Ok(envelope.file.into())
    }

    async fn list_files(&self, parent_id: i64) -> Result<Vec<RemoteFile>, RemoteError> {
        let request = self
            .client
            .get(self.url("/files/list"))
            .query(&[("parent_id", parent_id)]);
        let envelope: FileListEnvelope = self.send_json(request).await?;
        Ok(envelope.files.into_iter().map(RemoteFile::from).collect())
    }

    async fn download(&self, file_id: i64) -> Result<ByteStream, RemoteError> {
        let request = self
            .client
            .get(self.url(&format!("/files/{}/download", file_id)));
        let stall = self.timeout();
        let response = tokio::time::timeout(stall, self.send(request))
            .await
            .map_err(|_| RemoteError::Timeout)??;
        Ok(stall_guarded(response, stall))
    }

    async fn delete_file(&self, file_id: i64) -> Result<(), RemoteError> {
        let ids = file_id.to_string();
        let request = self
            .client
            .post(self.url("/files/delete"))
            .form(&[("file_ids", ids.as_str())]);
        self.send_api(request).await?;
        Ok(())
    }

    async fn clean_transfers(&self) -> Result<(), RemoteError> {
        let request = self.client.post(self.url("/transfers/clean"));
        self.send_api(request).await?;
        Ok(())
    }
}
