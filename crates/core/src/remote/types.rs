//! Types for remote transfer service operations.

use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::Stream;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur during remote service operations.
#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("Request timeout")]
    Timeout,

    #[error("Download stream failed: {0}")]
    Stream(String),
}

/// Status of a remote transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransferStatus {
    #[serde(rename = "IN_QUEUE")]
    Queued,
    Downloading,
    Seeding,
    Completed,
    Error,
    /// Anything the service reports that we do not model.
    #[serde(other)]
    Unknown,
}

impl TransferStatus {
    /// Whether the content is ready to be copied locally.
    pub fn is_finished(&self) -> bool {
        matches!(self, TransferStatus::Completed | TransferStatus::Seeding)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TransferStatus::Queued => "IN_QUEUE",
            TransferStatus::Downloading => "DOWNLOADING",
            TransferStatus::Seeding => "SEEDING",
            TransferStatus::Completed => "COMPLETED",
            TransferStatus::Error => "ERROR",
            TransferStatus::Unknown => "UNKNOWN",
        }
    }
}

/// A transfer as reported by the remote service. Read-only from our side.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteTransfer {
    pub id: i64,
    pub name: String,
    pub status: TransferStatus,
    pub created_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    /// Estimated seconds remaining; 0 when the transfer has not started.
    pub estimated_secs: i64,
    pub download_speed: i64,
    pub upload_speed: i64,
    pub peers_connected: i64,
    pub peers_sending_to_us: i64,
    pub peers_getting_from_us: i64,
    pub size_bytes: i64,
    pub downloaded_bytes: i64,
    pub uploaded_bytes: i64,
    /// Availability in percent (0-100).
    pub availability: i64,
    pub status_message: Option<String>,
    pub error_message: Option<String>,
    /// Root file (or folder) of the finished content.
    pub file_id: Option<i64>,
    pub magnet_uri: Option<String>,
    /// Original URL the transfer was created from.
    pub source: Option<String>,
}

/// A node in the remote file tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteFile {
    pub id: i64,
    pub name: String,
    pub content_type: String,
    pub size_bytes: i64,
    pub parent_id: Option<i64>,
}

pub const DIRECTORY_CONTENT_TYPE: &str = "application/x-directory";

impl RemoteFile {
    pub fn is_dir(&self) -> bool {
        self.content_type == DIRECTORY_CONTENT_TYPE
    }
}

/// Streamed file content.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, RemoteError>> + Send>>;

/// Trait for hosted transfer service backends.
#[async_trait]
pub trait RemoteService: Send + Sync {
    /// Backend name for logging.
    fn name(&self) -> &str;

    /// Hand a magnet reference to the service.
    async fn add_transfer(&self, magnet_uri: &str) -> Result<RemoteTransfer, RemoteError>;

    /// Fetch a single transfer.
    async fn get_transfer(&self, id: i64) -> Result<RemoteTransfer, RemoteError>;

    /// List every transfer the service knows about.
    async fn list_transfers(&self) -> Result<Vec<RemoteTransfer>, RemoteError>;

    /// Fetch a single file node.
    async fn get_file(&self, id: i64) -> Result<RemoteFile, RemoteError>;

    /// List the children of a directory node.
    async fn list_files(&self, parent_id: i64) -> Result<Vec<RemoteFile>, RemoteError>;

    /// Stream a file's bytes.
    async fn download(&self, file_id: i64) -> Result<ByteStream, RemoteError>;

    /// Delete a file or directory.
    async fn delete_file(&self, file_id: i64) -> Result<(), RemoteError>;

    /// Purge finished transfers from the transfer list.
    async fn clean_transfers(&self) -> Result<(), RemoteError>;
}
