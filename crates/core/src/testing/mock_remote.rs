//! Mock remote transfer service for testing.

use std::collections::{HashMap, HashSet, VecDeque};

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::infohash::Magnet;
use crate::remote::{
    ByteStream, RemoteError, RemoteFile, RemoteService, RemoteTransfer, TransferStatus,
    DIRECTORY_CONTENT_TYPE,
};

/// Operations that can be made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MockOp {
    AddTransfer,
    GetTransfer,
    ListTransfers,
    GetFile,
    ListFiles,
    Download,
    DeleteFile,
    CleanTransfers,
}

#[derive(Debug, Clone)]
struct MockFile {
    file: RemoteFile,
    content: Vec<u8>,
}

#[derive(Debug, Default)]
struct MockState {
    transfers: HashMap<i64, RemoteTransfer>,
    /// Remaining statuses per transfer, one consumed per `get_transfer`.
    scripts: HashMap<i64, VecDeque<TransferStatus>>,
    files: HashMap<i64, MockFile>,
    transfer_root: Option<i64>,
    next_id: i64,
}

/// Mock implementation of the RemoteService trait.
///
/// Provides controllable behavior for testing:
/// - Scripted status sequences for added transfers
/// - An in-memory file tree served by `get_file`/`list_files`/`download`
/// - Per-operation failures
/// - Recording of added magnets, deleted files and clean calls
#[derive(Debug)]
pub struct MockRemoteService {
    state: RwLock<MockState>,
    script: RwLock<Vec<TransferStatus>>,
    failing: RwLock<HashSet<MockOp>>,
    added: RwLock<Vec<String>>,
    deleted: RwLock<Vec<i64>>,
    clean_calls: RwLock<usize>,
}

impl Default for MockRemoteService {
    fn default() -> Self {
        Self::new()
    }
}

impl MockRemoteService {
    /// Create a mock whose added transfers complete on the first poll.
    pub fn new() -> Self {
        Self {
            state: RwLock::new(MockState {
                next_id: 1000,
                ..Default::default()
            }),
            script: RwLock::new(vec![TransferStatus::Completed]),
            failing: RwLock::new(HashSet::new()),
            added: RwLock::new(Vec::new()),
            deleted: RwLock::new(Vec::new()),
            clean_calls: RwLock::new(0),
        }
    }

    /// Statuses reported by successive polls of each newly added transfer.
    /// The last status repeats once the script runs out.
    pub async fn set_status_script(&self, statuses: Vec<TransferStatus>) {
        *self.script.write().await = statuses;
    }

    /// Make every call of `op` fail until cleared.
    pub async fn fail_on(&self, op: MockOp) {
        self.failing.write().await.insert(op);
    }

    pub async fn clear_failures(&self) {
        self.failing.write().await.clear();
    }

    /// Add a directory node to the file tree.
    pub async fn add_dir(&self, id: i64, parent_id: Option<i64>, name: &str) {
        self.insert_file(id, parent_id, name, DIRECTORY_CONTENT_TYPE, Vec::new())
            .await;
    }

    /// Add a regular file node to the file tree.
    pub async fn add_file(&self, id: i64, parent_id: Option<i64>, name: &str, content: &[u8]) {
        self.insert_file(id, parent_id, name, "application/octet-stream", content.to_vec())
            .await;
    }

    /// File node attached to transfers once they finish.
    pub async fn set_transfer_root(&self, file_id: i64) {
        self.state.write().await.transfer_root = Some(file_id);
    }

    /// Pre-populate a transfer (for list/get operations).
    pub async fn insert_transfer(&self, transfer: RemoteTransfer) {
        self.state
            .write()
            .await
            .transfers
            .insert(transfer.id, transfer);
    }

    /// Magnet URIs passed to `add_transfer`, in call order.
    pub async fn added_magnets(&self) -> Vec<String> {
        self.added.read().await.clone()
    }

    /// File ids passed to `delete_file`, in call order.
    pub async fn deleted_files(&self) -> Vec<i64> {
        self.deleted.read().await.clone()
    }

    pub async fn clean_calls(&self) -> usize {
        *self.clean_calls.read().await
    }

    pub async fn transfer_count(&self) -> usize {
        self.state.read().await.transfers.len()
    }

    async fn insert_file(
        &self,
        id: i64,
        parent_id: Option<i64>,
        name: &str,
        content_type: &str,
        content: Vec<u8>,
    ) {
        let file = RemoteFile {
            id,
            name: name.to_string(),
            content_type: content_type.to_string(),
            size_bytes: content.len() as i64,
            parent_id,
        };
        self.state
            .write()
            .await
            .files
            .insert(id, MockFile { file, content });
    }

    async fn check(&self, op: MockOp) -> Result<(), RemoteError> {
        if self.failing.read().await.contains(&op) {
            return Err(RemoteError::Api(format!("mock failure in {:?}", op)));
        }
        Ok(())
    }
}

#[async_trait]
impl RemoteService for MockRemoteService {
    fn name(&self) -> &str {
        "mock"
    }

    async fn add_transfer(&self, magnet_uri: &str) -> Result<RemoteTransfer, RemoteError> {
        self.check(MockOp::AddTransfer).await?;
        self.added.write().await.push(magnet_uri.to_string());

        let script: VecDeque<TransferStatus> = self.script.read().await.iter().copied().collect();
        let mut state = self.state.write().await;
        let id = state.next_id;
        state.next_id += 1;

        let name = Magnet::parse(magnet_uri)
            .ok()
            .and_then(|m| m.display_name)
            .unwrap_or_else(|| format!("Mock Transfer {}", id));

        let mut transfer = crate::testing::fixtures::transfer(id, &name, TransferStatus::Queued);
        transfer.created_at = Some(Utc::now());
        transfer.magnet_uri = Some(magnet_uri.to_string());

        state.transfers.insert(id, transfer.clone());
        state.scripts.insert(id, script);
        Ok(transfer)
    }

    async fn get_transfer(&self, id: i64) -> Result<RemoteTransfer, RemoteError> {
        self.check(MockOp::GetTransfer).await?;
        let mut state = self.state.write().await;
        let root = state.transfer_root;

        let next = state.scripts.get_mut(&id).and_then(|script| {
            if script.len() > 1 {
                script.pop_front()
            } else {
                script.front().copied()
            }
        });

        let transfer = state
            .transfers
            .get_mut(&id)
            .ok_or_else(|| RemoteError::NotFound(format!("transfer {}", id)))?;

        if let Some(status) = next {
            transfer.status = status;
            if status.is_finished() {
                transfer.file_id = root;
                transfer.downloaded_bytes = transfer.size_bytes;
                transfer.finished_at.get_or_insert_with(Utc::now);
            }
        }

        Ok(transfer.clone())
    }

    async fn list_transfers(&self) -> Result<Vec<RemoteTransfer>, RemoteError> {
        self.check(MockOp::ListTransfers).await?;
        let mut transfers: Vec<RemoteTransfer> =
            self.state.read().await.transfers.values().cloned().collect();
        transfers.sort_by_key(|t| t.id);
        Ok(transfers)
    }

    async fn get_file(&self, id: i64) -> Result<RemoteFile, RemoteError> {
        self.check(MockOp::GetFile).await?;
        self.state
            .read()
            .await
            .files
            .get(&id)
            .map(|f| f.file.clone())
            .ok_or_else(|| RemoteError::NotFound(format!("file {}", id)))
    }

    async fn list_files(&self, parent_id: i64) -> Result<Vec<RemoteFile>, RemoteError> {
        self.check(MockOp::ListFiles).await?;
        let mut files: Vec<RemoteFile> = self
            .state
            .read()
            .await
            .files
            .values()
            .filter(|f| f.file.parent_id == Some(parent_id))
            .map(|f| f.file.clone())
            .collect();
        files.sort_by_key(|f| f.id);
        Ok(files)
    }

    async fn download(&self, file_id: i64) -> Result<ByteStream, RemoteError> {
        self.check(MockOp::Download).await?;
        let content = self
            .state
            .read()
            .await
            .files
            .get(&file_id)
            .map(|f| f.content.clone())
            .ok_or_else(|| RemoteError::NotFound(format!("file {}", file_id)))?;

        // Two chunks so consumers see a real stream.
        let mid = content.len() / 2;
        let chunks: Vec<Result<Bytes, RemoteError>> = vec![
            Ok(Bytes::copy_from_slice(&content[..mid])),
            Ok(Bytes::copy_from_slice(&content[mid..])),
        ];
        Ok(Box::pin(futures::stream::iter(chunks)))
    }

    async fn delete_file(&self, file_id: i64) -> Result<(), RemoteError> {
        self.check(MockOp::DeleteFile).await?;
        self.deleted.write().await.push(file_id);
        self.state.write().await.files.remove(&file_id);
        Ok(())
    }

    async fn clean_transfers(&self) -> Result<(), RemoteError> {
        self.check(MockOp::CleanTransfers).await?;
        *self.clean_calls.write().await += 1;
        self.state
            .write()
            .await
            .transfers
            .retain(|_, t| !t.status.is_finished());
        Ok(())
    }
}
