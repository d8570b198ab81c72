//! RPC method dispatch.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::infohash::{resolve_metainfo_base64, Magnet, StableId};
use crate::orchestrator::TransferOrchestrator;
use crate::remote::{RemoteError, RemoteService, RemoteTransfer};

use super::call::{RpcCall, TorrentAddArgs, TorrentGetArgs};
use super::fields::{file_progress, FieldSet, TorrentMapper};
use super::{
    RpcError, RpcRequest, RpcResponse, SessionInfo, TorrentAddResult, TorrentAdded,
    TorrentFileInfo, TorrentGetResult,
};

/// Transmission version reported to clients.
pub const REPORTED_VERSION: &str = "2.98";
pub const REPORTED_RPC_VERSION: i64 = 10;
const REPORTED_SPEED_LIMIT: i64 = 10_000;

/// Answers RPC calls on behalf of the remote service.
pub struct RpcAdapter {
    remote: Arc<dyn RemoteService>,
    orchestrator: TransferOrchestrator,
    download_dir: PathBuf,
}

impl RpcAdapter {
    pub fn new(
        remote: Arc<dyn RemoteService>,
        orchestrator: TransferOrchestrator,
        download_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            remote,
            orchestrator,
            download_dir: download_dir.into(),
        }
    }

    /// Handle one request. Never fails; method errors become the `result` text.
    pub async fn handle(&self, request: RpcRequest) -> RpcResponse {
        let tag = request.tag;
        let outcome = match RpcCall::decode(&request) {
            Ok(call) => self.dispatch(call).await,
            Err(e) => Err(e),
        };

        match outcome {
            Ok(arguments) => RpcResponse::success(arguments, tag),
            Err(e) => {
                warn!(method = %request.method, "RPC call failed: {}", e);
                RpcResponse::failure(e.to_string(), tag)
            }
        }
    }

    /// Run a decoded call and return its response arguments.
    pub async fn dispatch(&self, call: RpcCall) -> Result<Option<Value>, RpcError> {
        match call {
            RpcCall::SessionGet => to_arguments(&self.session_info()),
            RpcCall::TorrentAdd(args) => to_arguments(&self.torrent_add(args).await?),
            RpcCall::TorrentGet(args) => to_arguments(&self.torrent_get(args).await),
            RpcCall::NoOp(method) => {
                debug!(method = %method, "Accepted without action");
                Ok(None)
            }
            RpcCall::Unknown(method) => {
                info!(method = %method, "Unhandled RPC method");
                Ok(None)
            }
        }
    }

    pub fn session_info(&self) -> SessionInfo {
        SessionInfo {
            version: REPORTED_VERSION.to_string(),
            rpc_version: REPORTED_RPC_VERSION,
            rpc_version_minimum: REPORTED_RPC_VERSION,
            download_dir: self.download_dir.clone(),
            speed_limit_down: REPORTED_SPEED_LIMIT,
            speed_limit_up: REPORTED_SPEED_LIMIT,
            speed_limit_down_enabled: false,
            speed_limit_up_enabled: false,
        }
    }

    /// Resolve the torrent, start its fetch and return its identity.
    ///
    /// The identity is computed before the fetch is spawned, so the caller
    /// gets it immediately.
    pub async fn torrent_add(&self, args: TorrentAddArgs) -> Result<TorrentAddResult, RpcError> {
        let target = args
            .download_dir
            .unwrap_or_else(|| self.download_dir.clone());

        let (uri, name, stable) = match (args.filename.as_deref(), args.metainfo.as_deref()) {
            (Some(filename), _) if filename.trim_start().starts_with("magnet:") => {
                let magnet = Magnet::parse(filename)?;
                (filename.trim().to_string(), magnet.name(), magnet.stable_id())
            }
            (_, Some(metainfo)) => {
                let resolved = resolve_metainfo_base64(metainfo)?;
                (
                    resolved.magnet().to_string(),
                    resolved.name.clone(),
                    resolved.stable_id(),
                )
            }
            (Some(url), None) => {
                let resolved = self.orchestrator.resolver().resolve_url(url.trim()).await?;
                (
                    resolved.magnet().to_string(),
                    resolved.name.clone(),
                    resolved.stable_id(),
                )
            }
            (None, None) => {
                return Err(RpcError::MalformedArguments(
                    "torrent-add requires filename or metainfo".to_string(),
                ))
            }
        };

        info!(id = stable.id, hash = %stable.hash, "Adding {} to {}", name, target.display());
        self.orchestrator.submit_magnet(uri, target);

        Ok(TorrentAddResult {
            torrent_added: Some(TorrentAdded {
                id: stable.id,
                name,
                hash_string: stable.hash,
            }),
            torrent_duplicate: None,
        })
    }

    /// List every transfer the remote service knows about.
    ///
    /// A failed listing yields an empty result instead of an error.
    pub async fn torrent_get(&self, args: TorrentGetArgs) -> TorrentGetResult {
        let transfers = match self.remote.list_transfers().await {
            Ok(transfers) => transfers,
            Err(e) => {
                warn!("Unable to list transfers on {}: {}", self.remote.name(), e);
                return TorrentGetResult::default();
            }
        };

        let fields = FieldSet::from(args.fields);
        let mapper = TorrentMapper::new(&fields, &self.download_dir);
        let mut torrents = Vec::with_capacity(transfers.len());

        for transfer in &transfers {
            let stable = self.stable_id_for(transfer).await;
            if let Some(ids) = &args.ids {
                if !ids.matches(&stable) {
                    continue;
                }
            }

            let files = if fields.names("files") {
                Some(self.files_for(transfer).await)
            } else {
                None
            };
            torrents.push(mapper.map(transfer, &stable, files));
        }

        TorrentGetResult {
            torrents,
            removed: Vec::new(),
        }
    }

    /// Identity of a remote transfer, from its magnet or its `.torrent` URL.
    ///
    /// Falls back to the remote id with an empty hash, which no hash filter matches.
    async fn stable_id_for(&self, transfer: &RemoteTransfer) -> StableId {
        if let Some(uri) = transfer.magnet_uri.as_deref().filter(|u| !u.is_empty()) {
            match Magnet::parse(uri) {
                Ok(magnet) => return magnet.stable_id(),
                Err(e) => warn!(id = transfer.id, "Unable to parse magnet of {}: {}", transfer.name, e),
            }
        } else if let Some(url) = transfer.source.as_deref().filter(|s| is_remote_url(s)) {
            match self.orchestrator.resolver().resolve_url(url).await {
                Ok(resolved) => return resolved.stable_id(),
                Err(e) => warn!(id = transfer.id, "Unable to resolve {}: {}", url, e),
            }
        } else {
            debug!(id = transfer.id, "No magnet or source for {}", transfer.name);
        }

        StableId {
            id: transfer.id,
            hash: String::new(),
        }
    }

    /// Files of a transfer with approximate per-file progress.
    async fn files_for(&self, transfer: &RemoteTransfer) -> Vec<TorrentFileInfo> {
        let Some(file_id) = transfer.file_id else {
            return Vec::new();
        };

        match self.walk_files(file_id).await {
            Ok(files) => files
                .into_iter()
                .map(|(name, length)| TorrentFileInfo {
                    bytes_completed: file_progress(length, transfer),
                    name,
                    length,
                })
                .collect(),
            Err(e) => {
                warn!(id = transfer.id, "Unable to list files of {}: {}", transfer.name, e);
                Vec::new()
            }
        }
    }

    /// Flatten the remote tree under `root_id` into `(relative path, size)` pairs.
    async fn walk_files(&self, root_id: i64) -> Result<Vec<(String, i64)>, RemoteError> {
        let root = self.remote.get_file(root_id).await?;
        let mut files = Vec::new();
        let mut pending = VecDeque::from([(root, String::new())]);

        while let Some((node, prefix)) = pending.pop_front() {
            let path = if prefix.is_empty() {
                node.name.clone()
            } else {
                format!("{}/{}", prefix, node.name)
            };

            if node.is_dir() {
                for child in self.remote.list_files(node.id).await? {
                    pending.push_back((child, path.clone()));
                }
            } else {
                files.push((path, node.size_bytes));
            }
        }

        Ok(files)
    }
}

fn is_remote_url(s: &str) -> bool {
    s.starts_with("http://") || s.starts_with("https://")
}

fn to_arguments<T: Serialize>(value: &T) -> Result<Option<Value>, RpcError> {
    serde_json::to_value(value)
        .map(Some)
        .map_err(|e| RpcError::MalformedRequest(format!("unable to encode response: {}", e)))
}
