//! Wire types for the Transmission RPC protocol.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Result string of a successful response.
pub const RESULT_SUCCESS: &str = "success";

/// Request envelope. `arguments` stays untyped until the method is known.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RpcRequest {
    #[serde(default)]
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arguments: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<i64>,
}

impl RpcRequest {
    pub fn new(method: impl Into<String>, arguments: Option<Value>) -> Self {
        Self {
            method: method.into(),
            arguments,
            tag: None,
        }
    }
}

/// Response envelope. `result` is `"success"` or an error description.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcResponse {
    pub result: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arguments: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<i64>,
}

impl RpcResponse {
    pub fn success(arguments: Option<Value>, tag: Option<i64>) -> Self {
        Self {
            result: RESULT_SUCCESS.to_string(),
            arguments,
            tag,
        }
    }

    pub fn failure(message: impl Into<String>, tag: Option<i64>) -> Self {
        Self {
            result: message.into(),
            arguments: None,
            tag,
        }
    }

    pub fn is_success(&self) -> bool {
        self.result == RESULT_SUCCESS
    }
}

/// `session-get` arguments. Speed limits are reported but never enforced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SessionInfo {
    pub version: String,
    pub rpc_version: i64,
    pub rpc_version_minimum: i64,
    pub download_dir: PathBuf,
    pub speed_limit_down: i64,
    pub speed_limit_up: i64,
    pub speed_limit_down_enabled: bool,
    pub speed_limit_up_enabled: bool,
}

/// Identity returned by `torrent-add`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TorrentAdded {
    pub id: i64,
    pub name: String,
    pub hash_string: String,
}

/// `torrent-add` arguments.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct TorrentAddResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub torrent_added: Option<TorrentAdded>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub torrent_duplicate: Option<TorrentAdded>,
}

/// `torrent-get` arguments.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TorrentGetResult {
    pub torrents: Vec<TorrentInfo>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub removed: Vec<i64>,
}

/// One entry of a `torrent-get` listing.
///
/// Every field except `id` and `name` is optional so unrequested fields are
/// left out of the JSON rather than sent as zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TorrentInfo {
    pub id: i64,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash_string: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_string: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_dir: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rate_download: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rate_upload: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub peers_getting_from_us: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub peers_sending_to_us: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub peers_connected: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eta: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub have_unchecked: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub have_valid: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uploaded_ever: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size_when_done: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_size: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub left_until_done: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub added_date: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub done_date: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub desired_available: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub percent_done: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_finished: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub magnet_link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub files: Option<Vec<TorrentFileInfo>>,
}

/// Entry of the `files` field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TorrentFileInfo {
    /// Path relative to the download directory.
    pub name: String,
    pub length: i64,
    pub bytes_completed: i64,
}
