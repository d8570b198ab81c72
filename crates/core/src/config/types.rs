use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;

use crate::orchestrator::OrchestratorConfig;

/// Root configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub putio: PutioConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub blackhole: BlackholeConfig,
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}

fn default_port() -> u16 {
    9091
}

/// Watched drop directory and where finished content lands.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BlackholeConfig {
    /// Directory scanned (recursively) for `.torrent` and `.magnet` files.
    #[serde(default = "default_watch_dir")]
    pub watch_dir: PathBuf,
    /// Root that replaces `watch_dir` when computing a download directory.
    /// Also the default `download-dir` for RPC submissions.
    #[serde(default = "default_download_dir")]
    pub download_dir: PathBuf,
    /// Poll interval of the directory watcher (milliseconds).
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
}

impl Default for BlackholeConfig {
    fn default() -> Self {
        Self {
            watch_dir: default_watch_dir(),
            download_dir: default_download_dir(),
            poll_interval_ms: default_poll_interval(),
        }
    }
}

fn default_watch_dir() -> PathBuf {
    PathBuf::from("/blackhole")
}

fn default_download_dir() -> PathBuf {
    PathBuf::from("/download")
}

fn default_poll_interval() -> u64 {
    100
}

/// put.io API configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PutioConfig {
    /// OAuth token from https://app.put.io/settings/account/oauth/apps
    pub oauth_token: String,
    /// API base URL (e.g., "https://api.put.io/v2")
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// API request timeout in seconds (default: 30). Downloads use it as a
    /// stall limit between chunks instead of a total deadline.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u32,
    /// Remote folder new transfers are saved into (0 = account root)
    #[serde(default)]
    pub save_parent_id: i64,
}

fn default_api_url() -> String {
    "https://api.put.io/v2".to_string()
}

fn default_timeout() -> u32 {
    30
}

/// Sanitized config for startup logging (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub server: ServerConfig,
    pub blackhole: BlackholeConfig,
    pub putio: SanitizedPutioConfig,
    pub orchestrator: OrchestratorConfig,
}

/// Sanitized put.io config (token hidden)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedPutioConfig {
    pub api_url: String,
    pub oauth_token_configured: bool,
    pub timeout_secs: u32,
    pub save_parent_id: i64,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            server: config.server.clone(),
            blackhole: config.blackhole.clone(),
            putio: SanitizedPutioConfig {
                api_url: config.putio.api_url.clone(),
                oauth_token_configured: !config.putio.oauth_token.is_empty(),
                timeout_secs: config.putio.timeout_secs,
                save_parent_id: config.putio.save_parent_id,
            },
            orchestrator: config.orchestrator.clone(),
        }
    }
}
