use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Client;
use tokio::sync::RwLock;
use tracing::debug;

use super::{resolve_metainfo, Magnet, ResolveError, ResolvedTorrent};

/// Entries kept before the whole cache is dropped.
pub const DEFAULT_CACHE_CAPACITY: usize = 1000;

/// Source of remote `.torrent` bytes.
#[async_trait]
pub trait MetainfoFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Bytes, ResolveError>;
}

/// Fetches `.torrent` files over plain HTTP(S).
pub struct HttpMetainfoFetcher {
    client: Client,
}

impl HttpMetainfoFetcher {
    pub fn new(timeout: Duration) -> Result<Self, ResolveError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ResolveError::Fetch(e.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl MetainfoFetcher for HttpMetainfoFetcher {
    async fn fetch(&self, url: &str) -> Result<Bytes, ResolveError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ResolveError::Fetch(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ResolveError::Fetch(format!("HTTP {} for {}", status, url)));
        }

        response
            .bytes()
            .await
            .map_err(|e| ResolveError::Fetch(e.to_string()))
    }
}

/// Resolves magnets, local `.torrent`/`.magnet` files and remote `.torrent`
/// URLs to a [`Magnet`].
///
/// Remote URLs are memoized so `torrent-get` polling does not re-download the
/// same metadata. When the cache grows past its capacity it is cleared
/// entirely; failures are never cached.
pub struct InfoHashResolver {
    fetcher: Arc<dyn MetainfoFetcher>,
    cache: RwLock<HashMap<String, ResolvedTorrent>>,
    capacity: usize,
}

impl InfoHashResolver {
    pub fn new(fetcher: Arc<dyn MetainfoFetcher>) -> Self {
        Self::with_capacity(fetcher, DEFAULT_CACHE_CAPACITY)
    }

    pub fn with_capacity(fetcher: Arc<dyn MetainfoFetcher>, capacity: usize) -> Self {
        Self {
            fetcher,
            cache: RwLock::new(HashMap::new()),
            capacity,
        }
    }

    pub fn resolve_magnet(&self, uri: &str) -> Result<Magnet, ResolveError> {
        Magnet::parse(uri)
    }

    /// Read a `.magnet` file and parse its contents.
    pub async fn resolve_magnet_file(&self, path: &Path) -> Result<Magnet, ResolveError> {
        let contents = read_file(path).await?;
        Magnet::parse(&String::from_utf8_lossy(&contents))
    }

    /// Read a `.torrent` file (raw or base64) and build its magnet.
    pub async fn resolve_torrent_file(&self, path: &Path) -> Result<Magnet, ResolveError> {
        let contents = read_file(path).await?;
        Ok(resolve_metainfo(&contents)?.magnet())
    }

    /// Fetch and resolve a remote `.torrent` URL, going through the cache.
    pub async fn resolve_url(&self, url: &str) -> Result<ResolvedTorrent, ResolveError> {
        if let Some(hit) = self.cache.read().await.get(url) {
            return Ok(hit.clone());
        }

        debug!(url, "Fetching torrent metadata");
        let bytes = self.fetcher.fetch(url).await?;
        let resolved = resolve_metainfo(&bytes)?;

        let mut cache = self.cache.write().await;
        if cache.len() >= self.capacity {
            debug!(entries = cache.len(), "Metadata cache full, clearing");
            cache.clear();
        }
        cache.insert(url.to_string(), resolved.clone());

        Ok(resolved)
    }

    pub async fn cached_entries(&self) -> usize {
        self.cache.read().await.len()
    }
}

async fn read_file(path: &Path) -> Result<Vec<u8>, ResolveError> {
    tokio::fs::read(path).await.map_err(|source| ResolveError::Io {
        path: path.display().to_string(),
        source,
    })
}
