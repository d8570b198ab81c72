//! Info-hash resolution.
//!
//! Turns magnet references and `.torrent` metadata into a common
//! [`Magnet`] form and derives the [`StableId`] used as protocol identity.

mod cache;
mod magnet;
mod metainfo;
mod stable_id;

pub use cache::{HttpMetainfoFetcher, InfoHashResolver, MetainfoFetcher, DEFAULT_CACHE_CAPACITY};
pub use magnet::Magnet;
pub use metainfo::{resolve_metainfo, resolve_metainfo_base64, ResolvedTorrent};
pub use stable_id::{fnv1a_32, InfoHash, StableId};

use thiserror::Error;

/// Errors that can occur while resolving torrent identity.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("malformed magnet: {0}")]
    MalformedMagnet(String),

    #[error("malformed torrent metadata: {0}")]
    MalformedTorrent(String),

    #[error("failed to fetch torrent metadata: {0}")]
    Fetch(String),

    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}
