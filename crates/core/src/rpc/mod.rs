//! Transmission RPC adapter.
//!
//! Decodes the loosely typed request envelope into an [`RpcCall`], answers
//! `session-get`, submits `torrent-add` through the orchestrator and maps the
//! remote service's transfers into `torrent-get` entries.

mod adapter;
mod call;
mod fields;
mod session;
mod types;

pub use adapter::RpcAdapter;
pub use call::{IdRef, IdSelector, RpcCall, TorrentAddArgs, TorrentGetArgs, NO_OP_METHODS};
pub use fields::{status_code, FieldSet, TorrentMapper};
pub use session::{SessionId, SESSION_ID_HEADER};
pub use types::*;

use thiserror::Error;

use crate::infohash::ResolveError;

/// Errors that can occur while handling an RPC request.
#[derive(Debug, Error)]
pub enum RpcError {
    /// The request body is not a valid envelope.
    #[error("malformed request: {0}")]
    MalformedRequest(String),

    /// The arguments do not have the shape the method expects.
    #[error("malformed arguments: {0}")]
    MalformedArguments(String),

    /// The torrent named by `torrent-add` could not be resolved.
    #[error(transparent)]
    Resolve(#[from] ResolveError),
}
