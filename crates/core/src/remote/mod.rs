//! Remote transfer service abstraction.
//!
//! This module provides a `RemoteService` trait for the hosted service that
//! actually runs torrents, plus the put.io implementation.

mod putio;
mod types;

pub use putio::PutioClient;
pub use types::*;
