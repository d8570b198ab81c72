//! Testing utilities and mock implementations.
//!
//! [`MockRemoteService`] stands in for the hosted transfer service so the
//! orchestrator, the RPC adapter and the server can be exercised without
//! network access.
//!
//! # Example
//!
//! ```rust,ignore
//! use transfer_relay_core::testing::MockRemoteService;
//!
//! let remote = MockRemoteService::new();
//! remote.add_dir(10, None, "Show").await;
//! remote.add_file(11, Some(10), "e01.mkv", b"video").await;
//! remote.set_transfer_root(10).await;
//! ```

mod mock_remote;

pub use mock_remote::{MockOp, MockRemoteService};

/// Test fixtures and helper functions.
pub mod fixtures {
    use std::ops::Range;

    use crate::remote::{RemoteTransfer, TransferStatus};

    /// Hex info hash of a made-up torrent. Its stable id is `fnv1a_32` of the raw bytes.
    pub const SAMPLE_HASH: &str = "c12fe1c06bba254a9dc9f519b335aa7c1367a88a";

    /// Magnet URI for [`SAMPLE_HASH`] with a display name.
    pub fn magnet_uri(name: &str) -> String {
        format!(
            "magnet:?xt=urn:btih:{}&dn={}",
            SAMPLE_HASH,
            urlencoding::encode(name)
        )
    }

    /// Magnet URI for an arbitrary 40-character hex hash.
    pub fn magnet_uri_for(hash: &str, name: &str) -> String {
        format!("magnet:?xt=urn:btih:{}&dn={}", hash, urlencoding::encode(name))
    }

    /// Create a remote transfer with reasonable defaults.
    pub fn transfer(id: i64, name: &str, status: TransferStatus) -> RemoteTransfer {
        RemoteTransfer {
            id,
            name: name.to_string(),
            status,
            created_at: None,
            finished_at: None,
            estimated_secs: 0,
            download_speed: 0,
            upload_speed: 0,
            peers_connected: 0,
            peers_sending_to_us: 0,
            peers_getting_from_us: 0,
            size_bytes: 1024 * 1024 * 100, // 100 MB
            downloaded_bytes: 0,
            uploaded_bytes: 0,
            availability: 0,
            status_message: None,
            error_message: None,
            file_id: None,
            magnet_uri: None,
            source: None,
        }
    }

    /// A transfer created from `magnet_uri`, half downloaded.
    pub fn downloading_transfer(id: i64, name: &str, magnet_uri: &str) -> RemoteTransfer {
        let mut t = transfer(id, name, TransferStatus::Downloading);
        t.downloaded_bytes = t.size_bytes / 2;
        t.estimated_secs = 120;
        t.download_speed = 1024 * 1024;
        t.peers_connected = 12;
        t.peers_sending_to_us = 8;
        t.peers_getting_from_us = 2;
        t.availability = 100;
        t.magnet_uri = Some(magnet_uri.to_string());
        t
    }

    /// Bencoded single-file torrent and the byte range of its `info` dictionary.
    pub fn sample_torrent(name: &str) -> (Vec<u8>, Range<usize>) {
        let mut info = Vec::new();
        info.extend_from_slice(b"d6:lengthi12e4:name");
        info.extend_from_slice(format!("{}:{}", name.len(), name).as_bytes());
        info.extend_from_slice(b"12:piece lengthi16384e6:pieces20:");
        info.extend_from_slice(&[7u8; 20]);
        info.push(b'e');

        let mut out = Vec::new();
        out.extend_from_slice(b"d8:announce22:http://tracker.test/an4:info");
        let start = out.len();
        out.extend_from_slice(&info);
        let end = out.len();
        out.push(b'e');
        (out, start..end)
    }
}
