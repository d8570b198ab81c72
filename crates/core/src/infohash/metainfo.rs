//! `.torrent` metadata to magnet conversion.
//!
//! Uses librqbit-core to parse the bencoded metadata; the info-hash it reports
//! is the SHA-1 of the `info` dictionary exactly as encoded in the file.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use librqbit_core::torrent_metainfo::{torrent_from_bytes, TorrentMetaV1Owned};

use super::{InfoHash, Magnet, ResolveError, StableId};

/// Identity extracted from `.torrent` metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTorrent {
    pub name: String,
    pub info_hash: InfoHash,
}

impl ResolvedTorrent {
    pub fn magnet(&self) -> Magnet {
        Magnet::new(self.info_hash, Some(self.name.clone()))
    }

    pub fn stable_id(&self) -> StableId {
        self.info_hash.stable_id()
    }
}

/// Resolve raw `.torrent` bytes.
///
/// Input that does not look like a bencoded dictionary is retried as base64,
/// which is how RPC clients and some indexers hand metadata around.
pub fn resolve_metainfo(bytes: &[u8]) -> Result<ResolvedTorrent, ResolveError> {
    if bytes.first() == Some(&b'd') {
        return parse_bencoded(bytes);
    }

    let text = std::str::from_utf8(bytes)
        .map_err(|_| ResolveError::MalformedTorrent("not bencoded and not base64".to_string()))?;
    resolve_metainfo_base64(text)
}

/// Resolve base64-encoded `.torrent` bytes.
pub fn resolve_metainfo_base64(encoded: &str) -> Result<ResolvedTorrent, ResolveError> {
    let compact: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();
    let decoded = STANDARD
        .decode(compact.as_bytes())
        .map_err(|e| ResolveError::MalformedTorrent(format!("invalid base64: {e}")))?;
    parse_bencoded(&decoded)
}

fn parse_bencoded(bytes: &[u8]) -> Result<ResolvedTorrent, ResolveError> {
    let torrent: TorrentMetaV1Owned =
        torrent_from_bytes(bytes).map_err(|e| ResolveError::MalformedTorrent(e.to_string()))?;

    let info_hash = InfoHash::from(torrent.info_hash);

    let name = torrent
        .info
        .name
        .as_ref()
        .map(|b| String::from_utf8_lossy(b.as_ref()).into_owned())
        .unwrap_or_else(|| info_hash.to_hex());

    Ok(ResolvedTorrent { name, info_hash })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixtures::sample_torrent;
    use sha1::{Digest, Sha1};

    #[test]
    fn test_resolve_bencoded_torrent() {
        let (bytes, info_range) = sample_torrent("file.txt");
        let resolved = resolve_metainfo(&bytes).unwrap();

        let expected: [u8; 20] = Sha1::digest(&bytes[info_range]).into();
        assert_eq!(resolved.info_hash, InfoHash::new(expected));
        assert_eq!(resolved.name, "file.txt");
    }

    #[test]
    fn test_magnet_round_trip_keeps_info_hash() {
        let (bytes, _) = sample_torrent("round trip.bin");
        let resolved = resolve_metainfo(&bytes).unwrap();
        let reparsed = Magnet::parse(&resolved.magnet().to_string()).unwrap();

        assert_eq!(reparsed.info_hash, resolved.info_hash);
        assert_eq!(reparsed.display_name.as_deref(), Some("round trip.bin"));
        assert_eq!(reparsed.stable_id(), resolved.stable_id());
    }

    #[test]
    fn test_resolve_base64_torrent() {
        let (bytes, _) = sample_torrent("b64.iso");
        let encoded = STANDARD.encode(&bytes);

        let from_raw = resolve_metainfo(&bytes).unwrap();
        assert_eq!(resolve_metainfo_base64(&encoded).unwrap(), from_raw);
        assert_eq!(resolve_metainfo(encoded.as_bytes()).unwrap(), from_raw);
    }

    #[test]
    fn test_garbage_is_malformed_torrent() {
        assert!(matches!(
            resolve_metainfo(b"not a valid torrent"),
            Err(ResolveError::MalformedTorrent(_))
        ));
        assert!(matches!(
            resolve_metainfo(b"d4:spam4:eggse"),
            Err(ResolveError::MalformedTorrent(_))
        ));
        assert!(matches!(
            resolve_metainfo(&[0xff, 0xfe]),
            Err(ResolveError::MalformedTorrent(_))
        ));
    }
}
