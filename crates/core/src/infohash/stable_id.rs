use std::fmt;
use std::str::FromStr;

use librqbit_core::Id20;
use serde::{Deserialize, Serialize};

use super::ResolveError;

const FNV_OFFSET_BASIS: u32 = 0x811c_9dc5;
const FNV_PRIME: u32 = 0x0100_0193;

/// 32-bit FNV-1a.
pub fn fnv1a_32(bytes: &[u8]) -> u32 {
    bytes.iter().fold(FNV_OFFSET_BASIS, |hash, byte| {
        (hash ^ u32::from(*byte)).wrapping_mul(FNV_PRIME)
    })
}

/// A 20-byte BitTorrent v1 info-hash.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct InfoHash([u8; 20]);

impl InfoHash {
    pub fn new(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Parse a 40-character hex or 32-character base32 info-hash, either case.
    pub fn parse(s: &str) -> Result<Self, ResolveError> {
        Id20::from_str(&s.trim().to_ascii_uppercase())
            .map(Self::from)
            .map_err(|e| ResolveError::MalformedMagnet(format!("bad info-hash {s:?}: {e}")))
    }

    /// Lowercase hex form.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn stable_id(&self) -> StableId {
        StableId::from_info_hash(self)
    }
}

impl From<Id20> for InfoHash {
    fn from(id: Id20) -> Self {
        Self(id.0)
    }
}

impl fmt::Debug for InfoHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "InfoHash({})", self.to_hex())
    }
}

impl fmt::Display for InfoHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Numeric/hex identity of a torrent as exposed over RPC.
///
/// `id` is the FNV-1a hash of the raw info-hash bytes, never of the hex text,
/// so the same torrent maps to the same id regardless of how its hash was spelled.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StableId {
    pub id: i64,
    pub hash: String,
}

impl StableId {
    pub fn from_info_hash(info_hash: &InfoHash) -> Self {
        Self {
            id: i64::from(fnv1a_32(info_hash.as_bytes())),
            hash: info_hash.to_hex(),
        }
    }

    /// Case-insensitive comparison against a hex hash string.
    pub fn matches_hash(&self, hash: &str) -> bool {
        !self.hash.is_empty() && self.hash.eq_ignore_ascii_case(hash.trim())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEX: &str = "c12fe1c06bba254a9dc9f519b335aa7c1367a88a";

    #[test]
    fn test_fnv1a_known_vectors() {
        assert_eq!(fnv1a_32(b""), 0x811c9dc5);
        assert_eq!(fnv1a_32(b"a"), 0xe40c292c);
        assert_eq!(fnv1a_32(b"foobar"), 0xbf9cf968);
    }

    #[test]
    fn test_stable_id_is_deterministic() {
        let hash = InfoHash::parse(HEX).unwrap();
        assert_eq!(hash.stable_id(), hash.stable_id());
        assert_eq!(hash.stable_id().hash, HEX);
        assert!(hash.stable_id().id >= 0);
        assert!(hash.stable_id().id <= i64::from(u32::MAX));
    }

    #[test]
    fn test_stable_id_ignores_hex_case() {
        let lower = InfoHash::parse(HEX).unwrap();
        let upper = InfoHash::parse(&HEX.to_uppercase()).unwrap();
        assert_eq!(lower.stable_id(), upper.stable_id());
    }

    #[test]
    fn test_stable_id_differs_for_different_hashes() {
        let a = InfoHash::new([1u8; 20]);
        let b = InfoHash::new([2u8; 20]);
        assert_ne!(a.stable_id().id, b.stable_id().id);
    }

    #[test]
    fn test_base32_matches_hex() {
        let from_hex = InfoHash::parse(HEX).unwrap();
        let base32 = "YEX6DQDLXISUVHOJ6UM3GNNKPQJWPKEK";
        let from_b32 = InfoHash::parse(base32).unwrap();
        assert_eq!(from_hex, from_b32);
        assert_eq!(from_hex, InfoHash::parse(&base32.to_lowercase()).unwrap());
    }

    #[test]
    fn test_matches_hash_case_insensitive() {
        let id = InfoHash::parse(HEX).unwrap().stable_id();
        assert!(id.matches_hash(&HEX.to_uppercase()));
        assert!(!id.matches_hash("deadbeef"));
    }

    #[test]
    fn test_bad_hash_rejected() {
        assert!(matches!(
            InfoHash::parse("xyz"),
            Err(ResolveError::MalformedMagnet(_))
        ));
        assert!(InfoHash::parse(&"g".repeat(40)).is_err());
    }
}
