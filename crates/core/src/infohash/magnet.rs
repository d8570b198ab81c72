use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use super::{InfoHash, ResolveError, StableId};

const BTIH_PREFIX: &str = "urn:btih:";

/// A parsed magnet reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Magnet {
    pub info_hash: InfoHash,
    pub display_name: Option<String>,
    pub trackers: Vec<String>,
}

impl Magnet {
    pub fn new(info_hash: InfoHash, display_name: Option<String>) -> Self {
        Self {
            info_hash,
            display_name,
            trackers: Vec::new(),
        }
    }

    /// Parse a `magnet:?xt=urn:btih:...` URI.
    ///
    /// Accepts hex (40 chars) and base32 (32 chars) info-hashes in either case.
    /// Surrounding whitespace is ignored so the contents of a `.magnet` file can
    /// be passed as-is.
    pub fn parse(uri: &str) -> Result<Self, ResolveError> {
        let uri = uri.trim();
        if !uri.starts_with("magnet:") {
            return Err(ResolveError::MalformedMagnet(format!(
                "not a magnet URI: {}",
                truncate(uri)
            )));
        }

        let parsed = librqbit_core::magnet::Magnet::parse(&uppercase_btih(uri))
            .map_err(|e| ResolveError::MalformedMagnet(format!("{}: {:#}", truncate(uri), e)))?;
        let info_hash = parsed.as_id20().map(InfoHash::from).ok_or_else(|| {
            ResolveError::MalformedMagnet("magnet has no urn:btih info-hash".to_string())
        })?;

        Ok(Self {
            info_hash,
            display_name: parsed.name,
            trackers: parsed.trackers,
        })
    }

    pub fn stable_id(&self) -> StableId {
        self.info_hash.stable_id()
    }

    /// Display name, falling back to the hex hash.
    pub fn name(&self) -> String {
        self.display_name
            .clone()
            .unwrap_or_else(|| self.info_hash.to_hex())
    }
}

impl FromStr for Magnet {
    type Err = ResolveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Magnet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "magnet:?xt={}{}", BTIH_PREFIX, self.info_hash.to_hex())?;
        if let Some(name) = &self.display_name {
            write!(f, "&dn={}", urlencoding::encode(name))?;
        }
        for tracker in &self.trackers {
            write!(f, "&tr={}", urlencoding::encode(tracker))?;
        }
        Ok(())
    }
}

/// `Id20` only decodes uppercase base32; hex is case-insensitive either way.
fn uppercase_btih(uri: &str) -> Cow<'_, str> {
    let Some(start) = uri.find(BTIH_PREFIX).map(|i| i + BTIH_PREFIX.len()) else {
        return Cow::Borrowed(uri);
    };
    let end = uri[start..].find('&').map_or(uri.len(), |i| start + i);
    Cow::Owned(format!(
        "{}{}{}",
        &uri[..start],
        uri[start..end].to_ascii_uppercase(),
        &uri[end..]
    ))
}

fn truncate(s: &str) -> String {
    s.chars().take(64).collect()
}
