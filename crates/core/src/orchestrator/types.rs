//! Types for the transfer orchestrator.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::infohash::{Magnet, ResolveError};
use crate::remote::RemoteError;

/// Errors that end a submission.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The magnet or torrent data supplied was unusable. Never retried.
    #[error(transparent)]
    Input(#[from] ResolveError),

    /// A call to the remote service failed.
    #[error("remote service error: {0}")]
    Remote(#[from] RemoteError),

    /// The lifetime ceiling passed before the transfer finished.
    /// The remote transfer is left in place.
    #[error("transfer for {name} taking too long, giving up after {elapsed_secs}s")]
    Timeout { name: String, elapsed_secs: u64 },

    /// Creating directories or writing files failed.
    #[error("local I/O error on {path}: {source}")]
    LocalIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Where a submission comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionSource {
    /// A magnet URI given directly (RPC `torrent-add`).
    Magnet(String),
    /// A local `.torrent` file.
    TorrentFile(PathBuf),
    /// A local file whose contents are a magnet URI.
    MagnetFile(PathBuf),
}

impl SubmissionSource {
    /// Local file to mark `.done`/`.error` once the fetch concludes.
    pub fn local_path(&self) -> Option<&Path> {
        match self {
            SubmissionSource::Magnet(_) => None,
            SubmissionSource::TorrentFile(path) | SubmissionSource::MagnetFile(path) => Some(path),
        }
    }

    /// Human-readable label for logs before the remote name is known.
    pub fn label(&self) -> String {
        match self {
            SubmissionSource::Magnet(uri) => Magnet::parse(uri)
                .map(|m| m.name())
                .unwrap_or_else(|_| uri.clone()),
            SubmissionSource::TorrentFile(path) | SubmissionSource::MagnetFile(path) => path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string()),
        }
    }
}

/// One request to fetch a torrent's content into `target_dir`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub source: SubmissionSource,
    pub target_dir: PathBuf,
}

impl Submission {
    pub fn magnet(uri: impl Into<String>, target_dir: impl Into<PathBuf>) -> Self {
        Self {
            source: SubmissionSource::Magnet(uri.into()),
            target_dir: target_dir.into(),
        }
    }

    pub fn torrent_file(path: impl Into<PathBuf>, target_dir: impl Into<PathBuf>) -> Self {
        Self {
            source: SubmissionSource::TorrentFile(path.into()),
            target_dir: target_dir.into(),
        }
    }

    pub fn magnet_file(path: impl Into<PathBuf>, target_dir: impl Into<PathBuf>) -> Self {
        Self {
            source: SubmissionSource::MagnetFile(path.into()),
            target_dir: target_dir.into(),
        }
    }
}

/// Outcome of one submission. Exactly one is reported per submission.
#[derive(Debug)]
pub struct FetchResult {
    pub error: Option<FetchError>,
    pub name: String,
    pub download_dir: PathBuf,
}

impl FetchResult {
    pub fn success(name: impl Into<String>, download_dir: impl Into<PathBuf>) -> Self {
        Self {
            error: None,
            name: name.into(),
            download_dir: download_dir.into(),
        }
    }

    pub fn failure(
        error: FetchError,
        name: impl Into<String>,
        download_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            error: Some(error),
            name: name.into(),
            download_dir: download_dir.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_path() {
        assert!(Submission::magnet("magnet:?xt=x", "/dl")
            .source
            .local_path()
            .is_none());
        let sub = Submission::torrent_file("/hole/a.torrent", "/dl");
        assert_eq!(sub.source.local_path(), Some(Path::new("/hole/a.torrent")));
    }

    #[test]
    fn test_label() {
        let magnet = Submission::magnet(
            "magnet:?xt=urn:btih:c12fe1c06bba254a9dc9f519b335aa7c1367a88a&dn=Ubuntu",
            "/dl",
        );
        assert_eq!(magnet.source.label(), "Ubuntu");
        assert_eq!(Submission::magnet("junk", "/dl").source.label(), "junk");
        assert_eq!(
            Submission::magnet_file("/hole/tv/show.magnet", "/dl").source.label(),
            "show.magnet"
        );
    }

    #[test]
    fn test_error_display() {
        let err = FetchError::Timeout {
            name: "Big.Torrent".to_string(),
            elapsed_secs: 86401,
        };
        assert_eq!(
            err.to_string(),
            "transfer for Big.Torrent taking too long, giving up after 86401s"
        );

        let err = FetchError::from(ResolveError::MalformedMagnet("bad".to_string()));
        assert_eq!(err.to_string(), "malformed magnet: bad");
    }
}
