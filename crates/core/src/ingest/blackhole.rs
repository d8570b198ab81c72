//! Blackhole directory watcher.
//!
//! Polls a drop directory recursively and hands every new or rewritten
//! `.torrent`/`.magnet` file to the orchestrator, targeting the download
//! directory that mirrors the file's position under the watch root.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{Config as NotifyConfig, Event, EventKind, PollWatcher, RecursiveMode, Watcher};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::BlackholeConfig;
use crate::orchestrator::{Submission, TransferOrchestrator};

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("blackhole directory {0} does not exist")]
    WatchRootMissing(PathBuf),

    #[error("failed to watch blackhole directory: {0}")]
    Watch(#[from] notify::Error),
}

/// Kind of file dropped into the blackhole.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropKind {
    Torrent,
    Magnet,
}

impl DropKind {
    pub fn of(path: &Path) -> Option<Self> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("torrent") => Some(DropKind::Torrent),
            Some("magnet") => Some(DropKind::Magnet),
            _ => None,
        }
    }
}

/// Download directory for a dropped file: its parent directory with the watch
/// root replaced by the download root, keeping any category subdirectories.
pub fn download_dir_for(file: &Path, watch_root: &Path, download_root: &Path) -> PathBuf {
    let base: PathBuf = download_root.components().collect();
    let parent = file.parent().unwrap_or_else(|| Path::new(""));

    match parent.strip_prefix(watch_root) {
        Ok(rel) if rel.as_os_str().is_empty() => base,
        Ok(rel) => base.join(rel),
        Err(_) => {
            warn!(
                "{} is outside {}, using download root",
                file.display(),
                watch_root.display()
            );
            base
        }
    }
}

/// Watches the blackhole directory and submits dropped files.
pub struct BlackholeWatcher {
    config: BlackholeConfig,
    orchestrator: TransferOrchestrator,
}

impl BlackholeWatcher {
    pub fn new(config: BlackholeConfig, orchestrator: TransferOrchestrator) -> Self {
        Self {
            config,
            orchestrator,
        }
    }

    /// Build the submission for a dropped file, if it is one we handle.
    pub fn submission_for(&self, path: &Path) -> Option<Submission> {
        let target = download_dir_for(path, &self.config.watch_dir, &self.config.download_dir);
        match DropKind::of(path)? {
            DropKind::Torrent => Some(Submission::torrent_file(path, target)),
            DropKind::Magnet => Some(Submission::magnet_file(path, target)),
        }
    }

    /// Start watching. Fails immediately if the watch root is missing.
    ///
    /// The returned task owns the underlying watcher and runs until aborted.
    pub fn start(self) -> Result<JoinHandle<()>, IngestError> {
        let root = self.config.watch_dir.clone();
        if !root.is_dir() {
            return Err(IngestError::WatchRootMissing(root));
        }

        let interval = Duration::from_millis(self.config.poll_interval_ms.max(1));
        let (tx, rx) = mpsc::channel::<PathBuf>(512);

        let mut watcher = PollWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) if matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_)) => {
                    for path in event.paths {
                        if DropKind::of(&path).is_some() {
                            let _ = tx.blocking_send(path);
                        }
                    }
                }
                Ok(_) => {}
                Err(e) => warn!("Blackhole watch error: {}", e),
            },
            NotifyConfig::default().with_poll_interval(interval),
        )?;
        watcher.watch(&root, RecursiveMode::Recursive)?;
        info!("Watching {} for .torrent and .magnet files...", root.display());

        Ok(tokio::spawn(async move {
            let _watcher = watcher;
            self.dispatch_loop(rx, interval).await;
        }))
    }

    /// Coalesce bursts of events and dispatch each file at most once while
    /// it is still in flight (it is renamed when its fetch concludes).
    async fn dispatch_loop(&self, mut rx: mpsc::Receiver<PathBuf>, window: Duration) {
        let mut in_flight: HashSet<PathBuf> = HashSet::new();

        while let Some(first) = rx.recv().await {
            tokio::time::sleep(window).await;
            let mut batch = vec![first];
            while let Ok(path) = rx.try_recv() {
                batch.push(path);
            }

            in_flight.retain(|p| p.exists());

            for path in batch {
                if in_flight.contains(&path) || !path.exists() {
                    debug!("Skipping {}", path.display());
                    continue;
                }
                if let Some(submission) = self.submission_for(&path) {
                    info!(
                        "Dispatching {} to {}",
                        path.display(),
                        submission.target_dir.display()
                    );
                    self.orchestrator.submit(submission);
                    in_flight.insert(path);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tempfile::TempDir;

    use crate::infohash::{HttpMetainfoFetcher, InfoHashResolver};
    use crate::orchestrator::{FetchResult, OrchestratorConfig, ResultHandle};
    use crate::testing::{fixtures, MockRemoteService};

    fn dir(file: &str, root: &str, download: &str) -> PathBuf {
        download_dir_for(Path::new(file), Path::new(root), Path::new(download))
    }

    #[test]
    fn test_download_dir_at_root() {
        assert_eq!(dir("/hole/test.torrent", "/hole", "/download"), PathBuf::from("/download"));
    }

    #[test]
    fn test_download_dir_with_category() {
        assert_eq!(
            dir("/hole/Movies/x.torrent", "/hole", "/download"),
            PathBuf::from("/download/Movies")
        );
    }

    #[test]
    fn test_download_dir_with_nested_category() {
        assert_eq!(
            dir("/hole/Movie/Foo/bar.magnet", "/hole", "/download"),
            PathBuf::from("/download/Movie/Foo")
        );
    }

    #[test]
    fn test_download_dir_blackhole_under_download() {
        let got = dir(
            "/export/nas/Downloads/Torrents/test.torrent",
            "/export/nas/Downloads/Torrents/",
            "/export/nas/Downloads/",
        );
        assert_eq!(got.to_str(), Some("/export/nas/Downloads"));
    }

    #[test]
    fn test_drop_kind() {
        assert_eq!(DropKind::of(Path::new("/a/b.torrent")), Some(DropKind::Torrent));
        assert_eq!(DropKind::of(Path::new("/a/b.magnet")), Some(DropKind::Magnet));
        assert_eq!(DropKind::of(Path::new("/a/b.torrent.done")), None);
        assert_eq!(DropKind::of(Path::new("/a/b.mp4")), None);
    }

    async fn watcher_for(
        watch_dir: &Path,
        download_dir: &Path,
    ) -> (BlackholeWatcher, Arc<MockRemoteService>, mpsc::Receiver<FetchResult>) {
        let remote = Arc::new(MockRemoteService::new());
        remote.add_file(100, None, "x.mkv", b"frames").await;
        remote.set_transfer_root(100).await;

        let fetcher = Arc::new(HttpMetainfoFetcher::new(Duration::from_secs(1)).unwrap());
        let (tx, rx) = mpsc::channel(8);
        let orchestrator = TransferOrchestrator::new(
            OrchestratorConfig::default(),
            remote.clone(),
            Arc::new(InfoHashResolver::new(fetcher)),
            ResultHandle::new(tx),
        );
        let config = BlackholeConfig {
            watch_dir: watch_dir.to_path_buf(),
            download_dir: download_dir.to_path_buf(),
            poll_interval_ms: 20,
        };
        (BlackholeWatcher::new(config, orchestrator), remote, rx)
    }

    #[tokio::test]
    async fn test_dispatch_submits_each_file_once() {
        let temp = TempDir::new().unwrap();
        let hole = temp.path().join("hole");
        let download = temp.path().join("download");
        std::fs::create_dir_all(hole.join("Movies")).unwrap();
        let dropped = hole.join("Movies").join("x.torrent");
        std::fs::write(&dropped, fixtures::sample_torrent("x.mkv").0).unwrap();

        let (watcher, remote, mut results) = watcher_for(&hole, &download).await;
        let (tx, rx) = mpsc::channel(8);
        tx.send(dropped.clone()).await.unwrap();
        tx.send(dropped.clone()).await.unwrap();
        tx.send(hole.join("vanished.magnet")).await.unwrap();
        drop(tx);

        watcher.dispatch_loop(rx, Duration::from_millis(10)).await;

        let result = tokio::time::timeout(Duration::from_secs(5), results.recv())
            .await
            .expect("result should arrive")
            .unwrap();
        assert!(result.is_success(), "{:?}", result.error);
        assert_eq!(result.download_dir, download.join("Movies"));
        assert_eq!(remote.added_magnets().await.len(), 1);
        assert!(results.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_start_requires_watch_root() {
        let temp = TempDir::new().unwrap();
        let (watcher, _remote, _results) =
            watcher_for(&temp.path().join("missing"), temp.path()).await;

        assert!(matches!(
            watcher.start(),
            Err(IngestError::WatchRootMissing(_))
        ));
    }
}
