//! Transfer orchestrator implementation.

use std::collections::VecDeque;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::StreamExt;
use tokio::io::AsyncWriteExt;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::infohash::{InfoHashResolver, Magnet};
use crate::remote::{RemoteError, RemoteFile, RemoteService, RemoteTransfer};

use super::config::OrchestratorConfig;
use super::sink::ResultHandle;
use super::types::{FetchError, FetchResult, Submission, SubmissionSource};

/// Drives submissions through submit, poll, download and cleanup.
///
/// Cloning is cheap; every clone shares the same remote service, resolver,
/// result sink and concurrency limit.
#[derive(Clone)]
pub struct TransferOrchestrator {
    config: OrchestratorConfig,
    remote: Arc<dyn RemoteService>,
    resolver: Arc<InfoHashResolver>,
    results: ResultHandle,
    limiter: Option<Arc<Semaphore>>,
}

impl TransferOrchestrator {
    pub fn new(
        config: OrchestratorConfig,
        remote: Arc<dyn RemoteService>,
        resolver: Arc<InfoHashResolver>,
        results: ResultHandle,
    ) -> Self {
        let limiter = match config.max_concurrent_transfers {
            0 => None,
            n => Some(Arc::new(Semaphore::new(n))),
        };

        Self {
            config,
            remote,
            resolver,
            results,
            limiter,
        }
    }

    pub fn resolver(&self) -> &Arc<InfoHashResolver> {
        &self.resolver
    }

    pub fn submit_magnet(&self, uri: impl Into<String>, target_dir: impl Into<PathBuf>) -> JoinHandle<()> {
        self.submit(Submission::magnet(uri, target_dir))
    }

    pub fn submit_torrent_file(
        &self,
        path: impl Into<PathBuf>,
        target_dir: impl Into<PathBuf>,
    ) -> JoinHandle<()> {
        self.submit(Submission::torrent_file(path, target_dir))
    }

    pub fn submit_magnet_file(
        &self,
        path: impl Into<PathBuf>,
        target_dir: impl Into<PathBuf>,
    ) -> JoinHandle<()> {
        self.submit(Submission::magnet_file(path, target_dir))
    }

    /// Spawn a task for the submission. Its result goes to the result sink.
    ///
    /// Without `max_concurrent_transfers` every submission runs immediately,
    /// so heavy ingestion means as many concurrent polls and downloads.
    pub fn submit(&self, submission: Submission) -> JoinHandle<()> {
        let this = self.clone();
        tokio::spawn(async move {
            let _permit = match &this.limiter {
                Some(limiter) => Arc::clone(limiter).acquire_owned().await.ok(),
                None => None,
            };
            let result = this.run(submission).await;
            this.results.report(result).await;
        })
    }

    /// Run the full lifecycle of one submission and return its result.
    ///
    /// A local source file is renamed `.done` or `.error` after the fetch
    /// concludes, on every path.
    pub async fn run(&self, submission: Submission) -> FetchResult {
        let label = submission.source.label();
        info!(source = %label, dir = %submission.target_dir.display(), "Starting fetch");

        let outcome = self.fetch(&submission).await;

        if let Some(path) = submission.source.local_path() {
            mark_original(path, outcome.is_ok()).await;
        }

        match outcome {
            Ok(name) => FetchResult::success(name, submission.target_dir),
            Err(e) => FetchResult::failure(e, label, submission.target_dir),
        }
    }

    async fn fetch(&self, submission: &Submission) -> Result<String, FetchError> {
        let magnet_uri = self.resolve(&submission.source).await?;

        let started = Instant::now();
        let transfer = self.remote.add_transfer(&magnet_uri).await?;
        info!(id = transfer.id, name = %transfer.name, "Submitted to {}", self.remote.name());

        let finished = self.poll_until_finished(&transfer, started).await?;
        self.materialize(&finished, &submission.target_dir).await?;
        self.cleanup(&finished).await;

        Ok(finished.name)
    }

    async fn resolve(&self, source: &SubmissionSource) -> Result<String, FetchError> {
        let uri = match source {
            SubmissionSource::Magnet(uri) => {
                Magnet::parse(uri)?;
                uri.trim().to_string()
            }
            SubmissionSource::TorrentFile(path) => {
                self.resolver.resolve_torrent_file(path).await?.to_string()
            }
            SubmissionSource::MagnetFile(path) => {
                self.resolver.resolve_magnet_file(path).await?.to_string()
            }
        };
        Ok(uri)
    }

    async fn poll_until_finished(
        &self,
        transfer: &RemoteTransfer,
        started: Instant,
    ) -> Result<RemoteTransfer, FetchError> {
        let max_lifetime = Duration::from_secs(self.config.max_lifetime_secs);

        loop {
            let elapsed = started.elapsed();
            if elapsed > max_lifetime {
                return Err(FetchError::Timeout {
                    name: transfer.name.clone(),
                    elapsed_secs: elapsed.as_secs(),
                });
            }

            let current = self.remote.get_transfer(transfer.id).await?;
            if current.status.is_finished() {
                return Ok(current);
            }

            let queued_for = current
                .created_at
                .map(|created| (Utc::now() - created).to_std().unwrap_or(Duration::ZERO));
            let delay = self
                .config
                .backoff
                .poll_delay(current.estimated_secs, queued_for);

            info!(
                id = current.id,
                status = current.status.as_str(),
                "Sleeping {} seconds for {}",
                delay.as_secs(),
                current.name
            );
            tokio::time::sleep(delay).await;
        }
    }

    /// Copy the transfer's file tree under `target_dir`.
    async fn materialize(&self, transfer: &RemoteTransfer, target_dir: &Path) -> Result<(), FetchError> {
        let file_id = transfer.file_id.ok_or_else(|| {
            RemoteError::NotFound(format!(
                "transfer {} finished without a file",
                transfer.id
            ))
        })?;

        info!("Starting download of {} to {}", transfer.name, target_dir.display());
        let root = self.remote.get_file(file_id).await?;

        let mut pending: VecDeque<(RemoteFile, PathBuf)> = VecDeque::new();
        pending.push_back((root, target_dir.to_path_buf()));

        while let Some((node, dir)) = pending.pop_front() {
            if node.is_dir() {
                let subdir = dir.join(safe_component(&node.name, &dir)?);
                for child in self.remote.list_files(node.id).await? {
                    pending.push_back((child, subdir.clone()));
                }
            } else {
                self.download_file(&node, &dir).await?;
            }
        }

        Ok(())
    }

    async fn download_file(&self, file: &RemoteFile, dir: &Path) -> Result<(), FetchError> {
        let mut stream = self.remote.download(file.id).await?;

        create_dir_all(dir).await?;
        let path = dir.join(safe_component(&file.name, dir)?);
        let local_io = |source: std::io::Error| FetchError::LocalIo {
            path: path.clone(),
            source,
        };

        let mut out = tokio::fs::File::create(&path).await.map_err(local_io)?;
        make_permissive(&path, FILE_MODE).await.map_err(local_io)?;
        while let Some(chunk) = stream.next().await {
            out.write_all(&chunk?).await.map_err(local_io)?;
        }
        out.flush().await.map_err(local_io)?;

        info!("Done with download of {} to {}", file.name, dir.display());
        Ok(())
    }

    /// Remove the remote copy. Failures are logged; the local copy already exists.
    async fn cleanup(&self, transfer: &RemoteTransfer) {
        if let Some(file_id) = transfer.file_id {
            if let Err(e) = self.remote.delete_file(file_id).await {
                warn!("Unable to remove completed download {}: {}", transfer.name, e);
            }
        }
        if let Err(e) = self.remote.clean_transfers().await {
            warn!("Unable to clean transfer list after {}: {}", transfer.name, e);
        }
    }
}

/// Reject names that would escape the directory they are written into.
fn safe_component<'a>(name: &'a str, dir: &Path) -> Result<&'a str, FetchError> {
    if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\']) {
        return Err(FetchError::LocalIo {
            path: dir.join(name),
            source: std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("refusing remote file name {:?}", name),
            ),
        });
    }
    Ok(name)
}

/// Create `dir` and any missing parents, each world-writable regardless of umask.
async fn create_dir_all(dir: &Path) -> Result<(), FetchError> {
    let local_io = |path: &Path, source: std::io::Error| FetchError::LocalIo {
        path: path.to_path_buf(),
        source,
    };

    let mut missing = Vec::new();
    for ancestor in dir.ancestors() {
        if ancestor.as_os_str().is_empty()
            || tokio::fs::try_exists(ancestor)
                .await
                .map_err(|e| local_io(ancestor, e))?
        {
            break;
        }
        missing.push(ancestor);
    }

    for path in missing.into_iter().rev() {
        match tokio::fs::create_dir(path).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {}
            Err(e) => return Err(local_io(path, e)),
        }
        make_permissive(path, DIR_MODE)
            .await
            .map_err(|e| local_io(path, e))?;
    }
    Ok(())
}

const DIR_MODE: u32 = 0o777;
const FILE_MODE: u32 = 0o666;

#[cfg(unix)]
async fn make_permissive(path: &Path, mode: u32) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(mode)).await
}

#[cfg(not(unix))]
async fn make_permissive(_path: &Path, _mode: u32) -> std::io::Result<()> {
    Ok(())
}

/// Rename the source file with a `.done` or `.error` suffix.
async fn mark_original(path: &Path, success: bool) {
    let renamed = with_suffix(path, if success { ".done" } else { ".error" });
    match tokio::fs::rename(path, &renamed).await {
        Ok(()) => debug!("Renamed {} to {}", path.display(), renamed.display()),
        Err(e) => warn!("Unable to rename {}: {}", path.display(), e),
    }
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}
