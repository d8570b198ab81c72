//! Transfer lifecycle integration tests.
//!
//! These tests drive submissions through the orchestrator against the mock
//! remote service: submit -> poll -> download -> cleanup -> done.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;
use tokio::sync::mpsc;

use transfer_relay_core::{
    remote::TransferStatus,
    testing::{fixtures, MockOp, MockRemoteService},
    BackoffPolicy, FetchError, FetchResult, HttpMetainfoFetcher, InfoHashResolver,
    OrchestratorConfig, ResultHandle, Submission, TransferOrchestrator,
};

/// Test helper holding the orchestrator, the mock and a scratch directory.
struct TestHarness {
    remote: Arc<MockRemoteService>,
    orchestrator: TransferOrchestrator,
    results: mpsc::Receiver<FetchResult>,
    temp_dir: TempDir,
}

impl TestHarness {
    fn new() -> Self {
        Self::with_config(fast_config())
    }

    fn with_config(config: OrchestratorConfig) -> Self {
        let remote = Arc::new(MockRemoteService::new());
        let fetcher =
            Arc::new(HttpMetainfoFetcher::new(Duration::from_secs(1)).expect("fetcher"));
        let (tx, rx) = mpsc::channel(16);

        let orchestrator = TransferOrchestrator::new(
            config,
            remote.clone(),
            Arc::new(InfoHashResolver::new(fetcher)),
            ResultHandle::new(tx),
        );

        Self {
            remote,
            orchestrator,
            results: rx,
            temp_dir: TempDir::new().expect("Failed to create temp dir"),
        }
    }

    fn hole(&self) -> PathBuf {
        let dir = self.temp_dir.path().join("hole");
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn download(&self) -> PathBuf {
        self.temp_dir.path().join("download")
    }

    fn drop_magnet_file(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.hole().join(name);
        std::fs::write(&path, contents).unwrap();
        path
    }

    fn drop_torrent_file(&self, name: &str, torrent_name: &str) -> PathBuf {
        let path = self.hole().join(name);
        std::fs::write(&path, fixtures::sample_torrent(torrent_name).0).unwrap();
        path
    }

    /// A single-file transfer root.
    async fn single_file(&self, name: &str, content: &[u8]) {
        self.remote.add_file(100, None, name, content).await;
        self.remote.set_transfer_root(100).await;
    }
}

/// Backoff without jitter so scripted polls run back to back.
fn fast_config() -> OrchestratorConfig {
    OrchestratorConfig {
        backoff: BackoffPolicy {
            queued_jitter_secs: 0,
            eta_jitter_secs: 0,
            ..Default::default()
        },
        ..Default::default()
    }
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    PathBuf::from(format!("{}{}", path.display(), suffix))
}

#[tokio::test]
async fn test_torrent_file_success_marks_done() {
    let harness = TestHarness::new();
    harness.single_file("album.flac", b"lossless").await;
    let source = harness.drop_torrent_file("album.torrent", "album.flac");

    let result = harness
        .orchestrator
        .run(Submission::torrent_file(&source, harness.download()))
        .await;

    assert!(result.is_success(), "{:?}", result.error);
    assert_eq!(result.name, "album.flac");
    assert_eq!(result.download_dir, harness.download());
    assert_eq!(
        std::fs::read(harness.download().join("album.flac")).unwrap(),
        b"lossless"
    );
    assert!(!source.exists());
    assert!(with_suffix(&source, ".done").exists());

    let added = harness.remote.added_magnets().await;
    assert_eq!(added.len(), 1);
    assert!(added[0].starts_with("magnet:?xt=urn:btih:"));
    assert_eq!(harness.remote.deleted_files().await, vec![100]);
    assert_eq!(harness.remote.clean_calls().await, 1);
}

#[tokio::test]
async fn test_cleanup_failure_still_succeeds() {
    let harness = TestHarness::new();
    harness.single_file("movie.mkv", b"frames").await;
    harness.remote.fail_on(MockOp::DeleteFile).await;
    harness.remote.fail_on(MockOp::CleanTransfers).await;
    let source = harness.drop_magnet_file("movie.magnet", &fixtures::magnet_uri("Movie"));

    let result = harness
        .orchestrator
        .run(Submission::magnet_file(&source, harness.download()))
        .await;

    assert!(result.is_success(), "{:?}", result.error);
    assert!(with_suffix(&source, ".done").exists());
    assert!(!with_suffix(&source, ".error").exists());
    assert!(harness.download().join("movie.mkv").exists());
}

#[tokio::test]
async fn test_submit_failure_marks_error() {
    let harness = TestHarness::new();
    harness.remote.fail_on(MockOp::AddTransfer).await;
    let source = harness.drop_magnet_file("show.magnet", &fixtures::magnet_uri("Show"));

    let result = harness
        .orchestrator
        .run(Submission::magnet_file(&source, harness.download()))
        .await;

    assert!(matches!(result.error, Some(FetchError::Remote(_))));
    assert_eq!(result.name, "show.magnet");
    assert!(with_suffix(&source, ".error").exists());
    assert!(!with_suffix(&source, ".done").exists());
}

#[tokio::test]
async fn test_malformed_magnet_file_is_never_submitted() {
    let harness = TestHarness::new();
    let source = harness.drop_magnet_file("bad.magnet", "http://not-a-magnet");

    let result = harness
        .orchestrator
        .run(Submission::magnet_file(&source, harness.download()))
        .await;

    assert!(matches!(result.error, Some(FetchError::Input(_))));
    assert!(with_suffix(&source, ".error").exists());
    assert!(harness.remote.added_magnets().await.is_empty());
}

#[tokio::test]
async fn test_malformed_torrent_file_marks_error() {
    let harness = TestHarness::new();
    let path = harness.hole().join("broken.torrent");
    std::fs::write(&path, b"d4:spam4:eggse").unwrap();

    let result = harness
        .orchestrator
        .run(Submission::torrent_file(&path, harness.download()))
        .await;

    assert!(matches!(result.error, Some(FetchError::Input(_))));
    assert!(with_suffix(&path, ".error").exists());
}

#[tokio::test]
async fn test_polls_through_queued_and_error_states() {
    let harness = TestHarness::new();
    harness
        .remote
        .set_status_script(vec![
            TransferStatus::Queued,
            TransferStatus::Error,
            TransferStatus::Downloading,
            TransferStatus::Seeding,
        ])
        .await;
    harness.single_file("file.iso", b"iso").await;

    let result = harness
        .orchestrator
        .run(Submission::magnet(
            fixtures::magnet_uri("Distro"),
            harness.download(),
        ))
        .await;

    assert!(result.is_success(), "{:?}", result.error);
    assert!(harness.download().join("file.iso").exists());
}

#[tokio::test]
async fn test_get_transfer_failure_is_terminal() {
    let harness = TestHarness::new();
    harness.remote.fail_on(MockOp::GetTransfer).await;

    let result = harness
        .orchestrator
        .run(Submission::magnet(fixtures::magnet_uri("X"), harness.download()))
        .await;

    assert!(matches!(result.error, Some(FetchError::Remote(_))));
}

#[tokio::test]
async fn test_nested_tree_is_materialized() {
    let harness = TestHarness::new();
    harness.remote.add_dir(10, None, "Show S01").await;
    harness.remote.add_file(11, Some(10), "e01.mkv", b"one").await;
    harness.remote.add_file(12, Some(10), "e02.mkv", b"two").await;
    harness.remote.add_dir(13, Some(10), "Extras").await;
    harness.remote.add_file(14, Some(13), "bonus.mkv", b"bonus").await;
    harness.remote.set_transfer_root(10).await;

    let target = harness.download().join("TV");
    let result = harness
        .orchestrator
        .run(Submission::magnet(fixtures::magnet_uri("Show S01"), &target))
        .await;

    assert!(result.is_success(), "{:?}", result.error);
    let show = target.join("Show S01");
    assert_eq!(std::fs::read(show.join("e01.mkv")).unwrap(), b"one");
    assert_eq!(std::fs::read(show.join("e02.mkv")).unwrap(), b"two");
    assert_eq!(
        std::fs::read(show.join("Extras").join("bonus.mkv")).unwrap(),
        b"bonus"
    );
    assert_eq!(harness.remote.deleted_files().await, vec![10]);
}

#[cfg(unix)]
#[tokio::test]
async fn test_materialized_paths_are_world_writable() {
    use std::os::unix::fs::PermissionsExt;

    let harness = TestHarness::new();
    harness.remote.add_dir(10, None, "Show").await;
    harness.remote.add_file(11, Some(10), "e01.mkv", b"one").await;
    harness.remote.set_transfer_root(10).await;

    let target = harness.download().join("TV");
    let result = harness
        .orchestrator
        .run(Submission::magnet(fixtures::magnet_uri("Show"), &target))
        .await;
    assert!(result.is_success(), "{:?}", result.error);

    let mode = |path: PathBuf| std::fs::metadata(path).unwrap().permissions().mode();
    for dir in [harness.download(), target.clone(), target.join("Show")] {
        assert_eq!(mode(dir.clone()) & 0o777, 0o777, "{}", dir.display());
    }
    let file = target.join("Show").join("e01.mkv");
    assert_eq!(mode(file.clone()) & 0o666, 0o666, "{}", file.display());
}

#[tokio::test]
async fn test_download_failure_aborts_submission() {
    let harness = TestHarness::new();
    harness.single_file("a.bin", b"a").await;
    harness.remote.fail_on(MockOp::Download).await;
    let source = harness.drop_magnet_file("a.magnet", &fixtures::magnet_uri("A"));

    let result = harness
        .orchestrator
        .run(Submission::magnet_file(&source, harness.download()))
        .await;

    assert!(matches!(result.error, Some(FetchError::Remote(_))));
    assert!(with_suffix(&source, ".error").exists());
    assert!(harness.remote.deleted_files().await.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_lifetime_ceiling_times_out() {
    let harness = TestHarness::with_config(OrchestratorConfig {
        max_lifetime_secs: 600,
        ..Default::default()
    });
    harness
        .remote
        .set_status_script(vec![TransferStatus::Downloading])
        .await;

    let result = harness
        .orchestrator
        .run(Submission::magnet(fixtures::magnet_uri("Slow"), "/unused"))
        .await;

    match result.error {
        Some(FetchError::Timeout { name, elapsed_secs }) => {
            assert_eq!(name, "Slow");
            assert!(elapsed_secs >= 600);
        }
        other => panic!("expected timeout, got {:?}", other),
    }
    // The remote transfer is left alone.
    assert!(harness.remote.deleted_files().await.is_empty());
    assert_eq!(harness.remote.clean_calls().await, 0);
    assert_eq!(harness.remote.transfer_count().await, 1);
}

#[tokio::test]
async fn test_each_submission_reports_exactly_one_result() {
    let mut harness = TestHarness::with_config(OrchestratorConfig {
        max_concurrent_transfers: 1,
        ..fast_config()
    });
    harness.single_file("x.bin", b"x").await;
    let good = harness.drop_magnet_file("good.magnet", &fixtures::magnet_uri("Good"));
    let bad = harness.drop_magnet_file("bad.magnet", "garbage");

    let handles = vec![
        harness
            .orchestrator
            .submit_magnet_file(&good, harness.download()),
        harness
            .orchestrator
            .submit_magnet_file(&bad, harness.download()),
    ];
    for handle in handles {
        handle.await.unwrap();
    }

    let mut outcomes = Vec::new();
    while let Ok(result) = harness.results.try_recv() {
        outcomes.push(result.is_success());
    }
    outcomes.sort();
    assert_eq!(outcomes, vec![false, true]);
}
