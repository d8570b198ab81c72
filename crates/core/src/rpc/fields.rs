//! Mapping of remote transfers onto `torrent-get` entries.

use std::collections::HashSet;
use std::path::Path;

use crate::infohash::StableId;
use crate::remote::{RemoteTransfer, TransferStatus};

use super::{TorrentFileInfo, TorrentInfo};

/// Transmission activity codes.
pub const STATUS_DOWNLOAD_WAIT: i64 = 3;
pub const STATUS_DOWNLOAD: i64 = 4;
pub const STATUS_SEED: i64 = 6;
/// Not a Transmission code; reported for anything we do not recognise.
pub const STATUS_UNKNOWN: i64 = 7;

/// Transmission `error` value for a local error.
const ERROR_LOCAL: i64 = 3;

/// Remote status to protocol activity code.
///
/// Completed transfers report as downloading: the local copy is still being
/// made, and the remote copy disappears right after.
pub fn status_code(status: TransferStatus) -> i64 {
    match status {
        TransferStatus::Downloading | TransferStatus::Completed => STATUS_DOWNLOAD,
        TransferStatus::Queued => STATUS_DOWNLOAD_WAIT,
        TransferStatus::Seeding => STATUS_SEED,
        TransferStatus::Error | TransferStatus::Unknown => STATUS_UNKNOWN,
    }
}

/// Fields requested by a `torrent-get` call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldSet {
    requested: Option<HashSet<String>>,
}

impl FieldSet {
    /// Every field except `files`.
    pub fn all() -> Self {
        Self { requested: None }
    }

    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            requested: Some(names.into_iter().map(Into::into).collect()),
        }
    }

    /// Whether a plain field should be populated.
    pub fn wants(&self, name: &str) -> bool {
        match &self.requested {
            None => true,
            Some(names) => names.contains(name),
        }
    }

    /// Whether the field was named explicitly. Used for fields that cost
    /// extra remote calls.
    pub fn names(&self, name: &str) -> bool {
        self.requested
            .as_ref()
            .is_some_and(|names| names.contains(name))
    }
}

impl From<Option<Vec<String>>> for FieldSet {
    fn from(fields: Option<Vec<String>>) -> Self {
        match fields {
            Some(names) if !names.is_empty() => FieldSet::from_names(names),
            _ => FieldSet::all(),
        }
    }
}

/// Builds [`TorrentInfo`] entries for one request.
pub struct TorrentMapper<'a> {
    fields: &'a FieldSet,
    download_dir: &'a Path,
}

impl<'a> TorrentMapper<'a> {
    pub fn new(fields: &'a FieldSet, download_dir: &'a Path) -> Self {
        Self {
            fields,
            download_dir,
        }
    }

    pub fn map(
        &self,
        transfer: &RemoteTransfer,
        stable: &StableId,
        files: Option<Vec<TorrentFileInfo>>,
    ) -> TorrentInfo {
        let t = normalized(transfer);
        let f = self.fields;
        let left = (t.size_bytes - t.downloaded_bytes).max(0);
        let percent_done = if t.size_bytes > 0 {
            t.downloaded_bytes as f64 / t.size_bytes as f64
        } else {
            0.0
        };

        TorrentInfo {
            id: stable.id,
            name: t.name.clone(),
            hash_string: f
                .wants("hashString")
                .then(|| stable.hash.clone()),
            error: f.wants("error").then_some(match t.status {
                TransferStatus::Error => ERROR_LOCAL,
                _ => 0,
            }),
            error_string: f
                .wants("errorString")
                .then(|| t.error_message.clone().unwrap_or_default()),
            status: f.wants("status").then_some(status_code(t.status)),
            download_dir: f
                .wants("downloadDir")
                .then(|| self.download_dir.display().to_string()),
            rate_download: f.wants("rateDownload").then_some(t.download_speed),
            rate_upload: f.wants("rateUpload").then_some(t.upload_speed),
            peers_getting_from_us: f
                .wants("peersGettingFromUs")
                .then_some(t.peers_getting_from_us),
            peers_sending_to_us: f.wants("peersSendingToUs").then_some(t.peers_sending_to_us),
            peers_connected: f.wants("peersConnected").then_some(t.peers_connected),
            eta: f.wants("eta").then_some(t.estimated_secs),
            have_unchecked: f.wants("haveUnchecked").then_some(0),
            have_valid: f.wants("haveValid").then_some(t.downloaded_bytes),
            uploaded_ever: f.wants("uploadedEver").then_some(t.uploaded_bytes),
            size_when_done: f.wants("sizeWhenDone").then_some(t.size_bytes),
            total_size: f.wants("totalSize").then_some(t.size_bytes),
            left_until_done: f.wants("leftUntilDone").then_some(left),
            added_date: f
                .wants("addedDate")
                .then(|| t.created_at.map_or(0, |d| d.timestamp())),
            done_date: f
                .wants("doneDate")
                .then(|| t.finished_at.map_or(0, |d| d.timestamp())),
            desired_available: f.wants("desiredAvailable").then_some(t.availability),
            comment: f
                .wants("comment")
                .then(|| t.status_message.clone().unwrap_or_default()),
            percent_done: f.wants("percentDone").then_some(percent_done),
            // The relay never stops a torrent, so none is ever finished in
            // Transmission's sense.
            is_finished: f.wants("isFinished").then_some(false),
            magnet_link: if f.wants("magnetLink") {
                t.magnet_uri.clone()
            } else {
                None
            },
            files: if f.names("files") { files } else { None },
        }
    }
}

/// Completed transfers are reported fully downloaded and fully available.
fn normalized(transfer: &RemoteTransfer) -> RemoteTransfer {
    let mut t = transfer.clone();
    if t.status == TransferStatus::Completed {
        t.availability = 100;
    }
    t.downloaded_bytes = downloaded_bytes(transfer);
    t
}

/// Completed transfers count as fully downloaded; their local copy is gone.
fn downloaded_bytes(transfer: &RemoteTransfer) -> i64 {
    if transfer.status == TransferStatus::Completed {
        transfer.size_bytes
    } else {
        transfer.downloaded_bytes
    }
}

/// Progress of one file of `transfer`, consistent with the transfer's own fields.
pub(crate) fn file_progress(file_size: i64, transfer: &RemoteTransfer) -> i64 {
    approximate_progress(file_size, downloaded_bytes(transfer), transfer.size_bytes)
}

/// Per-file progress, approximated from the transfer's overall progress.
pub(crate) fn approximate_progress(file_size: i64, downloaded: i64, total: i64) -> i64 {
    if total <= 0 {
        return 0;
    }
    (i128::from(file_size) * i128::from(downloaded) / i128::from(total)) as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixtures;
    use std::path::PathBuf;

    fn stable() -> StableId {
        StableId {
            id: 99,
            hash: fixtures::SAMPLE_HASH.to_string(),
        }
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(status_code(TransferStatus::Downloading), 4);
        assert_eq!(status_code(TransferStatus::Queued), 3);
        assert_eq!(status_code(TransferStatus::Completed), 4);
        assert_eq!(status_code(TransferStatus::Seeding), 6);
        assert_eq!(status_code(TransferStatus::Error), 7);
        assert_eq!(status_code(TransferStatus::Unknown), 7);
    }

    #[test]
    fn test_completed_forced_to_full_size() {
        let mut t = fixtures::transfer(1, "Movie", TransferStatus::Completed);
        t.downloaded_bytes = 10;
        t.availability = 0;

        let fields = FieldSet::all();
        let dir = PathBuf::from("/download");
        let info = TorrentMapper::new(&fields, &dir).map(&t, &stable(), None);

        assert_eq!(info.status, Some(4));
        assert_eq!(info.have_valid, Some(t.size_bytes));
        assert_eq!(info.left_until_done, Some(0));
        assert_eq!(info.desired_available, Some(100));
        assert_eq!(info.percent_done, Some(1.0));
    }

    #[test]
    fn test_all_fields_populated_except_files() {
        let t = fixtures::downloading_transfer(1, "Movie", &fixtures::magnet_uri("Movie"));
        let fields = FieldSet::all();
        let dir = PathBuf::from("/download");
        let info = TorrentMapper::new(&fields, &dir).map(&t, &stable(), Some(Vec::new()));

        assert_eq!(info.id, 99);
        assert_eq!(info.hash_string.as_deref(), Some(fixtures::SAMPLE_HASH));
        assert_eq!(info.download_dir.as_deref(), Some("/download"));
        assert_eq!(info.rate_download, Some(1024 * 1024));
        assert_eq!(info.eta, Some(120));
        assert_eq!(info.percent_done, Some(0.5));
        assert_eq!(info.added_date, Some(0));
        assert!(info.magnet_link.is_some());
        assert!(info.files.is_none());
    }

    #[test]
    fn test_requested_fields_only() {
        let t = fixtures::downloading_transfer(1, "Movie", &fixtures::magnet_uri("Movie"));
        let fields = FieldSet::from_names(["id", "name", "status", "files"]);
        let dir = PathBuf::from("/download");
        let info = TorrentMapper::new(&fields, &dir).map(&t, &stable(), Some(Vec::new()));

        assert_eq!(info.status, Some(4));
        assert_eq!(info.files, Some(Vec::new()));
        assert!(info.rate_download.is_none());
        assert!(info.hash_string.is_none());
        assert!(info.eta.is_none());

        let value = serde_json::to_value(&info).unwrap();
        let keys: Vec<_> = value.as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys.len(), 4);
    }

    #[test]
    fn test_empty_field_list_means_all() {
        assert_eq!(FieldSet::from(Some(Vec::new())), FieldSet::all());
        assert_eq!(FieldSet::from(None), FieldSet::all());
    }

    #[test]
    fn test_file_progress_of_completed_transfer_is_full() {
        let mut t = fixtures::transfer(1, "done", TransferStatus::Completed);
        t.size_bytes = 500;
        t.downloaded_bytes = 0;
        assert_eq!(file_progress(400, &t), 400);

        t.status = TransferStatus::Downloading;
        t.downloaded_bytes = 250;
        assert_eq!(file_progress(400, &t), 200);
    }

    #[test]
    fn test_approximate_progress() {
        assert_eq!(approximate_progress(100, 50, 200), 25);
        assert_eq!(approximate_progress(100, 50, 0), 0);
        assert_eq!(
            approximate_progress(i64::MAX / 2, i64::MAX / 2, i64::MAX / 2),
            i64::MAX / 2
        );
    }
}
