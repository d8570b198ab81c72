//! Admission of dropped `.torrent`/`.magnet` files.

mod blackhole;

pub use blackhole::{download_dir_for, BlackholeWatcher, DropKind, IngestError};
