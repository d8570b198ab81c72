//! Transfer orchestration.
//!
//! Each submission runs as its own task:
//! - **Submitted**: magnet handed to the remote service
//! - **Polling**: status re-read with adaptive backoff until finished or expired
//! - **Downloading**: remote file tree copied under the target directory
//! - **Cleanup**: remote copy deleted, finished transfers purged (best effort)
//! - **Done**: source file renamed, one [`FetchResult`] reported

mod backoff;
mod config;
mod runner;
mod sink;
mod types;

pub use backoff::BackoffPolicy;
pub use config::OrchestratorConfig;
pub use runner::TransferOrchestrator;
pub use sink::{create_result_sink, ResultHandle, ResultLogger};
pub use types::{FetchError, FetchResult, Submission, SubmissionSource};
