use tokio::sync::mpsc;
use tracing::{info, warn};

use super::FetchResult;

/// Handle for reporting fetch results.
///
/// This is cheaply cloneable and can be shared across submission tasks.
#[derive(Clone)]
pub struct ResultHandle {
    tx: mpsc::Sender<FetchResult>,
}

impl ResultHandle {
    pub fn new(tx: mpsc::Sender<FetchResult>) -> Self {
        Self { tx }
    }

    /// Report a result, waiting for room if the channel is full.
    ///
    /// If the consumer is gone the result is logged here instead.
    pub async fn report(&self, result: FetchResult) {
        if let Err(mpsc::error::SendError(result)) = self.tx.send(result).await {
            warn!(
                name = %result.name,
                "Result sink closed, dropping result (success: {})",
                result.is_success()
            );
        }
    }
}

/// Background task that drains fetch results and logs them.
pub struct ResultLogger {
    rx: mpsc::Receiver<FetchResult>,
}

impl ResultLogger {
    pub fn new(rx: mpsc::Receiver<FetchResult>) -> Self {
        Self { rx }
    }

    /// Run the logger, consuming results until every handle is dropped.
    ///
    /// This should be spawned as a background task.
    pub async fn run(mut self) {
        info!("Result logger started");

        while let Some(result) = self.rx.recv().await {
            match &result.error {
                None => info!(
                    "Success: downloaded {} to {}",
                    result.name,
                    result.download_dir.display()
                ),
                Some(e) => warn!(
                    "Failure: {} while downloading {} to {}",
                    e,
                    result.name,
                    result.download_dir.display()
                ),
            }
        }

        info!("Result logger shutting down");
    }
}

/// Create the result channel.
///
/// Returns:
/// - `ResultHandle` - clone this into every submission task
/// - `ResultLogger` - spawn this with `tokio::spawn(logger.run())`
pub fn create_result_sink(buffer_size: usize) -> (ResultHandle, ResultLogger) {
    let (tx, rx) = mpsc::channel(buffer_size);
    (ResultHandle::new(tx), ResultLogger::new(rx))
}
