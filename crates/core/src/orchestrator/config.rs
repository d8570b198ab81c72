//! Orchestrator configuration.

use serde::{Deserialize, Serialize};

use super::BackoffPolicy;

/// Configuration for the transfer orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Maximum submissions in flight at once (0 = unlimited).
    /// When the limit is reached, new submissions wait for a free slot.
    #[serde(default)]
    pub max_concurrent_transfers: usize,

    /// Capacity of the result channel. Producers wait when it is full.
    #[serde(default = "default_result_buffer")]
    pub result_buffer: usize,

    /// Hard ceiling on a submission's lifetime, measured from submission.
    #[serde(default = "default_max_lifetime")]
    pub max_lifetime_secs: u64,

    /// Poll backoff parameters.
    #[serde(flatten)]
    pub backoff: BackoffPolicy,
}

fn default_result_buffer() -> usize {
    100
}

fn default_max_lifetime() -> u64 {
    24 * 60 * 60
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_concurrent_transfers: 0,
            result_buffer: default_result_buffer(),
            max_lifetime_secs: default_max_lifetime(),
            backoff: BackoffPolicy::default(),
        }
    }
}
