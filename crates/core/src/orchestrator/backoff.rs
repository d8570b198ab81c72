//! Poll interval computation.

use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// How long to wait between status polls of a remote transfer.
///
/// Not-yet-started transfers are polled proportionally to how long they have
/// been queued, converging on `queued_cap_secs`. Running transfers are polled
/// about `eta_divisor` times before their estimated completion, never less
/// often than every `eta_cap_secs`. Both branches add jitter so many tracked
/// transfers do not poll in lockstep.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackoffPolicy {
    #[serde(default = "default_queued_cap")]
    pub queued_cap_secs: u64,
    #[serde(default = "default_queued_jitter")]
    pub queued_jitter_secs: u64,
    #[serde(default = "default_eta_divisor")]
    pub eta_divisor: u64,
    #[serde(default = "default_eta_cap")]
    pub eta_cap_secs: u64,
    #[serde(default = "default_eta_jitter")]
    pub eta_jitter_secs: u64,
}

fn default_queued_cap() -> u64 {
    3600
}

fn default_queued_jitter() -> u64 {
    300
}

fn default_eta_divisor() -> u64 {
    5
}

fn default_eta_cap() -> u64 {
    600
}

fn default_eta_jitter() -> u64 {
    30
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            queued_cap_secs: default_queued_cap(),
            queued_jitter_secs: default_queued_jitter(),
            eta_divisor: default_eta_divisor(),
            eta_cap_secs: default_eta_cap(),
            eta_jitter_secs: default_eta_jitter(),
        }
    }
}

impl BackoffPolicy {
    /// Delay before the next poll.
    ///
    /// `estimated_secs` is the service's remaining-time estimate (0 = not
    /// started); `queued_for` is the transfer's age, if the service reported one.
    pub fn poll_delay(&self, estimated_secs: i64, queued_for: Option<Duration>) -> Duration {
        self.poll_delay_with(estimated_secs, queued_for, &mut rand::rng())
    }

    pub fn poll_delay_with<R: Rng + ?Sized>(
        &self,
        estimated_secs: i64,
        queued_for: Option<Duration>,
        rng: &mut R,
    ) -> Duration {
        let cap = Duration::from_secs(self.queued_cap_secs);

        if estimated_secs <= 0 {
            return match queued_for {
                None => cap,
                Some(age) if age >= cap => cap,
                Some(age) => age + Duration::from_secs(jitter(rng, self.queued_jitter_secs)),
            };
        }

        let fraction = (estimated_secs as u64 / self.eta_divisor.max(1)).min(self.eta_cap_secs);
        Duration::from_secs(fraction + jitter(rng, self.eta_jitter_secs))
    }
}

fn jitter<R: Rng + ?Sized>(rng: &mut R, max_exclusive: u64) -> u64 {
    if max_exclusive == 0 {
        0
    } else {
        rng.random_range(0..max_exclusive)
    }
}
