//! Distribution queue: entries, state machines, stats, and the queue itself.

mod distribution;
mod record;
mod state;
mod stats;

pub use distribution::DistributionTaskQueue;
pub use record::QueuedDistributionTask;
pub use state::{EntryState, PollVerdict, PollerState};
pub use stats::{QueueStats, QueuedTaskView, TickReport};

use std::time::Duration;

/// Timing of the distribution queue.
///
/// Both values come from configuration. No jitter, no backoff: every entry is
/// checked on the same fixed cadence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueConfig {
    /// How often `check_queue()` runs while the queue is non-empty.
    pub poll_interval: Duration,

    /// Entries older than this are dropped without notification.
    pub max_age: Duration,
}

impl QueueConfig {
    pub fn new(poll_interval: Duration, max_age: Duration) -> Self {
        Self {
            poll_interval,
            max_age,
        }
    }
}

impl Default for QueueConfig {
    /// 20 s poll interval, 6 h max age.
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(20),
            max_age: Duration::from_secs(6 * 60 * 60),
        }
    }
}
