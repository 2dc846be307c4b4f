//! State machines of the distribution queue.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::{FinalOutcome, TaskMetadata};

/// Per-entry state.
///
/// State transitions:
/// - Admitted -> Polling (first tick that looks at the entry)
/// - Polling -> Polling (still intermediate, unclassified, or fetch failed)
/// - Admitted | Polling -> Resolved (final status observed)
/// - Admitted | Polling -> Expired (older than max age)
///
/// Resolved and Expired entries are deleted in the tick that reached them,
/// so only the first two are ever stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryState {
    Admitted,
    Polling,
    Resolved,
    Expired,
}

impl EntryState {
    pub fn is_terminal(self) -> bool {
        matches!(self, EntryState::Resolved | EntryState::Expired)
    }
}

/// What one tick decided for one entry.
#[derive(Debug, Clone, PartialEq)]
pub enum PollVerdict {
    /// Final status observed; the handler has been called.
    Resolved {
        outcome: FinalOutcome,
        metadata: TaskMetadata,
    },

    /// Gave up waiting. No handler is called.
    Expired { age: Duration },

    /// Still intermediate. Keep polling.
    Pending { metadata: TaskMetadata },

    /// Status outside both lists. Kept queued until it resolves or expires.
    Unclassified { metadata: TaskMetadata },

    /// QRS could not be reached. Kept queued, retried next tick.
    FetchFailed,
}

impl PollVerdict {
    pub fn entry_state(&self) -> EntryState {
        match self {
            PollVerdict::Resolved { .. } => EntryState::Resolved,
            PollVerdict::Expired { .. } => EntryState::Expired,
            PollVerdict::Pending { .. }
            | PollVerdict::Unclassified { .. }
            | PollVerdict::FetchFailed => EntryState::Polling,
        }
    }

    pub fn removes_entry(&self) -> bool {
        self.entry_state().is_terminal()
    }

    /// Metadata fetched by this tick, if any.
    pub fn into_metadata(self) -> Option<TaskMetadata> {
        match self {
            PollVerdict::Resolved { metadata, .. }
            | PollVerdict::Pending { metadata }
            | PollVerdict::Unclassified { metadata } => Some(metadata),
            PollVerdict::Expired { .. } | PollVerdict::FetchFailed => None,
        }
    }
}

/// Background poller state.
///
/// Idle while the queue is empty. `add()` moves Idle -> Running and spawns the
/// poll loop; the tick that drains the queue moves Running -> Idle. Both
/// transitions happen under the same lock as the entry map, so an admission
/// racing a drain either lands before the drain check (queue not empty) or
/// after it (sees Idle and starts a new loop).
///
/// `generation` identifies the loop that owns the Running state. A loop that
/// wakes up and finds another generation (or Idle) exits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollerState {
    Idle,
    Running { generation: u64 },
}

impl PollerState {
    pub fn is_running(self) -> bool {
        matches!(self, PollerState::Running { .. })
    }

    pub fn is_owned_by(self, generation: u64) -> bool {
        self == PollerState::Running { generation }
    }
}
