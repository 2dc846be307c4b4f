use serde::{Deserialize, Serialize};

use super::EntryState;
use crate::domain::{AdmissionId, ExecutionStatus, TaskId};

/// Diagnostic snapshot of the distribution queue (for health endpoints).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueueStats {
    pub size: usize,

    /// Age of the oldest entry, `None` when the queue is empty.
    pub oldest_age_ms: Option<u64>,

    /// Mean `check_count` over all entries (0.0 when empty).
    pub average_check_count: f64,

    /// Whether the background poller is currently scheduled.
    pub polling: bool,

    pub entries: Vec<QueuedTaskView>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueuedTaskView {
    pub task_id: TaskId,
    pub task_name: String,
    pub admission_id: AdmissionId,
    pub age_ms: u64,
    pub check_count: u32,
    pub last_known_status: ExecutionStatus,

    /// Admitted until the first tick has looked at it, then polling.
    pub state: EntryState,
}

/// Summary of one `check_queue()` pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickReport {
    /// Entries looked at in this tick.
    pub checked: usize,
    pub resolved: usize,
    pub expired: usize,

    /// Entries left in the queue (pending, unclassified or fetch failed).
    pub retained: usize,

    /// Entries re-admitted while this tick was polling them; the verdict was
    /// dropped in favour of the newer admission.
    pub superseded: usize,
}
