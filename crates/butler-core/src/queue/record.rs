//! Queue entry: the admission-time event + latest metadata.

use std::time::Duration;

use chrono::{DateTime, Utc};

use super::EntryState;
use crate::domain::{AdmissionId, DistributionEvent, ExecutionStatus, TaskId, TaskMetadata};

/// A distribute task whose outcome was not known yet when its event arrived.
///
/// Design:
/// - Owned by the queue only; created by `add()`, mutated and removed by ticks.
/// - `original_event` is never replaced by polling. The UDP payload cannot be
///   re-received, so the outcome notification is built from this copy.
/// - `check_count` and `last_checked_at` only move forward.
#[derive(Debug, Clone)]
pub struct QueuedDistributionTask {
    pub admission_id: AdmissionId,
    pub task_id: TaskId,
    pub original_event: DistributionEvent,

    /// Replaced on every successful poll.
    pub last_known_metadata: TaskMetadata,

    pub queued_at: DateTime<Utc>,
    pub last_checked_at: DateTime<Utc>,

    /// Number of polls performed (failed fetches included).
    pub check_count: u32,
}

impl QueuedDistributionTask {
    pub fn new(
        admission_id: AdmissionId,
        task_id: TaskId,
        event: DistributionEvent,
        metadata: TaskMetadata,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            admission_id,
            task_id,
            original_event: event,
            last_known_metadata: metadata,
            queued_at: now,
            last_checked_at: now,
            check_count: 0,
        }
    }

    pub fn state(&self) -> EntryState {
        if self.check_count == 0 {
            EntryState::Admitted
        } else {
            EntryState::Polling
        }
    }

    /// Time since admission. Zero if the clock went backwards.
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        (now - self.queued_at).to_std().unwrap_or(Duration::ZERO)
    }

    pub fn is_expired(&self, now: DateTime<Utc>, max_age: Duration) -> bool {
        self.age(now) > max_age
    }

    pub fn last_known_status(&self) -> ExecutionStatus {
        self.last_known_metadata.execution_status()
    }

    /// Record one poll. `metadata` is `None` when the fetch failed.
    pub fn record_check(&mut self, now: DateTime<Utc>, metadata: Option<TaskMetadata>) {
        self.check_count = self.check_count.saturating_add(1);
        self.last_checked_at = self.last_checked_at.max(now);
        if let Some(metadata) = metadata {
            self.last_known_metadata = metadata;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::QrsTaskType;
    use chrono::TimeZone;
    use ulid::Ulid;

    fn record_at(now: DateTime<Utc>) -> QueuedDistributionTask {
        QueuedDistributionTask::new(
            AdmissionId::from_ulid(Ulid::new()),
            TaskId::new("T1"),
            DistributionEvent::for_task("T1"),
            TaskMetadata::new(QrsTaskType::Distribute, ExecutionStatus::Queued),
            now,
        )
    }

    #[test]
    fn new_record_is_admitted() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let record = record_at(now);
        assert_eq!(record.state(), EntryState::Admitted);
        assert_eq!(record.check_count, 0);
        assert_eq!(record.queued_at, now);
        assert_eq!(record.last_checked_at, now);
    }

    #[test]
    fn record_check_moves_to_polling_and_replaces_metadata() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let mut record = record_at(now);
        let later = now + chrono::Duration::seconds(30);
        let fresh = TaskMetadata::new(QrsTaskType::Distribute, ExecutionStatus::DistributionRunning);

        record.record_check(later, Some(fresh));

        assert_eq!(record.state(), EntryState::Polling);
        assert_eq!(record.check_count, 1);
        assert_eq!(record.last_checked_at, later);
        assert_eq!(record.last_known_status(), ExecutionStatus::DistributionRunning);
    }

    #[test]
    fn last_checked_at_never_goes_backwards() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let mut record = record_at(now);

        record.record_check(now - chrono::Duration::seconds(10), None);

        assert_eq!(record.last_checked_at, now);
        assert_eq!(record.check_count, 1);
        assert_eq!(record.last_known_status(), ExecutionStatus::Queued);
    }

    #[test]
    fn expiry_is_strictly_greater_than_max_age() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let record = record_at(now);
        let max_age = Duration::from_secs(60);

        assert!(!record.is_expired(now + chrono::Duration::seconds(60), max_age));
        assert!(record.is_expired(now + chrono::Duration::milliseconds(60_001), max_age));
        assert!(!record.is_expired(now - chrono::Duration::seconds(5), max_age));
    }
}
