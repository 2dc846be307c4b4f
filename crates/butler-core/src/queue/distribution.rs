//! Distribution task queue: polls QRS until queued distribute tasks finish.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use super::{
    EntryState, PollVerdict, PollerState, QueueConfig, QueueStats, QueuedDistributionTask,
    QueuedTaskView, TickReport,
};
use crate::domain::{DistributionEvent, StatusClass, TaskId, TaskMetadata};
use crate::ports::{
    Clock, IdGenerator, OutcomeHandler, TaskMetadataGateway, deliver_outcome_isolated,
    fetch_isolated,
};

/// Entry map + poller state. Guarded by one mutex so that admission and
/// drain agree on whether a poll loop is running.
struct QueueState {
    entries: HashMap<TaskId, QueuedDistributionTask>,
    poller: PollerState,
    next_generation: u64,
    poller_handle: Option<JoinHandle<()>>,
}

impl QueueState {
    fn new() -> Self {
        Self {
            entries: HashMap::new(),
            poller: PollerState::Idle,
            next_generation: 1,
            poller_handle: None,
        }
    }

    /// Running, and the loop task is still alive.
    fn poller_alive(&self) -> bool {
        self.poller.is_running()
            && self
                .poller_handle
                .as_ref()
                .is_some_and(|handle| !handle.is_finished())
    }
}

struct QueueInner {
    state: Mutex<QueueState>,

    /// Held for a whole `check_queue()` pass; ticks never overlap.
    tick_lock: Mutex<()>,

    gateway: Arc<dyn TaskMetadataGateway>,
    handler: Arc<dyn OutcomeHandler>,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
    config: QueueConfig,
}

/// In-process reconciliation queue for distribute tasks.
///
/// Design:
/// - The map lock is never held across a QRS call or a handler call. A tick
///   snapshots the entries, polls them one by one, then applies the verdicts.
/// - A verdict is applied only if the entry still carries the admission id it
///   was polled with. An `add()` during the tick wins over the stale verdict.
/// - The poll loop exists only while the map is non-empty.
///
/// Cloning is cheap and every clone talks to the same queue.
#[derive(Clone)]
pub struct DistributionTaskQueue {
    inner: Arc<QueueInner>,
}

impl DistributionTaskQueue {
    pub fn new(
        config: QueueConfig,
        gateway: Arc<dyn TaskMetadataGateway>,
        handler: Arc<dyn OutcomeHandler>,
        clock: Arc<dyn Clock>,
        ids: Arc<dyn IdGenerator>,
    ) -> Self {
        Self {
            inner: Arc::new(QueueInner {
                state: Mutex::new(QueueState::new()),
                tick_lock: Mutex::new(()),
                gateway,
                handler,
                clock,
                ids,
                config,
            }),
        }
    }

    pub fn config(&self) -> &QueueConfig {
        &self.inner.config
    }

    /// Admit (or re-admit) a task whose status was intermediate.
    ///
    /// Re-adding a task id replaces the entry in place: new event, new
    /// metadata, `check_count` back to 0, `queued_at` reset.
    pub async fn add(&self, task_id: TaskId, event: DistributionEvent, metadata: TaskMetadata) {
        let admission_id = self.inner.ids.generate_admission_id();
        let now = self.inner.clock.now();
        let status = metadata.execution_status();
        let record = QueuedDistributionTask::new(admission_id, task_id.clone(), event, metadata, now);

        let mut state = self.inner.state.lock().await;
        match state.entries.insert(task_id.clone(), record) {
            Some(previous) => info!(
                %task_id,
                %admission_id,
                previous_admission_id = %previous.admission_id,
                %status,
                "distribute task re-admitted, replacing queued entry"
            ),
            None => info!(
                %task_id,
                %admission_id,
                %status,
                queue_size = state.entries.len(),
                "distribute task queued until it reaches a final state"
            ),
        }

        if !state.poller_alive() {
            if let PollerState::Running { generation } = state.poller {
                warn!(generation, "distribution queue poller died, starting a new one");
            }
            let generation = state.next_generation;
            state.next_generation += 1;
            state.poller = PollerState::Running { generation };
            state.poller_handle = Some(tokio::spawn(poll_loop(Arc::clone(&self.inner), generation)));
            debug!(generation, "distribution queue poller started");
        }
    }

    /// Run one reconciliation pass over every entry.
    ///
    /// The timer calls this; tests and diagnostics may call it directly.
    /// Concurrent calls are serialized.
    pub async fn check_queue(&self) -> TickReport {
        self.inner.check_queue().await
    }

    pub async fn get_queue_stats(&self) -> QueueStats {
        let now = self.inner.clock.now();
        let state = self.inner.state.lock().await;

        let mut entries: Vec<QueuedTaskView> = state
            .entries
            .values()
            .map(|record| QueuedTaskView {
                task_id: record.task_id.clone(),
                task_name: record.original_event.task_name.clone(),
                admission_id: record.admission_id,
                age_ms: duration_ms(record.age(now)),
                check_count: record.check_count,
                last_known_status: record.last_known_status(),
                state: record.state(),
            })
            .collect();
        // oldest first
        entries.sort_by(|a, b| b.age_ms.cmp(&a.age_ms));

        let average_check_count = if entries.is_empty() {
            0.0
        } else {
            let total: u64 = entries.iter().map(|e| u64::from(e.check_count)).sum();
            total as f64 / entries.len() as f64
        };

        QueueStats {
            size: entries.len(),
            oldest_age_ms: entries.first().map(|e| e.age_ms),
            average_check_count,
            polling: state.poller_alive(),
            entries,
        }
    }

    /// Drop every entry and stop polling. No handler is called.
    pub async fn clear(&self) {
        let handle = self.inner.reset().await;
        if let Some(handle) = handle {
            handle.abort();
        }
    }

    /// `clear()` and wait for the poll loop to finish.
    pub async fn shutdown(&self) {
        if let Some(handle) = self.inner.reset().await {
            handle.abort();
            // cancelled or already finished; either is fine
            let _ = handle.await;
        }
        info!("distribution queue shut down");
    }

    pub async fn is_polling(&self) -> bool {
        self.inner.state.lock().await.poller_alive()
    }

    pub async fn len(&self) -> usize {
        self.inner.state.lock().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.state.lock().await.entries.is_empty()
    }

    pub async fn contains(&self, task_id: &TaskId) -> bool {
        self.inner.state.lock().await.entries.contains_key(task_id)
    }

    /// Copy of the current entry for `task_id`.
    pub async fn get(&self, task_id: &TaskId) -> Option<QueuedDistributionTask> {
        self.inner.state.lock().await.entries.get(task_id).cloned()
    }
}

impl QueueInner {
    async fn check_queue(&self) -> TickReport {
        let _tick = self.tick_lock.lock().await;

        let snapshot: Vec<QueuedDistributionTask> = {
            let state = self.state.lock().await;
            state.entries.values().cloned().collect()
        };

        let mut verdicts = Vec::with_capacity(snapshot.len());
        for entry in &snapshot {
            let verdict = self.poll_entry(entry).await;
            let checked_at = self.clock.now();
            verdicts.push((entry.task_id.clone(), entry.admission_id, verdict, checked_at));
        }

        // Deferred mutation: everything decided above is applied here.
        let mut report = TickReport {
            checked: snapshot.len(),
            ..TickReport::default()
        };
        let mut state = self.state.lock().await;
        for (task_id, admission_id, verdict, checked_at) in verdicts {
            let Some(record) = state.entries.get_mut(&task_id) else {
                continue;
            };
            if record.admission_id != admission_id {
                debug!(
                    %task_id,
                    polled_admission_id = %admission_id,
                    current_admission_id = %record.admission_id,
                    "entry re-admitted during tick, dropping stale verdict"
                );
                report.superseded += 1;
                continue;
            }

            match verdict.entry_state() {
                EntryState::Resolved => report.resolved += 1,
                EntryState::Expired => report.expired += 1,
                EntryState::Admitted | EntryState::Polling => report.retained += 1,
            }
            if verdict.removes_entry() {
                state.entries.remove(&task_id);
            } else {
                record.record_check(checked_at, verdict.into_metadata());
            }
        }

        if state.entries.is_empty() && state.poller.is_running() {
            state.poller = PollerState::Idle;
            state.poller_handle = None;
            debug!("distribution queue drained, poller stopping");
        }

        if report.checked > 0 {
            debug!(
                checked = report.checked,
                resolved = report.resolved,
                expired = report.expired,
                retained = report.retained,
                superseded = report.superseded,
                "distribution queue tick finished"
            );
        }
        report
    }

    /// Decide one entry. Handler calls happen here, removal does not.
    async fn poll_entry(&self, entry: &QueuedDistributionTask) -> PollVerdict {
        let task_id = &entry.task_id;
        let admission_id = entry.admission_id;

        let now = self.clock.now();
        if entry.is_expired(now, self.config.max_age) {
            let age = entry.age(now);
            warn!(
                %task_id,
                %admission_id,
                task_name = %entry.original_event.task_name,
                elapsed_minutes = age.as_secs() / 60,
                check_count = entry.check_count,
                last_known_status = %entry.last_known_status(),
                "distribute task never reached a final state, giving up without notification"
            );
            return PollVerdict::Expired { age };
        }

        let metadata = match fetch_isolated(&self.gateway, task_id).await {
            Ok(metadata) => metadata,
            Err(err) => {
                warn!(
                    %task_id,
                    %admission_id,
                    check_count = entry.check_count + 1,
                    error = %err,
                    "could not fetch distribute task metadata, retrying next tick"
                );
                return PollVerdict::FetchFailed;
            }
        };

        let status = metadata.execution_status();
        match status.classify() {
            StatusClass::Final(outcome) => {
                info!(
                    %task_id,
                    %admission_id,
                    %status,
                    ?outcome,
                    check_count = entry.check_count + 1,
                    "distribute task reached a final state"
                );
                // The entry goes away even if the handler fails.
                if let Err(err) = deliver_outcome_isolated(
                    &self.handler,
                    outcome,
                    &entry.original_event,
                    &metadata,
                )
                .await
                {
                    error!(
                        %task_id,
                        %admission_id,
                        ?outcome,
                        error = %err,
                        details = ?err,
                        "outcome handler failed, notification dropped"
                    );
                }
                PollVerdict::Resolved { outcome, metadata }
            }
            StatusClass::Intermediate => {
                debug!(%task_id, %admission_id, %status, "distribute task still in progress");
                PollVerdict::Pending { metadata }
            }
            StatusClass::Unclassified => {
                warn!(
                    %task_id,
                    %admission_id,
                    status_code = status.code(),
                    log_message = %entry.original_event.log_message,
                    "unexpected execution status for queued distribute task, keeping it queued"
                );
                PollVerdict::Unclassified { metadata }
            }
        }
    }

    async fn owns_poller(&self, generation: u64) -> bool {
        self.state.lock().await.poller.is_owned_by(generation)
    }

    /// Empty the map, go Idle, hand back the poll loop handle (if any).
    async fn reset(&self) -> Option<JoinHandle<()>> {
        let mut state = self.state.lock().await;
        let dropped = state.entries.len();
        state.entries.clear();
        state.poller = PollerState::Idle;
        if dropped > 0 {
            info!(dropped, "distribution queue cleared");
        }
        state.poller_handle.take()
    }
}

/// Puts the poller back to Idle if its loop unwinds, so the next `add()`
/// starts a fresh one.
struct PollLoopGuard {
    inner: Arc<QueueInner>,
    generation: u64,
}

impl Drop for PollLoopGuard {
    fn drop(&mut self) {
        if !std::thread::panicking() {
            return;
        }
        if let Ok(mut state) = self.inner.state.try_lock() {
            if state.poller.is_owned_by(self.generation) {
                state.poller = PollerState::Idle;
                state.poller_handle = None;
            }
        }
        error!(generation = self.generation, "distribution queue poller panicked");
    }
}

async fn poll_loop(inner: Arc<QueueInner>, generation: u64) {
    let _guard = PollLoopGuard {
        inner: Arc::clone(&inner),
        generation,
    };
    let period = inner.config.poll_interval.max(Duration::from_millis(1));
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        if !inner.owns_poller(generation).await {
            break;
        }
        inner.check_queue().await;
        if !inner.owns_poller(generation).await {
            break;
        }
    }
    debug!(generation, "distribution queue poller exited");
}

fn duration_ms(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
