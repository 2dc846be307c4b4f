//! DistributionEventRouter - distribute 完了通知の振り分け
//!
//! # フロー
//! 1. QRS にタスクが存在するか確認
//! 2. メタデータ取得（失敗したらこのイベントは捨てる）
//! 3. task type が Distribute か確認
//! 4. execution status で分類
//!    - Final → ハンドラを直接呼ぶ
//!    - Intermediate → キューに入れる
//!    - Unclassified → 警告ログのみ
//!
//! 1 回の呼び出しで起きるのは「ハンドラ呼び出し・キュー投入・何もしない」のどれか一つだけ。

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::domain::{DistributionEvent, ExecutionStatus, FinalOutcome, QrsTaskType, StatusClass};
use crate::error::GatewayError;
use crate::ports::{
    OutcomeHandler, TaskMetadataGateway, deliver_outcome_isolated, exists_isolated, fetch_isolated,
};
use crate::queue::DistributionTaskQueue;

/// What `route_distribution_event` did with one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteOutcome {
    /// QRS does not know the task id.
    NotFound,

    /// Existence check or metadata fetch failed; the event was dropped.
    LookupFailed,

    /// QRS says this is not a distribute task.
    WrongType(QrsTaskType),

    /// Status was already final; the handler ran.
    Delivered(FinalOutcome),

    /// Status was already final; the handler returned an error.
    HandlerFailed(FinalOutcome),

    /// Status was intermediate; the task is now in the queue.
    Queued,

    /// Status outside both lists; nothing was done.
    Unclassified(ExecutionStatus),
}

pub struct DistributionEventRouter {
    gateway: Arc<dyn TaskMetadataGateway>,
    handler: Arc<dyn OutcomeHandler>,
    queue: DistributionTaskQueue,
}

impl DistributionEventRouter {
    pub fn new(
        gateway: Arc<dyn TaskMetadataGateway>,
        handler: Arc<dyn OutcomeHandler>,
        queue: DistributionTaskQueue,
    ) -> Self {
        Self {
            gateway,
            handler,
            queue,
        }
    }

    /// Classify one distribution-completion event and act on it.
    pub async fn route_distribution_event(&self, event: &DistributionEvent) -> RouteOutcome {
        let task_id = &event.task_id;

        match exists_isolated(&self.gateway, task_id).await {
            Ok(true) => {}
            Ok(false) => {
                warn!(%task_id, task_name = %event.task_name, "distribute task not found in QRS");
                return RouteOutcome::NotFound;
            }
            Err(err) => {
                error!(%task_id, error = %err, "could not check whether distribute task exists, dropping event");
                return RouteOutcome::LookupFailed;
            }
        }

        let metadata = match fetch_isolated(&self.gateway, task_id).await {
            Ok(metadata) => metadata,
            Err(GatewayError::NotFound(_)) => {
                warn!(%task_id, "distribute task disappeared from QRS before metadata could be read");
                return RouteOutcome::NotFound;
            }
            Err(err) => {
                error!(%task_id, error = %err, "could not fetch distribute task metadata, dropping event");
                return RouteOutcome::LookupFailed;
            }
        };

        if metadata.task_type != QrsTaskType::Distribute {
            warn!(
                %task_id,
                actual_type = %metadata.task_type,
                "event routed as distribute task, but QRS reports another task type"
            );
            return RouteOutcome::WrongType(metadata.task_type);
        }

        let status = metadata.execution_status();
        match status.classify() {
            StatusClass::Final(outcome) => {
                debug!(%task_id, %status, ?outcome, "distribute task already final");
                match deliver_outcome_isolated(&self.handler, outcome, event, &metadata).await {
                    Ok(()) => RouteOutcome::Delivered(outcome),
                    Err(err) => {
                        error!(%task_id, ?outcome, error = %err, details = ?err, "outcome handler failed");
                        RouteOutcome::HandlerFailed(outcome)
                    }
                }
            }
            StatusClass::Intermediate => {
                self.queue.add(task_id.clone(), event.clone(), metadata).await;
                RouteOutcome::Queued
            }
            StatusClass::Unclassified => {
                warn!(
                    %task_id,
                    status_code = status.code(),
                    log_message = %event.log_message,
                    "unexpected execution status for distribute task, ignoring event"
                );
                RouteOutcome::Unclassified(status)
            }
        }
    }
}

impl std::fmt::Debug for DistributionEventRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DistributionEventRouter").finish_non_exhaustive()
    }
}

/// Log helper used by callers that route in a loop (e.g. the CLI).
pub fn log_route_outcome(event: &DistributionEvent, outcome: RouteOutcome) {
    info!(task_id = %event.task_id, task_name = %event.task_name, ?outcome, "distribution event routed");
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::domain::{TaskId, TaskMetadata};
    use crate::error::HandlerError;
    use crate::impls::{InMemoryMetadataGateway, RecordingOutcomeHandler};
    use crate::ports::{FixedClock, UlidGenerator};
    use crate::queue::QueueConfig;

    struct Setup {
        router: DistributionEventRouter,
        queue: DistributionTaskQueue,
        gateway: Arc<InMemoryMetadataGateway>,
        handler: Arc<RecordingOutcomeHandler>,
    }

    fn setup(gateway: InMemoryMetadataGateway) -> Setup {
        let clock = Arc::new(FixedClock::new(Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap()));
        let gateway = Arc::new(gateway);
        let handler = Arc::new(RecordingOutcomeHandler::new());
        let queue = DistributionTaskQueue::new(
            QueueConfig::new(Duration::from_secs(3600), Duration::from_secs(6 * 3600)),
            gateway.clone(),
            handler.clone(),
            clock.clone(),
            Arc::new(UlidGenerator::new(clock)),
        );
        let router = DistributionEventRouter::new(gateway.clone(), handler.clone(), queue.clone());
        Setup {
            router,
            queue,
            gateway,
            handler,
        }
    }

    fn task(
        task_id: &str,
        task_type: QrsTaskType,
        statuses: &[ExecutionStatus],
    ) -> InMemoryMetadataGateway {
        InMemoryMetadataGateway::new().with_task(
            TaskId::new(task_id),
            TaskMetadata::new(task_type, ExecutionStatus::NeverStarted).with_tag("butler"),
            statuses.iter().copied(),
        )
    }

    fn event(task_id: &str) -> DistributionEvent {
        DistributionEvent::for_task(task_id)
            .with_task_name("Distribute sales app")
            .with_log_message("Task finished")
    }

    #[tokio::test]
    async fn queued_status_is_admitted_then_resolved_by_a_poll() {
        let s = setup(task(
            "T1",
            QrsTaskType::Distribute,
            &[ExecutionStatus::Queued, ExecutionStatus::FinishedSuccess],
        ));

        let outcome = s.router.route_distribution_event(&event("T1")).await;
        assert_eq!(outcome, RouteOutcome::Queued);
        assert!(s.queue.contains(&TaskId::new("T1")).await);
        assert!(s.handler.calls().await.is_empty());

        s.queue.check_queue().await;

        assert!(s.queue.is_empty().await);
        let calls = s.handler.calls().await;
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].outcome, FinalOutcome::Success);
        assert_eq!(calls[0].event, event("T1"));
        assert_eq!(calls[0].metadata.tags, vec!["butler".to_string()]);
    }

    #[tokio::test]
    async fn final_fail_at_routing_time_goes_straight_to_failure_handler() {
        let s = setup(task("T2", QrsTaskType::Distribute, &[ExecutionStatus::FinishedFail]));

        let outcome = s.router.route_distribution_event(&event("T2")).await;

        assert_eq!(outcome, RouteOutcome::Delivered(FinalOutcome::Failure));
        assert_eq!(s.handler.count(FinalOutcome::Failure).await, 1);
        assert!(!s.queue.contains(&TaskId::new("T2")).await);
        assert!(!s.queue.is_polling().await);
    }

    #[tokio::test]
    async fn final_success_at_routing_time_goes_to_success_handler() {
        let s = setup(task("T1", QrsTaskType::Distribute, &[ExecutionStatus::FinishedSuccess]));

        let outcome = s.router.route_distribution_event(&event("T1")).await;

        assert_eq!(outcome, RouteOutcome::Delivered(FinalOutcome::Success));
        assert_eq!(s.handler.count(FinalOutcome::Success).await, 1);
        assert!(s.queue.is_empty().await);
    }

    #[tokio::test]
    async fn distribution_queue_status_is_admitted() {
        let s = setup(task("T3", QrsTaskType::Distribute, &[ExecutionStatus::DistributionQueue]));

        let outcome = s.router.route_distribution_event(&event("T3")).await;

        assert_eq!(outcome, RouteOutcome::Queued);
        let entry = s.queue.get(&TaskId::new("T3")).await.unwrap();
        assert_eq!(entry.last_known_status(), ExecutionStatus::DistributionQueue);
        s.queue.clear().await;
    }

    #[tokio::test]
    async fn reload_task_is_rejected_as_wrong_type() {
        let s = setup(task("T4", QrsTaskType::Reload, &[ExecutionStatus::FinishedSuccess]));

        let outcome = s.router.route_distribution_event(&event("T4")).await;

        assert_eq!(outcome, RouteOutcome::WrongType(QrsTaskType::Reload));
        assert!(s.handler.calls().await.is_empty());
        assert!(s.queue.is_empty().await);
    }

    #[tokio::test]
    async fn unknown_task_is_not_found() {
        let s = setup(InMemoryMetadataGateway::new());

        let outcome = s.router.route_distribution_event(&event("missing")).await;

        assert_eq!(outcome, RouteOutcome::NotFound);
        assert_eq!(s.gateway.fetch_count(), 0);
    }

    #[tokio::test]
    async fn metadata_fetch_failure_drops_the_event() {
        let s = setup(task("T1", QrsTaskType::Distribute, &[ExecutionStatus::Queued]));
        s.gateway.fail_next_fetches(&TaskId::new("T1"), 1).await;

        let outcome = s.router.route_distribution_event(&event("T1")).await;

        assert_eq!(outcome, RouteOutcome::LookupFailed);
        assert!(s.queue.is_empty().await);
        assert!(s.handler.calls().await.is_empty());
    }

    #[tokio::test]
    async fn unclassified_status_is_neither_queued_nor_delivered() {
        let s = setup(task("T1", QrsTaskType::Distribute, &[ExecutionStatus::Reset]));

        let outcome = s.router.route_distribution_event(&event("T1")).await;

        assert_eq!(outcome, RouteOutcome::Unclassified(ExecutionStatus::Reset));
        assert!(s.queue.is_empty().await);
        assert!(s.handler.calls().await.is_empty());
    }

    #[tokio::test]
    async fn handler_error_is_reported_not_propagated() {
        let s = setup(task("T1", QrsTaskType::Distribute, &[ExecutionStatus::Error]));
        s.handler.set_failing(true);

        let outcome = s.router.route_distribution_event(&event("T1")).await;

        assert_eq!(outcome, RouteOutcome::HandlerFailed(FinalOutcome::Failure));
        assert!(s.queue.is_empty().await);
    }

    struct ExplodingSink;

    #[async_trait]
    impl OutcomeHandler for ExplodingSink {
        async fn on_success(
            &self,
            _event: &DistributionEvent,
            _metadata: &TaskMetadata,
        ) -> Result<(), HandlerError> {
            panic!("sink exploded");
        }

        async fn on_failure(
            &self,
            _event: &DistributionEvent,
            _metadata: &TaskMetadata,
        ) -> Result<(), HandlerError> {
            panic!("sink exploded");
        }
    }

    #[tokio::test]
    async fn panicking_handler_is_reported_as_handler_failure() {
        let s = setup(task("T1", QrsTaskType::Distribute, &[ExecutionStatus::FinishedSuccess]));
        let router = DistributionEventRouter::new(s.gateway.clone(), Arc::new(ExplodingSink), s.queue.clone());

        let outcome = router.route_distribution_event(&event("T1")).await;

        assert_eq!(outcome, RouteOutcome::HandlerFailed(FinalOutcome::Success));
        assert!(s.queue.is_empty().await);
    }

    struct UnreachableQrs;

    #[async_trait]
    impl TaskMetadataGateway for UnreachableQrs {
        async fn exists(&self, task_id: &TaskId) -> Result<bool, GatewayError> {
            Err(GatewayError::Fetch {
                task_id: task_id.clone(),
                reason: "connection refused".to_string(),
            })
        }

        async fn fetch(&self, task_id: &TaskId) -> Result<TaskMetadata, GatewayError> {
            Err(GatewayError::Fetch {
                task_id: task_id.clone(),
                reason: "connection refused".to_string(),
            })
        }
    }

    #[tokio::test]
    async fn existence_check_failure_drops_the_event() {
        let s = setup(InMemoryMetadataGateway::new());
        let router =
            DistributionEventRouter::new(Arc::new(UnreachableQrs), s.handler.clone(), s.queue.clone());

        let outcome = router.route_distribution_event(&event("T1")).await;

        assert_eq!(outcome, RouteOutcome::LookupFailed);
        assert!(s.queue.is_empty().await);
    }
}
