//! OutcomeHandler port - 最終状態の通知先
//!
//! InfluxDB / email / Slack / Teams / webhook などへの送信はハンドラ側の責務。
//! キューとルーターは「どちらのメソッドを呼ぶか」だけを決める。

use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::{DistributionEvent, FinalOutcome, TaskMetadata};
use crate::error::HandlerError;

use super::isolate;

/// Success/failure sink pair for one task type.
///
/// Calling a method twice for the same run is tolerated (it may notify twice).
#[async_trait]
pub trait OutcomeHandler: Send + Sync {
    async fn on_success(
        &self,
        event: &DistributionEvent,
        metadata: &TaskMetadata,
    ) -> Result<(), HandlerError>;

    async fn on_failure(
        &self,
        event: &DistributionEvent,
        metadata: &TaskMetadata,
    ) -> Result<(), HandlerError>;
}

/// Route a final outcome to the matching handler method.
pub async fn deliver_outcome(
    handler: &dyn OutcomeHandler,
    outcome: FinalOutcome,
    event: &DistributionEvent,
    metadata: &TaskMetadata,
) -> Result<(), HandlerError> {
    match outcome {
        FinalOutcome::Success => handler.on_success(event, metadata).await,
        FinalOutcome::Failure => handler.on_failure(event, metadata).await,
    }
}

/// `deliver_outcome` on its own task; a panicking handler becomes
/// `HandlerError::Panicked`.
pub async fn deliver_outcome_isolated(
    handler: &Arc<dyn OutcomeHandler>,
    outcome: FinalOutcome,
    event: &DistributionEvent,
    metadata: &TaskMetadata,
) -> Result<(), HandlerError> {
    let handler = Arc::clone(handler);
    let event = event.clone();
    let metadata = metadata.clone();
    isolate(async move { deliver_outcome(handler.as_ref(), outcome, &event, &metadata).await })
        .await
        .unwrap_or_else(|reason| Err(HandlerError::Panicked { reason }))
}
