//! RecordingOutcomeHandler - 呼び出しを記録するだけのハンドラ（テスト用）

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{DistributionEvent, FinalOutcome, TaskMetadata};
use crate::error::HandlerError;
use crate::ports::OutcomeHandler;

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedOutcome {
    pub outcome: FinalOutcome,
    pub event: DistributionEvent,
    pub metadata: TaskMetadata,
}

/// Records every invocation. With `set_failing(true)` each call is still
/// recorded but returns a `HandlerError`.
#[derive(Debug, Default)]
pub struct RecordingOutcomeHandler {
    calls: Mutex<Vec<RecordedOutcome>>,
    failing: AtomicBool,
}

impl RecordingOutcomeHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub async fn calls(&self) -> Vec<RecordedOutcome> {
        self.calls.lock().await.clone()
    }

    pub async fn count(&self, outcome: FinalOutcome) -> usize {
        self.calls
            .lock()
            .await
            .iter()
            .filter(|call| call.outcome == outcome)
            .count()
    }

    async fn record(
        &self,
        outcome: FinalOutcome,
        event: &DistributionEvent,
        metadata: &TaskMetadata,
    ) -> Result<(), HandlerError> {
        self.calls.lock().await.push(RecordedOutcome {
            outcome,
            event: event.clone(),
            metadata: metadata.clone(),
        });

        if self.failing.load(Ordering::SeqCst) {
            return Err(HandlerError::Delivery {
                sink: "recording".to_string(),
                reason: "configured to fail".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl OutcomeHandler for RecordingOutcomeHandler {
    async fn on_success(
        &self,
        event: &DistributionEvent,
        metadata: &TaskMetadata,
    ) -> Result<(), HandlerError> {
        self.record(FinalOutcome::Success, event, metadata).await
    }

    async fn on_failure(
        &self,
        event: &DistributionEvent,
        metadata: &TaskMetadata,
    ) -> Result<(), HandlerError> {
        self.record(FinalOutcome::Failure, event, metadata).await
    }
}
