//! LoggingOutcomeHandler - 結果を tracing に書くだけの通知先
//!
//! 本番の通知先（InfluxDB, email, Slack ...）の代わりに CLI で使う。

use async_trait::async_trait;
use tracing::{info, warn};

use crate::domain::{DistributionEvent, TaskMetadata};
use crate::error::HandlerError;
use crate::ports::OutcomeHandler;

#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingOutcomeHandler;

impl LoggingOutcomeHandler {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl OutcomeHandler for LoggingOutcomeHandler {
    async fn on_success(
        &self,
        event: &DistributionEvent,
        metadata: &TaskMetadata,
    ) -> Result<(), HandlerError> {
        info!(
            task_id = %event.task_id,
            task_name = %event.task_name,
            host = %event.host,
            execution_id = %event.execution_id,
            status = %metadata.execution_status(),
            tags = ?metadata.tags,
            "distribute task completed successfully"
        );
        Ok(())
    }

    async fn on_failure(
        &self,
        event: &DistributionEvent,
        metadata: &TaskMetadata,
    ) -> Result<(), HandlerError> {
        warn!(
            task_id = %event.task_id,
            task_name = %event.task_name,
            host = %event.host,
            execution_id = %event.execution_id,
            status = %metadata.execution_status(),
            tags = ?metadata.tags,
            "distribute task failed"
        );
        Ok(())
    }
}
