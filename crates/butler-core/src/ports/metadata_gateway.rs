//! TaskMetadataGateway port - QRS へのタスク問い合わせ
//!
//! HTTP クライアント本体はこのクレートの外。ここでは問い合わせの形だけを決める。
//! 状態は持たない純粋なクエリ。

use std::sync::Arc;

use async_trait::async_trait;

use super::isolate;
use crate::domain::{TaskId, TaskMetadata};
use crate::error::GatewayError;

/// Read-only view of QRS task metadata.
#[async_trait]
pub trait TaskMetadataGateway: Send + Sync {
    /// Does QRS know this task id?
    async fn exists(&self, task_id: &TaskId) -> Result<bool, GatewayError>;

    /// Current metadata (type, tags, custom properties, last execution status).
    async fn fetch(&self, task_id: &TaskId) -> Result<TaskMetadata, GatewayError>;
}

/// `exists()` on its own task; a panic becomes `GatewayError::Panicked`.
pub async fn exists_isolated(
    gateway: &Arc<dyn TaskMetadataGateway>,
    task_id: &TaskId,
) -> Result<bool, GatewayError> {
    let gateway = Arc::clone(gateway);
    let id = task_id.clone();
    isolate(async move { gateway.exists(&id).await })
        .await
        .unwrap_or_else(|reason| {
            Err(GatewayError::Panicked {
                task_id: task_id.clone(),
                reason,
            })
        })
}

/// `fetch()` on its own task; a panic becomes `GatewayError::Panicked`.
pub async fn fetch_isolated(
    gateway: &Arc<dyn TaskMetadataGateway>,
    task_id: &TaskId,
) -> Result<TaskMetadata, GatewayError> {
    let gateway = Arc::clone(gateway);
    let id = task_id.clone();
    isolate(async move { gateway.fetch(&id).await })
        .await
        .unwrap_or_else(|reason| {
            Err(GatewayError::Panicked {
                task_id: task_id.clone(),
                reason,
            })
        })
}
