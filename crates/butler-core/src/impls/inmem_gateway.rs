//! InMemoryMetadataGateway - 開発・テスト用の QRS 代替
//!
//! # 学習ポイント
//! - タスクごとにステータスの「台本」を持ち、fetch() のたびに 1 つ進める
//! - 台本が尽きたら最後のステータスのまま（QRS 側で止まっている状態を再現）
//! - fetch 失敗を注入できる（一時的な QRS 障害の再現）

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{ExecutionStatus, TaskId, TaskMetadata};
use crate::error::GatewayError;
use crate::ports::TaskMetadataGateway;

#[derive(Debug)]
struct ScriptedTask {
    metadata: TaskMetadata,
    statuses: VecDeque<ExecutionStatus>,
    pending_failures: u32,
}

/// InMemoryMetadataGateway は台本どおりにメタデータを返す
///
/// # 使用例
/// ```ignore
/// let gateway = InMemoryMetadataGateway::new().with_task(
///     TaskId::new("T1"),
///     TaskMetadata::new(QrsTaskType::Distribute, ExecutionStatus::Queued),
///     [ExecutionStatus::Queued, ExecutionStatus::FinishedSuccess],
/// );
/// ```
#[derive(Debug, Default)]
pub struct InMemoryMetadataGateway {
    tasks: Mutex<HashMap<TaskId, ScriptedTask>>,
    fetches: AtomicUsize,
}

impl InMemoryMetadataGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a task. Each `fetch()` consumes the next scripted status;
    /// with an empty script the template's status is returned forever.
    pub fn with_task(
        mut self,
        task_id: TaskId,
        metadata: TaskMetadata,
        statuses: impl IntoIterator<Item = ExecutionStatus>,
    ) -> Self {
        self.tasks.get_mut().insert(
            task_id,
            ScriptedTask {
                metadata,
                statuses: statuses.into_iter().collect(),
                pending_failures: 0,
            },
        );
        self
    }

    /// Append statuses to an existing task's script.
    pub async fn push_statuses(
        &self,
        task_id: &TaskId,
        statuses: impl IntoIterator<Item = ExecutionStatus>,
    ) {
        let mut tasks = self.tasks.lock().await;
        if let Some(task) = tasks.get_mut(task_id) {
            task.statuses.extend(statuses);
        }
    }

    /// Make the next `n` fetches of this task fail.
    pub async fn fail_next_fetches(&self, task_id: &TaskId, n: u32) {
        let mut tasks = self.tasks.lock().await;
        if let Some(task) = tasks.get_mut(task_id) {
            task.pending_failures += n;
        }
    }

    pub async fn remove(&self, task_id: &TaskId) {
        self.tasks.lock().await.remove(task_id);
    }

    /// Number of `fetch()` calls so far (failed ones included).
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TaskMetadataGateway for InMemoryMetadataGateway {
    async fn exists(&self, task_id: &TaskId) -> Result<bool, GatewayError> {
        Ok(self.tasks.lock().await.contains_key(task_id))
    }

    async fn fetch(&self, task_id: &TaskId) -> Result<TaskMetadata, GatewayError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);

        let mut tasks = self.tasks.lock().await;
        let task = tasks
            .get_mut(task_id)
            .ok_or_else(|| GatewayError::NotFound(task_id.clone()))?;

        if task.pending_failures > 0 {
            task.pending_failures -= 1;
            return Err(GatewayError::Fetch {
                task_id: task_id.clone(),
                reason: "injected failure".to_string(),
            });
        }

        if let Some(next) = task.statuses.pop_front() {
            task.metadata.last_execution_result.status = next;
        }
        Ok(task.metadata.clone())
    }
}
