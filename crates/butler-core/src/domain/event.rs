//! DistributionEvent - distribute タスク完了通知の中身
//!
//! UDP で届いた通知は二度と受け取れないので、キューに入れるときは
//! この構造体をまるごとコピーして持っておく。

use serde::{Deserialize, Serialize};

use super::task::TaskId;

/// One distribution-completion notification, already decoded from UDP.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistributionEvent {
    pub host: String,
    pub task_name: String,
    pub user: String,
    pub task_id: TaskId,
    pub log_timestamp: String,
    pub log_level: String,
    pub execution_id: String,
    pub log_message: String,
}

impl DistributionEvent {
    /// Minimal event for a task id; the remaining fields start empty.
    pub fn for_task(task_id: impl Into<TaskId>) -> Self {
        Self {
            host: String::new(),
            task_name: String::new(),
            user: String::new(),
            task_id: task_id.into(),
            log_timestamp: String::new(),
            log_level: String::new(),
            execution_id: String::new(),
            log_message: String::new(),
        }
    }

    pub fn with_task_name(mut self, task_name: impl Into<String>) -> Self {
        self.task_name = task_name.into();
        self
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn with_log_message(mut self, log_message: impl Into<String>) -> Self {
        self.log_message = log_message.into();
        self
    }
}
