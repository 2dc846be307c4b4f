use thiserror::Error;

use crate::config::ConfigError;
use crate::domain::{QrsTaskType, TaskId};

/// Failure talking to QRS about a task.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GatewayError {
    #[error("task {0} not found in QRS")]
    NotFound(TaskId),

    #[error("metadata fetch failed for task {task_id}: {reason}")]
    Fetch { task_id: TaskId, reason: String },

    #[error("QRS gateway panicked for task {task_id}: {reason}")]
    Panicked { task_id: TaskId, reason: String },
}

/// Failure reported by an outcome handler (a notification sink).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum HandlerError {
    #[error("{sink} delivery failed: {reason}")]
    Delivery { sink: String, reason: String },

    #[error("outcome handler panicked: {reason}")]
    Panicked { reason: String },
}

#[derive(Debug, Error)]
pub enum ButlerError {
    #[error("duplicate outcome handler for task_type={0}")]
    DuplicateHandler(QrsTaskType),

    #[error("no outcome handler registered for task_type={0}")]
    MissingHandler(QrsTaskType),

    #[error(transparent)]
    Config(#[from] ConfigError),
}
