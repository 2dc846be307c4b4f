use serde::{Deserialize, Serialize};
use std::fmt;

use super::status::ExecutionStatus;

/// QRS task id (a GUID in practice, treated as opaque here).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for TaskId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Task type as reported by QRS (`taskType`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "i32", into = "i32")]
pub enum QrsTaskType {
    Reload,
    ExternalProgram,
    UserSync,
    Distribute,
    Preload,
    Other(i32),
}

impl QrsTaskType {
    pub fn code(self) -> i32 {
        match self {
            Self::Reload => 0,
            Self::ExternalProgram => 1,
            Self::UserSync => 2,
            Self::Distribute => 3,
            Self::Preload => 4,
            Self::Other(code) => code,
        }
    }
}

impl From<i32> for QrsTaskType {
    fn from(code: i32) -> Self {
        match code {
            0 => Self::Reload,
            1 => Self::ExternalProgram,
            2 => Self::UserSync,
            3 => Self::Distribute,
            4 => Self::Preload,
            other => Self::Other(other),
        }
    }
}

impl From<QrsTaskType> for i32 {
    fn from(task_type: QrsTaskType) -> Self {
        task_type.code()
    }
}

impl fmt::Display for QrsTaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reload => f.write_str("reload"),
            Self::ExternalProgram => f.write_str("externalprogram"),
            Self::UserSync => f.write_str("usersync"),
            Self::Distribute => f.write_str("distribute"),
            Self::Preload => f.write_str("preload"),
            Self::Other(code) => write!(f, "unknown({code})"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomProperty {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub status: ExecutionStatus,
}

/// Snapshot of a task as QRS describes it right now.
///
/// Field names follow the QRS JSON (`taskType`, `customProperties`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskMetadata {
    pub task_type: QrsTaskType,

    #[serde(default)]
    pub tags: Vec<String>,

    #[serde(default)]
    pub custom_properties: Vec<CustomProperty>,

    pub last_execution_result: ExecutionResult,
}

impl TaskMetadata {
    pub fn new(task_type: QrsTaskType, status: ExecutionStatus) -> Self {
        Self {
            task_type,
            tags: Vec::new(),
            custom_properties: Vec::new(),
            last_execution_result: ExecutionResult { status },
        }
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    pub fn with_custom_property(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.custom_properties.push(CustomProperty {
            name: name.into(),
            value: value.into(),
        });
        self
    }

    pub fn execution_status(&self) -> ExecutionStatus {
        self.last_execution_result.status
    }
}
