//! Domain model (task ids, QRS metadata, execution status, events).

pub mod event;
pub mod ids;
pub mod status;
pub mod task;

pub use event::DistributionEvent;
pub use ids::AdmissionId;
pub use status::{
    ExecutionStatus, FinalOutcome, StatusClass, is_final_state, is_intermediate_state,
};
pub use task::{CustomProperty, ExecutionResult, QrsTaskType, TaskId, TaskMetadata};
