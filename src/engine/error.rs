// ABOUTME: Error types for mission execution
// ABOUTME: Each variant maps to a stable kind name persisted on failed missions

use thiserror::Error;

use crate::model::{MissionId, MissionStatus, ModelError};
use crate::plan::PlanError;
use crate::store::StoreError;

#[derive(Error, Debug)]
pub enum MissionError {
    #[error("Task '{title}' failed: {message}")]
    TaskFailed { title: String, message: String },

    #[error("Mission {mission_id} was cancelled")]
    Cancelled { mission_id: MissionId },

    #[error("Mission {mission_id} already finished with status {status}")]
    AlreadyFinished {
        mission_id: MissionId,
        status: MissionStatus,
    },

    #[error("Unknown worker kind: {kind}")]
    UnknownWorkerKind { kind: String },

    #[error("No worker registered for kind: {kind}")]
    WorkerNotRegistered { kind: String },

    #[error("Planner error: {message}")]
    Planner { message: String },

    #[error("Knowledge store error: {message}")]
    Knowledge { message: String },

    #[error("Integration error: {message}")]
    Integration { message: String },

    #[error("Invalid state change: {0}")]
    Model(#[from] ModelError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Plan error: {0}")]
    Plan(#[from] PlanError),

    #[error("Join error: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl MissionError {
    pub fn kind(&self) -> &'static str {
        match self {
            MissionError::TaskFailed { .. } => "task_failed",
            MissionError::Cancelled { .. } => "cancelled",
            MissionError::AlreadyFinished { .. } => "already_finished",
            MissionError::UnknownWorkerKind { .. } => "unknown_worker_kind",
            MissionError::WorkerNotRegistered { .. } => "worker_not_registered",
            MissionError::Planner { .. } => "planner",
            MissionError::Knowledge { .. } => "knowledge",
            MissionError::Integration { .. } => "integration",
            MissionError::Model(_) => "invalid_transition",
            MissionError::Store(_) => "store",
            MissionError::Plan(_) => "plan",
            MissionError::Join(_) => "join",
            MissionError::Configuration(_) => "configuration",
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, MissionError::Cancelled { .. })
    }
}

pub type Result<T> = std::result::Result<T, MissionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_names() {
        let err = MissionError::TaskFailed {
            title: "API".to_string(),
            message: "boom".to_string(),
        };
        assert_eq!(err.kind(), "task_failed");
        assert_eq!(err.to_string(), "Task 'API' failed: boom");

        let err: MissionError = StoreError::MissionNotFound(4).into();
        assert_eq!(err.kind(), "store");
        assert!(MissionError::Cancelled { mission_id: 1 }.is_cancelled());
    }
}
