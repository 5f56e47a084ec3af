// ABOUTME: Error types for record model operations
// ABOUTME: Covers rejected status transitions and unrecognised status strings

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    #[error("Invalid mission transition for mission {mission_id}: {from} -> {to}")]
    InvalidMissionTransition {
        mission_id: u64,
        from: String,
        to: String,
    },

    #[error("Invalid task transition for task {task_id}: {from} -> {to}")]
    InvalidTaskTransition { task_id: u64, from: String, to: String },

    #[error("Unknown status '{value}'")]
    UnknownStatus { value: String },
}

pub type Result<T> = std::result::Result<T, ModelError>;
