// ABOUTME: Durable record store for missions and their tasks
// ABOUTME: The engine reaches persistence only through load, update and commit operations

pub mod memory;

use async_trait::async_trait;
use thiserror::Error;

use crate::model::{Metadata, Mission, MissionId, NewTask, TaskId, TaskRecord};

pub use memory::{InMemoryStore, StoreSnapshot};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Mission {0} not found")]
    MissionNotFound(MissionId),

    #[error("Task {0} not found")]
    TaskNotFound(TaskId),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal store error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;

#[async_trait]
pub trait MissionStore: Send + Sync {
    async fn create_mission(
        &self,
        title: &str,
        description: &str,
        metadata: Metadata,
    ) -> Result<Mission>;

    async fn load_mission(&self, id: MissionId) -> Result<Mission>;

    async fn update_mission(&self, mission: &Mission) -> Result<()>;

    /// Insert one record per entry, assigning ascending ids in input order.
    async fn insert_tasks(&self, mission_id: MissionId, tasks: Vec<NewTask>)
        -> Result<Vec<TaskRecord>>;

    /// Tasks of a mission ordered by id.
    async fn load_tasks(&self, mission_id: MissionId) -> Result<Vec<TaskRecord>>;

    async fn update_task(&self, task: &TaskRecord) -> Result<()>;

    async fn commit(&self) -> Result<()>;
}
