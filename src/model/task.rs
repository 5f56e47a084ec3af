// ABOUTME: Task record and its status lifecycle
// ABOUTME: Tasks move pending -> in_progress -> completed|failed and never back

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::error::{ModelError, Result};
use super::mission::MissionId;
use super::Metadata;
use crate::workers::WorkerKind;

pub type TaskId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed)
    }

    pub fn can_transition_to(&self, next: TaskStatus) -> bool {
        matches!(
            (self, next),
            (TaskStatus::Pending, TaskStatus::InProgress)
                | (TaskStatus::InProgress, TaskStatus::Completed)
                | (TaskStatus::InProgress, TaskStatus::Failed)
        )
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = ModelError;

    fn from_str(value: &str) -> Result<Self> {
        match value {
            "pending" => Ok(TaskStatus::Pending),
            "in_progress" => Ok(TaskStatus::InProgress),
            "completed" => Ok(TaskStatus::Completed),
            "failed" => Ok(TaskStatus::Failed),
            other => Err(ModelError::UnknownStatus {
                value: other.to_string(),
            }),
        }
    }
}

/// Insert shape for a task created from one plan entry.
#[derive(Debug, Clone)]
pub struct NewTask {
    pub worker_kind: WorkerKind,
    pub title: String,
    pub description: Option<String>,
    pub metadata: Metadata,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskRecord {
    pub id: TaskId,
    pub mission_id: MissionId,
    pub worker_kind: WorkerKind,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub result: Option<serde_json::Value>,
    pub error: Option<String>,
    #[serde(default)]
    pub metadata: Metadata,
}

impl TaskRecord {
    pub fn new(id: TaskId, mission_id: MissionId, task: NewTask) -> Self {
        Self {
            id,
            mission_id,
            worker_kind: task.worker_kind,
            title: task.title,
            description: task.description,
            status: TaskStatus::Pending,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            result: None,
            error: None,
            metadata: task.metadata,
        }
    }

    fn advance(&mut self, next: TaskStatus) -> Result<()> {
        if !self.status.can_transition_to(next) {
            return Err(ModelError::InvalidTaskTransition {
                task_id: self.id,
                from: self.status.to_string(),
                to: next.to_string(),
            });
        }
        self.status = next;
        Ok(())
    }

    pub fn mark_started(&mut self) -> Result<()> {
        self.advance(TaskStatus::InProgress)?;
        self.started_at = Some(Utc::now());
        Ok(())
    }

    pub fn mark_completed(&mut self, result: serde_json::Value) -> Result<()> {
        self.advance(TaskStatus::Completed)?;
        self.completed_at = Some(Utc::now());
        self.result = Some(result);
        self.record_duration();
        Ok(())
    }

    pub fn mark_failed(&mut self, error: impl Into<String>) -> Result<()> {
        self.advance(TaskStatus::Failed)?;
        self.completed_at = Some(Utc::now());
        self.error = Some(error.into());
        self.record_duration();
        Ok(())
    }

    fn record_duration(&mut self) {
        if let (Some(started), Some(finished)) = (self.started_at, self.completed_at) {
            let millis = (finished - started).num_milliseconds().max(0);
            self.metadata
                .insert("duration_ms".to_string(), serde_json::Value::from(millis));
        }
    }

    pub fn is_finished(&self) -> bool {
        self.status.is_terminal()
    }
}
