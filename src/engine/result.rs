// ABOUTME: Result types produced by workers, the scheduler and a full mission run
// ABOUTME: Includes the mission report returned to callers and printed by the binary

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::model::{MissionId, MissionStatus, TaskId, TaskRecord, TaskStatus};
use crate::services::CheckResult;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerOutput {
    pub status: String,
    pub payload: serde_json::Value,
}

impl WorkerOutput {
    pub fn completed(payload: serde_json::Value) -> Self {
        Self {
            status: "completed".to_string(),
            payload,
        }
    }

    /// Form persisted as the task's `result`.
    pub fn to_value(&self) -> serde_json::Value {
        serde_json::json!({
            "status": self.status,
            "payload": self.payload,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletedTask {
    pub position: usize,
    pub task_id: TaskId,
    pub title: String,
    pub output: WorkerOutput,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub checks: Vec<CheckResult>,
}

impl ValidationReport {
    pub fn passed(&self) -> bool {
        self.checks.iter().all(|check| check.success)
    }

    pub fn failed_checks(&self) -> Vec<&CheckResult> {
        self.checks.iter().filter(|check| !check.success).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntegrationSummary {
    pub branch: String,
    pub branch_ready: bool,
    pub committed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissionOutcome {
    Completed,
    ValidationFailed,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskSummary {
    pub total: usize,
    pub pending: usize,
    pub in_progress: usize,
    pub completed: usize,
    pub failed: usize,
}

impl TaskSummary {
    pub fn from_records(tasks: &[TaskRecord]) -> Self {
        let mut summary = TaskSummary {
            total: tasks.len(),
            ..Default::default()
        };
        for task in tasks {
            match task.status {
                TaskStatus::Pending => summary.pending += 1,
                TaskStatus::InProgress => summary.in_progress += 1,
                TaskStatus::Completed => summary.completed += 1,
                TaskStatus::Failed => summary.failed += 1,
            }
        }
        summary
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MissionReport {
    pub mission_id: MissionId,
    pub run_id: String,
    pub title: String,
    pub status: MissionStatus,
    pub outcome: MissionOutcome,
    pub results: Vec<CompletedTask>,
    pub validation: ValidationReport,
    pub integration: Option<IntegrationSummary>,
    pub knowledge_item_id: Option<u64>,
    pub tasks: TaskSummary,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    #[serde(with = "humantime_serde")]
    pub duration: Duration,
}

impl MissionReport {
    pub fn is_success(&self) -> bool {
        self.outcome == MissionOutcome::Completed
    }
}
