// ABOUTME: Mission record and its status lifecycle
// ABOUTME: Enforces the linear phase chain with failed/cancelled escape hatches

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::error::{ModelError, Result};
use super::Metadata;
use crate::plan::Plan;

pub type MissionId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissionStatus {
    Planning,
    Executing,
    Validating,
    Integrating,
    Completed,
    Failed,
    Cancelled,
}

impl MissionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MissionStatus::Planning => "planning",
            MissionStatus::Executing => "executing",
            MissionStatus::Validating => "validating",
            MissionStatus::Integrating => "integrating",
            MissionStatus::Completed => "completed",
            MissionStatus::Failed => "failed",
            MissionStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            MissionStatus::Completed | MissionStatus::Failed | MissionStatus::Cancelled
        )
    }

    /// Forward moves follow the phase order one step at a time; `failed` and
    /// `cancelled` are reachable from every non-terminal state.
    pub fn can_transition_to(&self, next: MissionStatus) -> bool {
        if self.is_terminal() {
            return false;
        }

        match next {
            MissionStatus::Failed | MissionStatus::Cancelled => true,
            MissionStatus::Executing => *self == MissionStatus::Planning,
            MissionStatus::Validating => *self == MissionStatus::Executing,
            MissionStatus::Integrating => *self == MissionStatus::Validating,
            MissionStatus::Completed => *self == MissionStatus::Integrating,
            MissionStatus::Planning => false,
        }
    }
}

impl std::fmt::Display for MissionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for MissionStatus {
    type Err = ModelError;

    fn from_str(value: &str) -> Result<Self> {
        match value {
            "planning" => Ok(MissionStatus::Planning),
            "executing" => Ok(MissionStatus::Executing),
            "validating" => Ok(MissionStatus::Validating),
            "integrating" => Ok(MissionStatus::Integrating),
            "completed" => Ok(MissionStatus::Completed),
            "failed" => Ok(MissionStatus::Failed),
            "cancelled" => Ok(MissionStatus::Cancelled),
            other => Err(ModelError::UnknownStatus {
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Mission {
    pub id: MissionId,
    pub title: String,
    pub description: String,
    pub status: MissionStatus,
    pub plan: Option<Plan>,
    #[serde(default)]
    pub metadata: Metadata,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Diagnostic payload merged into mission metadata when a run fails.
#[derive(Debug, Clone, PartialEq)]
pub struct FailureDetails {
    pub message: String,
    pub kind: String,
    pub trace: String,
    pub at: DateTime<Utc>,
}

impl Mission {
    pub fn new(id: MissionId, title: impl Into<String>, description: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id,
            title: title.into(),
            description: description.into(),
            status: MissionStatus::Planning,
            plan: None,
            metadata: Metadata::new(),
            created_at: now,
            updated_at: now,
            completed_at: None,
        }
    }

    pub fn transition_to(&mut self, next: MissionStatus) -> Result<()> {
        if !self.status.can_transition_to(next) {
            return Err(ModelError::InvalidMissionTransition {
                mission_id: self.id,
                from: self.status.to_string(),
                to: next.to_string(),
            });
        }

        self.status = next;
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn complete(&mut self) -> Result<()> {
        self.transition_to(MissionStatus::Completed)?;
        self.completed_at = Some(self.updated_at);
        Ok(())
    }

    pub fn set_metadata(&mut self, key: impl Into<String>, value: serde_json::Value) {
        self.metadata.insert(key.into(), value);
        self.updated_at = Utc::now();
    }

    pub fn record_failure(&mut self, details: &FailureDetails) {
        self.set_metadata("error", details.message.clone().into());
        self.set_metadata("error_type", details.kind.clone().into());
        self.set_metadata("error_trace", details.trace.clone().into());
        self.set_metadata("error_at", details.at.to_rfc3339().into());
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}
