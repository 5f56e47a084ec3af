// ABOUTME: Per-run execution context threaded through every phase
// ABOUTME: Carries the cancellation token checked at each checkpoint

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;

use super::error::{MissionError, Result};
use crate::model::MissionId;

#[derive(Debug, Clone)]
pub struct MissionContext {
    pub mission_id: MissionId,
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    token: CancellationToken,
}

impl MissionContext {
    pub fn new(mission_id: MissionId, token: CancellationToken) -> Self {
        Self {
            mission_id,
            run_id: uuid::Uuid::new_v4().to_string(),
            started_at: Utc::now(),
            token,
        }
    }

    /// Context for a run that cannot be cancelled from outside.
    pub fn detached(mission_id: MissionId) -> Self {
        Self::new(mission_id, CancellationToken::new())
    }

    pub fn checkpoint(&self) -> Result<()> {
        if self.token.is_cancelled() {
            Err(MissionError::Cancelled {
                mission_id: self.mission_id,
            })
        } else {
            Ok(())
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }
}
