// ABOUTME: Registry of cancellation tokens keyed by mission id
// ABOUTME: Cancel requests may arrive before, during or after a run and are consumed when the run ends

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::model::MissionId;

#[derive(Debug, Clone, Default)]
pub struct CancellationRegistry {
    tokens: Arc<Mutex<HashMap<MissionId, CancellationToken>>>,
}

impl CancellationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<MissionId, CancellationToken>> {
        self.tokens
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Mark a mission cancelled. A run already holding the token observes it
    /// at its next checkpoint; a run started later observes it immediately.
    pub fn request(&self, mission_id: MissionId) {
        debug!("Cancellation requested for mission {}", mission_id);
        self.lock()
            .entry(mission_id)
            .or_insert_with(CancellationToken::new)
            .cancel();
    }

    /// Token for a run of this mission, reusing a pending request if any.
    pub fn acquire(&self, mission_id: MissionId) -> CancellationToken {
        self.lock()
            .entry(mission_id)
            .or_insert_with(CancellationToken::new)
            .clone()
    }

    pub fn is_requested(&self, mission_id: MissionId) -> bool {
        self.lock()
            .get(&mission_id)
            .is_some_and(|token| token.is_cancelled())
    }

    pub fn clear(&self, mission_id: MissionId) {
        self.lock().remove(&mission_id);
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}
