// ABOUTME: In-memory mission store with an optional JSON snapshot written on commit
// ABOUTME: Backs the binary and the test suite

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

use super::{MissionStore, Result, StoreError};
use crate::model::{Metadata, Mission, MissionId, NewTask, TaskId, TaskRecord};

#[derive(Debug, Default)]
struct State {
    missions: BTreeMap<MissionId, Mission>,
    tasks: BTreeMap<TaskId, TaskRecord>,
    next_mission_id: MissionId,
    next_task_id: TaskId,
    commits: u64,
}

/// Point-in-time copy of every record, as written to the snapshot file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreSnapshot {
    pub missions: Vec<Mission>,
    pub tasks: Vec<TaskRecord>,
    pub commits: u64,
}

impl StoreSnapshot {
    pub fn tasks_for(&self, mission_id: MissionId) -> Vec<&TaskRecord> {
        self.tasks
            .iter()
            .filter(|task| task.mission_id == mission_id)
            .collect()
    }
}

pub struct InMemoryStore {
    state: RwLock<State>,
    snapshot_path: Option<PathBuf>,
    write_lock: Mutex<()>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(State {
                next_mission_id: 1,
                next_task_id: 1,
                ..Default::default()
            }),
            snapshot_path: None,
            write_lock: Mutex::new(()),
        }
    }

    pub fn with_snapshot_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.snapshot_path = Some(path.into());
        self
    }

    pub async fn snapshot(&self) -> StoreSnapshot {
        let state = self.state.read().await;
        StoreSnapshot {
            missions: state.missions.values().cloned().collect(),
            tasks: state.tasks.values().cloned().collect(),
            commits: state.commits,
        }
    }

    pub async fn commit_count(&self) -> u64 {
        self.state.read().await.commits
    }

    async fn write_snapshot(&self, path: &Path) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let json = serde_json::to_vec_pretty(&self.snapshot().await)?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let staging = path.with_extension("tmp");
        tokio::fs::write(&staging, json).await?;
        tokio::fs::rename(&staging, path).await?;
        debug!("Wrote store snapshot to {}", path.display());
        Ok(())
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MissionStore for InMemoryStore {
    async fn create_mission(
        &self,
        title: &str,
        description: &str,
        metadata: Metadata,
    ) -> Result<Mission> {
        let mut state = self.state.write().await;
        let id = state.next_mission_id;
        state.next_mission_id += 1;

        let mut mission = Mission::new(id, title, description);
        mission.metadata = metadata;
        state.missions.insert(id, mission.clone());
        Ok(mission)
    }

    async fn load_mission(&self, id: MissionId) -> Result<Mission> {
        let state = self.state.read().await;
        state
            .missions
            .get(&id)
            .cloned()
            .ok_or(StoreError::MissionNotFound(id))
    }

    async fn update_mission(&self, mission: &Mission) -> Result<()> {
        let mut state = self.state.write().await;
        match state.missions.get_mut(&mission.id) {
            Some(slot) => {
                *slot = mission.clone();
                Ok(())
            }
            None => Err(StoreError::MissionNotFound(mission.id)),
        }
    }

    async fn insert_tasks(
        &self,
        mission_id: MissionId,
        tasks: Vec<NewTask>,
    ) -> Result<Vec<TaskRecord>> {
        let mut state = self.state.write().await;
        if !state.missions.contains_key(&mission_id) {
            return Err(StoreError::MissionNotFound(mission_id));
        }

        let mut records = Vec::with_capacity(tasks.len());
        for task in tasks {
            let id = state.next_task_id;
            state.next_task_id += 1;
            let record = TaskRecord::new(id, mission_id, task);
            state.tasks.insert(id, record.clone());
            records.push(record);
        }
        Ok(records)
    }

    async fn load_tasks(&self, mission_id: MissionId) -> Result<Vec<TaskRecord>> {
        let state = self.state.read().await;
        Ok(state
            .tasks
            .values()
            .filter(|task| task.mission_id == mission_id)
            .cloned()
            .collect())
    }

    async fn update_task(&self, task: &TaskRecord) -> Result<()> {
        let mut state = self.state.write().await;
        match state.tasks.get_mut(&task.id) {
            Some(slot) => {
                *slot = task.clone();
                Ok(())
            }
            None => Err(StoreError::TaskNotFound(task.id)),
        }
    }

    async fn commit(&self) -> Result<()> {
        self.state.write().await.commits += 1;
        if let Some(ref path) = self.snapshot_path {
            self.write_snapshot(path).await?;
        }
        Ok(())
    }
}
