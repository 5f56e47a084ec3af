// ABOUTME: Capability-keyed worker pool executing individual mission tasks
// ABOUTME: Worker kinds are a closed enum resolved once to registered handles

pub mod command;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::engine::error::{MissionError, Result};
use crate::engine::WorkerOutput;
use crate::model::TaskRecord;
use crate::services::ServiceError;

pub use command::{CommandConfig, CommandWorker};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerKind {
    Frontend,
    Backend,
    Database,
    Qa,
    Devops,
    Security,
    Documentation,
}

impl WorkerKind {
    pub fn all() -> &'static [WorkerKind] {
        &[
            WorkerKind::Frontend,
            WorkerKind::Backend,
            WorkerKind::Database,
            WorkerKind::Qa,
            WorkerKind::Devops,
            WorkerKind::Security,
            WorkerKind::Documentation,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            WorkerKind::Frontend => "frontend",
            WorkerKind::Backend => "backend",
            WorkerKind::Database => "database",
            WorkerKind::Qa => "qa",
            WorkerKind::Devops => "devops",
            WorkerKind::Security => "security",
            WorkerKind::Documentation => "documentation",
        }
    }
}

impl fmt::Display for WorkerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for WorkerKind {
    type Err = MissionError;

    fn from_str(value: &str) -> Result<Self> {
        let normalized = value.trim().to_ascii_lowercase();
        WorkerKind::all()
            .iter()
            .copied()
            .find(|kind| kind.as_str() == normalized)
            .ok_or_else(|| MissionError::UnknownWorkerKind {
                kind: value.to_string(),
            })
    }
}

#[async_trait]
pub trait Worker: Send + Sync {
    async fn execute(&self, task: &TaskRecord) -> std::result::Result<WorkerOutput, ServiceError>;
}

#[derive(Clone, Default)]
pub struct WorkerRegistry {
    workers: HashMap<WorkerKind, Arc<dyn Worker>>,
}

impl WorkerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, kind: WorkerKind, worker: Arc<dyn Worker>) {
        self.workers.insert(kind, worker);
    }

    pub fn with_worker(mut self, kind: WorkerKind, worker: Arc<dyn Worker>) -> Self {
        self.register(kind, worker);
        self
    }

    /// Register the same handle for every kind that has no worker yet.
    pub fn with_default(mut self, worker: Arc<dyn Worker>) -> Self {
        for kind in WorkerKind::all() {
            self.workers
                .entry(*kind)
                .or_insert_with(|| Arc::clone(&worker));
        }
        self
    }

    /// Map a planner-supplied kind tag to its registered worker.
    pub fn resolve(&self, kind: &str) -> Result<WorkerKind> {
        let kind: WorkerKind = kind.parse()?;
        if self.workers.contains_key(&kind) {
            Ok(kind)
        } else {
            Err(MissionError::WorkerNotRegistered {
                kind: kind.to_string(),
            })
        }
    }

    pub fn get(&self, kind: WorkerKind) -> Result<Arc<dyn Worker>> {
        self.workers
            .get(&kind)
            .cloned()
            .ok_or_else(|| MissionError::WorkerNotRegistered {
                kind: kind.to_string(),
            })
    }

    pub fn kinds(&self) -> Vec<WorkerKind> {
        let mut kinds: Vec<WorkerKind> = self.workers.keys().copied().collect();
        kinds.sort();
        kinds
    }
}

impl fmt::Debug for WorkerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerRegistry")
            .field("kinds", &self.kinds())
            .finish()
    }
}
