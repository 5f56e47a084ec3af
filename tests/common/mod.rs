// ABOUTME: Common utilities and helpers for integration tests
// ABOUTME: Provides scripted collaborators and a harness that wires them into a mission engine

#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::json;
use std::collections::HashSet;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use missionforge::engine::{
    CancellationRegistry, Collaborators, EngineConfig, MissionEngine, MissionExecutor,
    WorkerOutput,
};
use missionforge::model::{MissionId, TaskRecord};
use missionforge::plan::PlanningRequest;
use missionforge::services::{
    CheckKind, CheckResult, InMemoryKnowledgeStore, Planner, ServiceError, ValidationRunner,
    VersionControl,
};
use missionforge::store::{InMemoryStore, MissionStore};
use missionforge::workers::{Worker, WorkerKind, WorkerRegistry};

/// Planner replaying a fixed response, optionally cancelling the mission it plans.
pub struct ScriptedPlanner {
    response: String,
    fail: bool,
    cancel_via: Option<CancellationRegistry>,
    pub requests: Mutex<Vec<PlanningRequest>>,
}

#[async_trait]
impl Planner for ScriptedPlanner {
    async fn plan(&self, request: &PlanningRequest) -> Result<String, ServiceError> {
        self.requests.lock().unwrap().push(request.clone());
        if let Some(registry) = &self.cancel_via {
            registry.request(request.mission_id);
        }
        if self.fail {
            return Err(ServiceError::unavailable("planner", "model endpoint down"));
        }
        Ok(self.response.clone())
    }
}

/// Worker recording start/finish order and the peak number of concurrent runs.
#[derive(Default)]
pub struct ProbeWorker {
    active: AtomicUsize,
    pub peak: AtomicUsize,
    pub events: Mutex<Vec<String>>,
    fail_titles: HashSet<String>,
    delay: Duration,
}

impl ProbeWorker {
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    pub fn started(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| e.strip_prefix("start:").map(str::to_string))
            .collect()
    }

    /// Position of an event in the log; panics when absent.
    pub fn index_of(&self, event: &str) -> usize {
        self.events()
            .iter()
            .position(|e| e == event)
            .unwrap_or_else(|| panic!("event {} not recorded", event))
    }
}

#[async_trait]
impl Worker for ProbeWorker {
    async fn execute(&self, task: &TaskRecord) -> Result<WorkerOutput, ServiceError> {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        self.events
            .lock()
            .unwrap()
            .push(format!("start:{}", task.title));

        tokio::time::sleep(self.delay).await;

        self.events
            .lock()
            .unwrap()
            .push(format!("finish:{}", task.title));
        self.active.fetch_sub(1, Ordering::SeqCst);

        if self.fail_titles.contains(&task.title) {
            return Err(ServiceError::failed("worker", format!("{} exploded", task.title)));
        }
        Ok(WorkerOutput::completed(json!({ "title": task.title })))
    }
}

/// Validation runner with canned results and a call log.
#[derive(Default)]
pub struct StubValidator {
    failing: Option<CheckKind>,
    pub calls: Mutex<Vec<CheckKind>>,
}

impl StubValidator {
    fn check(&self, kind: CheckKind) -> CheckResult {
        self.calls.lock().unwrap().push(kind);
        if self.failing == Some(kind) {
            CheckResult::failed(kind, format!("{} reported errors", kind))
        } else {
            CheckResult::passed(kind, "ok")
        }
    }
}

#[async_trait]
impl ValidationRunner for StubValidator {
    async fn run_lint(&self) -> CheckResult {
        self.check(CheckKind::Lint)
    }

    async fn run_test(&self) -> CheckResult {
        self.check(CheckKind::Test)
    }

    async fn run_build(&self) -> CheckResult {
        self.check(CheckKind::Build)
    }
}

#[derive(Default)]
pub struct RecordingVcs {
    pub calls: Mutex<Vec<String>>,
}

impl RecordingVcs {
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl VersionControl for RecordingVcs {
    async fn create_or_checkout_branch(&self, name: &str) -> Result<bool, ServiceError> {
        self.calls.lock().unwrap().push(format!("branch:{}", name));
        Ok(true)
    }

    async fn commit_all(&self, message: &str) -> Result<bool, ServiceError> {
        self.calls.lock().unwrap().push(format!("commit:{}", message));
        Ok(true)
    }
}

pub struct HarnessBuilder {
    response: String,
    max_concurrent: usize,
    fail_titles: Vec<String>,
    delay: Duration,
    failing_check: Option<CheckKind>,
    cancel_during_plan: bool,
    planner_fails: bool,
    only_kind: Option<WorkerKind>,
}

impl HarnessBuilder {
    pub fn new(response: &str) -> Self {
        Self {
            response: response.to_string(),
            max_concurrent: 3,
            fail_titles: Vec::new(),
            delay: Duration::from_millis(10),
            failing_check: None,
            cancel_during_plan: false,
            planner_fails: false,
            only_kind: None,
        }
    }

    pub fn max_concurrent(mut self, max: usize) -> Self {
        self.max_concurrent = max;
        self
    }

    pub fn fail_task(mut self, title: &str) -> Self {
        self.fail_titles.push(title.to_string());
        self
    }

    pub fn task_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn failing_check(mut self, kind: CheckKind) -> Self {
        self.failing_check = Some(kind);
        self
    }

    pub fn cancel_during_plan(mut self) -> Self {
        self.cancel_during_plan = true;
        self
    }

    pub fn planner_fails(mut self) -> Self {
        self.planner_fails = true;
        self
    }

    /// Register the probe worker for a single kind instead of every kind.
    pub fn only_kind(mut self, kind: WorkerKind) -> Self {
        self.only_kind = Some(kind);
        self
    }

    pub fn build(self) -> Harness {
        let registry = CancellationRegistry::new();
        let store = Arc::new(InMemoryStore::new());
        let knowledge = Arc::new(InMemoryKnowledgeStore::new());
        let planner = Arc::new(ScriptedPlanner {
            response: self.response,
            fail: self.planner_fails,
            cancel_via: self.cancel_during_plan.then(|| registry.clone()),
            requests: Mutex::new(Vec::new()),
        });
        let worker = Arc::new(ProbeWorker {
            fail_titles: self.fail_titles.into_iter().collect(),
            delay: self.delay,
            ..Default::default()
        });
        let validator = Arc::new(StubValidator {
            failing: self.failing_check,
            ..Default::default()
        });
        let vcs = Arc::new(RecordingVcs::default());

        let collaborators = Collaborators {
            store: store.clone(),
            planner: planner.clone(),
            knowledge: knowledge.clone(),
            validator: validator.clone(),
            vcs: vcs.clone(),
            workers: match self.only_kind {
                Some(kind) => WorkerRegistry::new().with_worker(kind, worker.clone()),
                None => WorkerRegistry::new().with_default(worker.clone()),
            },
        };
        let config = EngineConfig {
            max_concurrent_tasks: self.max_concurrent,
            ..EngineConfig::default()
        };
        let executor = MissionExecutor::new(config, collaborators).unwrap();

        Harness {
            engine: MissionEngine::with_registry(executor, registry),
            store,
            knowledge,
            planner,
            worker,
            validator,
            vcs,
        }
    }
}

pub struct Harness {
    pub engine: MissionEngine,
    pub store: Arc<InMemoryStore>,
    pub knowledge: Arc<InMemoryKnowledgeStore>,
    pub planner: Arc<ScriptedPlanner>,
    pub worker: Arc<ProbeWorker>,
    pub validator: Arc<StubValidator>,
    pub vcs: Arc<RecordingVcs>,
}

impl Harness {
    pub async fn create_mission(&self, title: &str, description: &str) -> MissionId {
        self.store
            .create_mission(title, description, Default::default())
            .await
            .unwrap()
            .id
    }
}

/// Planner response listing `(title, worker_kind, dependencies)` entries,
/// dependencies given as a comma separated list of titles.
pub fn plan_json(tasks: &[(&str, &str, &str)]) -> String {
    let entries: Vec<_> = tasks
        .iter()
        .map(|&(title, kind, deps)| {
            let deps: Vec<&str> = deps
                .split(',')
                .map(str::trim)
                .filter(|d| !d.is_empty())
                .collect();
            json!({
                "title": title,
                "description": format!("Do {}", title),
                "worker_kind": kind,
                "dependencies": deps,
            })
        })
        .collect();
    format!(
        "Here is the plan:\n{}\n",
        serde_json::to_string_pretty(&entries).unwrap()
    )
}

pub async fn write_file(path: &Path, contents: &str) {
    tokio::fs::write(path, contents).await.unwrap();
}
