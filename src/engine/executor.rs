// ABOUTME: Mission executor driving a mission through plan, execute, validate, integrate and memory
// ABOUTME: Also hosts the engine facade that owns cancellation and spawns tracked mission runs

use chrono::Utc;
use serde_json::json;
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};

use super::cancel::CancellationRegistry;
use super::context::MissionContext;
use super::dependency::DependencyGraph;
use super::error::{MissionError, Result};
use super::result::{
    CompletedTask, IntegrationSummary, MissionOutcome, MissionReport, TaskSummary,
    ValidationReport,
};
use super::scheduler::{WaveScheduler, DEFAULT_MAX_CONCURRENT};
use crate::model::{
    FailureDetails, KnowledgeItem, Mission, MissionId, MissionStatus, NewTask, TaskRecord,
};
use crate::plan::{Plan, PlanParser, PlanValidator, PlanningRequest};
use crate::services::{KnowledgeStore, Planner, ValidationRunner, VersionControl};
use crate::store::MissionStore;
use crate::workers::WorkerRegistry;

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub max_concurrent_tasks: usize,
    pub knowledge_search_limit: usize,
    pub branch_slug_length: usize,
    /// Number of error sources kept in the persisted failure trace.
    pub trace_depth: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_concurrent_tasks: DEFAULT_MAX_CONCURRENT,
            knowledge_search_limit: 5,
            branch_slug_length: 30,
            trace_depth: 8,
        }
    }
}

/// Everything a mission run talks to.
pub struct Collaborators {
    pub store: Arc<dyn MissionStore>,
    pub planner: Arc<dyn Planner>,
    pub knowledge: Arc<dyn KnowledgeStore>,
    pub validator: Arc<dyn ValidationRunner>,
    pub vcs: Arc<dyn VersionControl>,
    pub workers: WorkerRegistry,
}

pub struct MissionExecutor {
    config: EngineConfig,
    store: Arc<dyn MissionStore>,
    planner: Arc<dyn Planner>,
    knowledge: Arc<dyn KnowledgeStore>,
    validator: Arc<dyn ValidationRunner>,
    vcs: Arc<dyn VersionControl>,
    workers: Arc<WorkerRegistry>,
    scheduler: WaveScheduler,
    parser: PlanParser,
    plan_validator: PlanValidator,
}

struct PhaseOutput {
    outcome: MissionOutcome,
    results: Vec<CompletedTask>,
    validation: ValidationReport,
    integration: Option<IntegrationSummary>,
    knowledge_item_id: Option<u64>,
}

impl MissionExecutor {
    pub fn new(config: EngineConfig, collaborators: Collaborators) -> Result<Self> {
        if collaborators.workers.kinds().is_empty() {
            return Err(MissionError::Configuration(
                "at least one worker must be registered".to_string(),
            ));
        }

        let workers = Arc::new(collaborators.workers);
        let scheduler = WaveScheduler::new(
            config.max_concurrent_tasks,
            Arc::clone(&collaborators.store),
            Arc::clone(&workers),
        );

        Ok(Self {
            config,
            store: collaborators.store,
            planner: collaborators.planner,
            knowledge: collaborators.knowledge,
            validator: collaborators.validator,
            vcs: collaborators.vcs,
            workers,
            scheduler,
            parser: PlanParser::new()?,
            plan_validator: PlanValidator::new(),
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Run one mission to a terminal state.
    ///
    /// Failed validation is an ordinary outcome and returns `Ok`. Any other
    /// failure is recorded on the mission before being returned; cancellation
    /// marks the mission cancelled and returns [`MissionError::Cancelled`].
    #[instrument(skip(self, ctx), fields(mission_id = ctx.mission_id, run_id = %ctx.run_id))]
    pub async fn execute_mission(&self, ctx: &MissionContext) -> Result<MissionReport> {
        let started = Instant::now();
        let mut mission = self.store.load_mission(ctx.mission_id).await?;
        info!("Starting mission {}: {}", mission.id, mission.title);

        match self.run_phases(&mut mission, ctx).await {
            Ok(output) => {
                let tasks = self.store.load_tasks(mission.id).await?;
                info!(
                    "Mission {} finished with status {} in {:?}",
                    mission.id,
                    mission.status,
                    started.elapsed()
                );
                Ok(MissionReport {
                    mission_id: mission.id,
                    run_id: ctx.run_id.clone(),
                    title: mission.title.clone(),
                    status: mission.status,
                    outcome: output.outcome,
                    results: output.results,
                    validation: output.validation,
                    integration: output.integration,
                    knowledge_item_id: output.knowledge_item_id,
                    tasks: TaskSummary::from_records(&tasks),
                    started_at: ctx.started_at,
                    finished_at: Utc::now(),
                    duration: started.elapsed(),
                })
            }
            Err(e) if e.is_cancelled() => {
                warn!("Mission {} cancelled", mission.id);
                self.finish_cancelled(&mut mission).await;
                Err(e)
            }
            Err(e) => {
                error!("Mission {} failed: {}", mission.id, e);
                self.finish_failed(&mut mission, &e).await;
                Err(e)
            }
        }
    }

    async fn run_phases(&self, mission: &mut Mission, ctx: &MissionContext) -> Result<PhaseOutput> {
        ctx.checkpoint()?;
        let plan = self.plan(mission).await?;

        ctx.checkpoint()?;
        let results = self.execute(mission, &plan, ctx).await?;

        ctx.checkpoint()?;
        let validation = self.validate(mission).await?;
        if !validation.passed() {
            let failed: Vec<&str> = validation
                .failed_checks()
                .iter()
                .map(|check| check.kind.as_str())
                .collect();
            error!("Validation failed ({}), rejecting mission", failed.join(", "));
            mission.transition_to(MissionStatus::Failed)?;
            self.persist(mission).await?;
            return Ok(PhaseOutput {
                outcome: MissionOutcome::ValidationFailed,
                results,
                validation,
                integration: None,
                knowledge_item_id: None,
            });
        }

        ctx.checkpoint()?;
        let integration = self.integrate(mission).await?;

        ctx.checkpoint()?;
        let knowledge_item_id = self.remember(mission, results.len()).await?;

        mission.complete()?;
        self.persist(mission).await?;

        Ok(PhaseOutput {
            outcome: MissionOutcome::Completed,
            results,
            validation,
            integration: Some(integration),
            knowledge_item_id: Some(knowledge_item_id),
        })
    }

    async fn plan(&self, mission: &mut Mission) -> Result<Plan> {
        info!("Phase PLAN");

        let query = format!("{} {}", mission.title, mission.description);
        let context = match self
            .knowledge
            .search(&query, self.config.knowledge_search_limit)
            .await
        {
            Ok(snippets) => snippets,
            Err(e) => {
                warn!("Knowledge search failed, planning without context: {}", e);
                Vec::new()
            }
        };
        debug!("Retrieved {} knowledge snippets", context.len());

        let request = PlanningRequest::new(mission, context);
        let raw = self
            .planner
            .plan(&request)
            .await
            .map_err(|e| MissionError::Planner {
                message: e.to_string(),
            })?;

        let mut plan = self.parser.parse(&raw);
        if plan.fallback {
            self.route_fallback(&mut plan)?;
        }
        for warning in self.plan_validator.validate(&plan).warnings {
            warn!("Plan warning: {}", warning);
        }

        let mut new_tasks = Vec::with_capacity(plan.len());
        for descriptor in &plan.tasks {
            new_tasks.push(NewTask {
                worker_kind: self.workers.resolve(&descriptor.worker_kind)?,
                title: descriptor.title.clone(),
                description: descriptor.description.clone(),
                metadata: descriptor.metadata.clone(),
            });
        }

        let records = self.store.insert_tasks(mission.id, new_tasks).await?;
        info!(
            "Created plan with {} task(s){}",
            records.len(),
            if plan.fallback { " (fallback)" } else { "" }
        );

        mission.plan = Some(plan.clone());
        mission.updated_at = Utc::now();
        self.persist(mission).await?;
        Ok(plan)
    }

    /// Point the fallback task at a registered worker. The fallback names
    /// `backend`, which a registry may not carry.
    fn route_fallback(&self, plan: &mut Plan) -> Result<()> {
        for descriptor in &mut plan.tasks {
            if self.workers.resolve(&descriptor.worker_kind).is_ok() {
                continue;
            }
            let kind = self.workers.kinds().first().copied().ok_or_else(|| {
                MissionError::Configuration("no worker registered".to_string())
            })?;
            warn!(
                "No {} worker for the fallback task, routing it to {}",
                descriptor.worker_kind, kind
            );
            descriptor.worker_kind = kind.to_string();
        }
        Ok(())
    }

    async fn execute(
        &self,
        mission: &mut Mission,
        plan: &Plan,
        ctx: &MissionContext,
    ) -> Result<Vec<CompletedTask>> {
        info!("Phase EXECUTE");
        mission.transition_to(MissionStatus::Executing)?;
        self.persist(mission).await?;

        let tasks: Vec<TaskRecord> = self.store.load_tasks(mission.id).await?;
        let graph = DependencyGraph::build(&tasks, &plan.tasks);
        if graph.has_cycle() {
            warn!("Task graph contains a dependency cycle; affected tasks will be forced");
        }

        let results = self.scheduler.execute(&graph, tasks, ctx).await?;
        info!("{} task(s) completed", results.len());
        Ok(results)
    }

    async fn validate(&self, mission: &mut Mission) -> Result<ValidationReport> {
        info!("Phase VALIDATE");
        mission.transition_to(MissionStatus::Validating)?;
        self.persist(mission).await?;

        let report = ValidationReport {
            checks: vec![
                self.validator.run_lint().await,
                self.validator.run_test().await,
                self.validator.run_build().await,
            ],
        };

        let recorded = serde_json::to_value(&report.checks).unwrap_or_default();
        mission.set_metadata("validation", recorded);
        self.persist(mission).await?;
        Ok(report)
    }

    async fn integrate(&self, mission: &mut Mission) -> Result<IntegrationSummary> {
        info!("Phase INTEGRATE");
        mission.transition_to(MissionStatus::Integrating)?;
        self.persist(mission).await?;

        let branch = branch_name(mission.id, &mission.title, self.config.branch_slug_length);
        let branch_ready = self
            .vcs
            .create_or_checkout_branch(&branch)
            .await
            .map_err(|e| MissionError::Integration {
                message: e.to_string(),
            })?;
        if !branch_ready {
            warn!("Could not prepare branch {}", branch);
        }

        let message = format!("{}\n\n{}", mission.title, mission.description);
        let committed = self
            .vcs
            .commit_all(&message)
            .await
            .map_err(|e| MissionError::Integration {
                message: e.to_string(),
            })?;
        if !committed {
            warn!("Nothing was committed on branch {}", branch);
        }

        let summary = IntegrationSummary {
            branch,
            branch_ready,
            committed,
        };
        mission.set_metadata(
            "integration",
            json!({
                "branch": summary.branch,
                "branch_ready": summary.branch_ready,
                "committed": summary.committed,
            }),
        );
        self.persist(mission).await?;
        Ok(summary)
    }

    async fn remember(&self, mission: &Mission, completed_tasks: usize) -> Result<u64> {
        info!("Phase MEMORY");
        let summary = mission_summary(mission, completed_tasks);
        let id = self
            .knowledge
            .index_unapproved(KnowledgeItem::mission_summary(mission, summary))
            .await
            .map_err(|e| MissionError::Knowledge {
                message: e.to_string(),
            })?;
        info!("Mission summary stored as knowledge item {} pending approval", id);
        Ok(id)
    }

    async fn persist(&self, mission: &Mission) -> Result<()> {
        self.store.update_mission(mission).await?;
        self.store.commit().await?;
        Ok(())
    }

    async fn finish_cancelled(&self, mission: &mut Mission) {
        if mission.is_terminal() {
            return;
        }
        if let Err(e) = mission.transition_to(MissionStatus::Cancelled) {
            error!("Could not mark mission {} cancelled: {}", mission.id, e);
            return;
        }
        if let Err(e) = self.persist(mission).await {
            error!("Could not persist cancellation of mission {}: {}", mission.id, e);
        }
    }

    async fn finish_failed(&self, mission: &mut Mission, err: &MissionError) {
        if mission.is_terminal() {
            return;
        }
        mission.record_failure(&FailureDetails {
            message: err.to_string(),
            kind: err.kind().to_string(),
            trace: error_trace(err, self.config.trace_depth),
            at: Utc::now(),
        });
        if let Err(e) = mission.transition_to(MissionStatus::Failed) {
            error!("Could not mark mission {} failed: {}", mission.id, e);
        }
        if let Err(e) = self.persist(mission).await {
            error!("Could not persist failure of mission {}: {}", mission.id, e);
        }
    }
}

/// `mission-<id>-<slug>` with the slug lowercased, dash separated and
/// truncated to `max_slug_len` characters.
pub fn branch_name(id: MissionId, title: &str, max_slug_len: usize) -> String {
    let mut slug = String::with_capacity(title.len());
    for c in title.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }

    let truncated: String = slug.chars().take(max_slug_len).collect();
    let slug = truncated.trim_matches('-');
    if slug.is_empty() {
        format!("mission-{}", id)
    } else {
        format!("mission-{}-{}", id, slug)
    }
}

fn mission_summary(mission: &Mission, completed_tasks: usize) -> String {
    let completed_at = mission
        .completed_at
        .map(|at| at.to_rfc3339())
        .unwrap_or_else(|| "in progress".to_string());

    format!(
        "# Mission: {title}\n\n\
         ## Description\n{description}\n\n\
         ## Execution Summary\n\
         - Status: {status}\n\
         - Started: {started}\n\
         - Completed: {completed_at}\n\n\
         ## Tasks Completed\n\
         {completed_tasks} tasks were executed successfully.\n",
        title = mission.title,
        description = mission.description,
        status = mission.status,
        started = mission.created_at.to_rfc3339(),
    )
}

/// Source chain of `err`, one line per cause. A source whose message the
/// previous line already ends with adds nothing and is skipped.
fn error_trace(err: &(dyn std::error::Error + 'static), depth: usize) -> String {
    let mut lines: Vec<String> = Vec::new();
    let mut current = Some(err);
    while let Some(e) = current {
        if lines.len() == depth {
            break;
        }
        let message = e.to_string();
        let repeated = lines.last().is_some_and(|last| last.ends_with(&message));
        if !repeated {
            lines.push(message);
        }
        current = e.source();
    }
    lines.join("\ncaused by: ")
}

/// Entry point for callers: runs missions, routes cancellation requests and
/// keeps the registry free of stale entries.
#[derive(Clone)]
pub struct MissionEngine {
    executor: Arc<MissionExecutor>,
    registry: CancellationRegistry,
}

impl std::fmt::Debug for MissionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MissionEngine")
            .field("config", &self.executor.config)
            .finish()
    }
}

impl MissionEngine {
    pub fn new(executor: MissionExecutor) -> Self {
        Self::with_registry(executor, CancellationRegistry::new())
    }

    pub fn with_registry(executor: MissionExecutor, registry: CancellationRegistry) -> Self {
        Self {
            executor: Arc::new(executor),
            registry,
        }
    }

    pub fn registry(&self) -> &CancellationRegistry {
        &self.registry
    }

    /// Run a mission to a terminal state. Missions that already reached one
    /// are rejected without touching their records.
    pub async fn execute_mission(&self, mission_id: MissionId) -> Result<MissionReport> {
        let mission = self.executor.store.load_mission(mission_id).await?;
        if mission.is_terminal() {
            return Err(MissionError::AlreadyFinished {
                mission_id,
                status: mission.status,
            });
        }

        let _entry = RegistryEntry {
            registry: &self.registry,
            mission_id,
        };
        let ctx = MissionContext::new(mission_id, self.registry.acquire(mission_id));
        self.executor.execute_mission(&ctx).await
    }

    pub fn request_cancellation(&self, mission_id: MissionId) {
        info!("Cancellation requested for mission {}", mission_id);
        self.registry.request(mission_id);
    }

    /// Run a mission on its own tokio task.
    pub fn spawn_mission(&self, mission_id: MissionId) -> MissionHandle {
        let engine = self.clone();
        let handle = tokio::spawn(async move { engine.execute_mission(mission_id).await });
        MissionHandle {
            mission_id,
            registry: self.registry.clone(),
            handle,
        }
    }
}

/// Removes a run's registry entry when the run ends, including when its
/// future is dropped mid-flight or unwinds.
struct RegistryEntry<'a> {
    registry: &'a CancellationRegistry,
    mission_id: MissionId,
}

impl Drop for RegistryEntry<'_> {
    fn drop(&mut self) {
        self.registry.clear(self.mission_id);
    }
}

pub struct MissionHandle {
    mission_id: MissionId,
    registry: CancellationRegistry,
    handle: JoinHandle<Result<MissionReport>>,
}

impl MissionHandle {
    pub fn mission_id(&self) -> MissionId {
        self.mission_id
    }

    /// No effect once the run has finished.
    pub fn cancel(&self) {
        if !self.handle.is_finished() {
            self.registry.request(self.mission_id);
        }
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    pub async fn join(self) -> Result<MissionReport> {
        self.handle.await?
    }
}
