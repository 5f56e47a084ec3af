// ABOUTME: Command implementations for the missionforge CLI
// ABOUTME: Wires local collaborators into the engine for run and previews plans for plan

use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

use super::config::Config;
use super::manifest::MissionManifest;
use crate::engine::{
    Collaborators, DependencyGraph, MissionEngine, MissionExecutor, MissionReport,
};
use crate::plan::{PlanParser, PlanValidator};
use crate::services::{
    CommandValidationRunner, GitIntegrator, InMemoryKnowledgeStore, StaticPlanner,
};
use crate::store::{InMemoryStore, MissionStore};
use crate::workers::{CommandWorker, WorkerRegistry};

/// Run the mission described by a manifest to a terminal state
pub async fn run_mission(
    manifest_path: PathBuf,
    output: Option<PathBuf>,
    config: &Config,
) -> Result<()> {
    info!("Starting mission from manifest: {}", manifest_path.display());
    let manifest = MissionManifest::load(&manifest_path).await?;

    let mut store = InMemoryStore::new();
    if let Some(state_file) = &config.state_file {
        store = store.with_snapshot_path(state_file);
    }
    let store = Arc::new(store);

    let knowledge = Arc::new(InMemoryKnowledgeStore::new());
    for seed in manifest.knowledge.iter().cloned() {
        knowledge.insert(seed.into_item()).await;
    }
    info!("Seeded {} knowledge items", manifest.knowledge.len());

    let repo_path = config.repo_path();
    let mut vcs = GitIntegrator::new(&repo_path);
    if let (Some(name), Some(email)) = (&config.git.author_name, &config.git.author_email) {
        vcs = vcs.with_identity(name, email);
    }

    let collaborators = Collaborators {
        store: store.clone(),
        planner: Arc::new(StaticPlanner::new(manifest.planner_response())),
        knowledge,
        validator: Arc::new(CommandValidationRunner::new(
            &repo_path,
            config.validation.clone(),
        )),
        vcs: Arc::new(vcs),
        workers: build_registry(config)?,
    };

    let executor = MissionExecutor::new(config.engine_config(), collaborators)
        .context("Failed to create mission executor")?;
    let engine = MissionEngine::new(executor);

    let mission = store
        .create_mission(&manifest.title, &manifest.description, manifest.metadata.clone())
        .await?;
    info!("Created mission {}: {}", mission.id, mission.title);

    let handle = engine.spawn_mission(mission.id);

    let interrupt = {
        let engine = engine.clone();
        let mission_id = mission.id;
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupt received, cancelling mission {}", mission_id);
                engine.request_cancellation(mission_id);
            }
        })
    };

    let result = handle.join().await;
    interrupt.abort();

    let report = result.with_context(|| format!("Mission {} did not complete", mission.id))?;
    emit_report(&report, output.as_deref())?;

    if !report.is_success() {
        bail!(
            "Mission {} finished with status {}",
            report.mission_id,
            report.status
        );
    }

    info!("Mission {} completed", report.mission_id);
    Ok(())
}

/// Parse the manifest's planner response and print the waves it would run in
pub async fn plan_mission(manifest_path: PathBuf, config: &Config) -> Result<()> {
    info!("Previewing plan for manifest: {}", manifest_path.display());
    let manifest = MissionManifest::load(&manifest_path).await?;

    let parser = PlanParser::new()?;
    let plan = parser.parse(manifest.planner_response());
    let report = PlanValidator::new().validate(&plan);
    let registry = build_registry(config)?;

    println!("Mission '{}'", manifest.title);
    if plan.fallback {
        println!("  Planner response unusable, using the fallback task");
    }
    println!("  Tasks: {}", plan.len());
    for (position, task) in plan.tasks.iter().enumerate() {
        let routed = match registry.resolve(&task.worker_kind) {
            Ok(_) => "",
            Err(_) => " (no worker)",
        };
        println!(
            "    {}. {} [{}]{}",
            position + 1,
            task.title,
            task.worker_kind,
            routed
        );
    }

    for warning in &report.warnings {
        println!("  ! {}", warning);
    }

    let graph = DependencyGraph::from_plan(&plan.tasks);
    for (number, wave) in graph.preview_waves().iter().enumerate() {
        let titles: Vec<&str> = wave
            .positions
            .iter()
            .map(|&position| plan.tasks[position].title.as_str())
            .collect();
        let forced = if wave.forced { " (forced)" } else { "" };
        println!("  Wave {}{}: {}", number + 1, forced, titles.join(", "));
    }

    Ok(())
}

fn build_registry(config: &Config) -> Result<WorkerRegistry> {
    let mut registry = WorkerRegistry::new();
    for (kind, worker) in &config.workers {
        let worker = CommandWorker::new(worker.clone())
            .with_context(|| format!("Invalid worker configuration for '{}'", kind))?;
        registry.register(*kind, Arc::new(worker));
    }

    if let Some(default) = &config.default_worker {
        let worker = CommandWorker::new(default.clone())
            .context("Invalid default worker configuration")?;
        registry = registry.with_default(Arc::new(worker));
    }

    if registry.kinds().is_empty() {
        bail!("No workers configured; set `workers` or `default_worker`");
    }
    Ok(registry)
}

fn emit_report(report: &MissionReport, output: Option<&Path>) -> Result<()> {
    if let Some(path) = output {
        let json = serde_json::to_string_pretty(report)
            .context("Failed to serialize mission report")?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write report to {}", path.display()))?;
        info!("Report written to: {}", path.display());
        return Ok(());
    }

    println!(
        "Mission {} '{}' finished with status: {}",
        report.mission_id, report.title, report.status
    );
    for result in &report.results {
        println!("  Task '{}': {}", result.title, result.output.status);
    }
    for check in report.validation.failed_checks() {
        println!("  Check {} failed: {}", check.kind, check.output.trim());
    }
    if let Some(integration) = &report.integration {
        println!(
            "  Branch {} (committed: {})",
            integration.branch, integration.committed
        );
    }
    Ok(())
}
