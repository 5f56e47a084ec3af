// ABOUTME: Wave scheduler running a mission's tasks in dependency order
// ABOUTME: Bounds concurrency with a semaphore and propagates the first task failure after the wave settles

use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, info_span, warn, Instrument};

use super::context::MissionContext;
use super::dependency::DependencyGraph;
use super::error::{MissionError, Result};
use super::result::CompletedTask;
use crate::model::TaskRecord;
use crate::store::MissionStore;
use crate::workers::WorkerRegistry;

pub const DEFAULT_MAX_CONCURRENT: usize = 3;

pub struct WaveScheduler {
    max_concurrent: usize,
    store: Arc<dyn MissionStore>,
    workers: Arc<WorkerRegistry>,
}

impl WaveScheduler {
    /// A limit of zero is raised to one so the scheduler can make progress.
    pub fn new(
        max_concurrent: usize,
        store: Arc<dyn MissionStore>,
        workers: Arc<WorkerRegistry>,
    ) -> Self {
        let max_concurrent = max_concurrent.max(1);
        Self {
            max_concurrent,
            store,
            workers,
        }
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    /// Run every task to a terminal state, wave by wave.
    ///
    /// Returns the successful results ordered by position. Failed tasks are
    /// recorded on their records; the first failure observed in a wave is
    /// returned once every task dispatched in that wave has finished, with
    /// cancellation taking precedence over task failures.
    ///
    /// Every call gets its own semaphore, so concurrent missions do not share
    /// slots.
    pub async fn execute(
        &self,
        graph: &DependencyGraph,
        tasks: Vec<TaskRecord>,
        ctx: &MissionContext,
    ) -> Result<Vec<CompletedTask>> {
        let mut pending: BTreeSet<usize> = (0..tasks.len()).collect();
        let mut completed: BTreeSet<usize> = BTreeSet::new();
        let mut results = Vec::with_capacity(tasks.len());
        let semaphore = Arc::new(Semaphore::new(self.max_concurrent));
        let mut wave_number = 0;

        while !pending.is_empty() {
            ctx.checkpoint()?;
            wave_number += 1;

            let mut ready = graph.ready(&pending, &completed);
            if ready.is_empty() {
                warn!(
                    "No task is ready but {} remain pending (dependency cycle or unreachable set); forcing them to run",
                    pending.len()
                );
                ready = pending.iter().copied().collect();
            }

            info!(
                "Dispatching wave {} with {} task(s): {:?}",
                wave_number,
                ready.len(),
                ready
            );

            let mut wave = JoinSet::new();
            for &position in &ready {
                let task = tasks[position].clone();
                let span = info_span!("task", task_id = task.id, position);
                wave.spawn(
                    run_task(
                        position,
                        task,
                        Arc::clone(&semaphore),
                        Arc::clone(&self.store),
                        Arc::clone(&self.workers),
                        ctx.clone(),
                    )
                    .instrument(span),
                );
            }

            let mut first_error: Option<MissionError> = None;
            while let Some(joined) = wave.join_next().await {
                match joined {
                    Ok(Ok(done)) => {
                        completed.insert(done.position);
                        results.push(done);
                    }
                    Ok(Err(e)) => keep_first(&mut first_error, e),
                    Err(join_error) => {
                        error!("Task join error: {}", join_error);
                        keep_first(&mut first_error, join_error.into());
                    }
                }
            }

            for position in &ready {
                pending.remove(position);
            }

            if let Some(e) = first_error {
                error!("Wave {} failed: {}", wave_number, e);
                return Err(e);
            }
            debug!("Wave {} finished", wave_number);
        }

        results.sort_by_key(|done| done.position);
        Ok(results)
    }
}

/// Keep the first error of a wave, unless a later one is a cancellation.
fn keep_first(slot: &mut Option<MissionError>, err: MissionError) {
    let replace = match slot {
        None => true,
        Some(existing) => err.is_cancelled() && !existing.is_cancelled(),
    };
    if replace {
        *slot = Some(err);
    }
}

async fn run_task(
    position: usize,
    mut task: TaskRecord,
    semaphore: Arc<Semaphore>,
    store: Arc<dyn MissionStore>,
    workers: Arc<WorkerRegistry>,
    ctx: MissionContext,
) -> Result<CompletedTask> {
    let _permit = semaphore
        .acquire_owned()
        .await
        .map_err(|e| MissionError::Configuration(format!("scheduler semaphore closed: {}", e)))?;

    ctx.checkpoint()?;

    task.mark_started()?;
    store.update_task(&task).await?;
    store.commit().await?;
    info!("Started task {} ({})", task.id, task.title);

    let outcome = match workers.get(task.worker_kind) {
        Ok(worker) => worker.execute(&task).await.map_err(|e| e.to_string()),
        Err(e) => Err(e.to_string()),
    };

    match outcome {
        Ok(output) => {
            task.mark_completed(output.to_value())?;
            store.update_task(&task).await?;
            store.commit().await?;
            info!("Completed task {} ({})", task.id, task.title);
            Ok(CompletedTask {
                position,
                task_id: task.id,
                title: task.title,
                output,
            })
        }
        Err(message) => {
            error!("Task {} ({}) failed: {}", task.id, task.title, message);
            task.mark_failed(message.clone())?;
            store.update_task(&task).await?;
            store.commit().await?;
            Err(MissionError::TaskFailed {
                title: task.title,
                message,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::WorkerOutput;
    use crate::model::{Metadata, NewTask, TaskStatus};
    use crate::services::ServiceError;
    use crate::store::InMemoryStore;
    use crate::workers::{Worker, WorkerKind};
    use async_trait::async_trait;

    struct Echo;

    #[async_trait]
    impl Worker for Echo {
        async fn execute(
            &self,
            task: &TaskRecord,
        ) -> std::result::Result<WorkerOutput, ServiceError> {
            if task.title.starts_with("fail") {
                return Err(ServiceError::failed("echo", "refused"));
            }
            Ok(WorkerOutput::completed(serde_json::json!(task.title)))
        }
    }

    async fn setup(titles: &[&str]) -> (Arc<InMemoryStore>, Vec<TaskRecord>, WaveScheduler) {
        let store = Arc::new(InMemoryStore::new());
        let mission = store
            .create_mission("m", "", Metadata::new())
            .await
            .unwrap();
        let tasks = store
            .insert_tasks(
                mission.id,
                titles
                    .iter()
                    .map(|t| NewTask {
                        worker_kind: WorkerKind::Backend,
                        title: t.to_string(),
                        description: None,
                        metadata: Metadata::new(),
                    })
                    .collect(),
            )
            .await
            .unwrap();
        let workers = Arc::new(WorkerRegistry::new().with_default(Arc::new(Echo)));
        let scheduler = WaveScheduler::new(2, store.clone(), workers);
        (store, tasks, scheduler)
    }

    #[tokio::test]
    async fn test_results_ordered_by_position() {
        let (store, tasks, scheduler) = setup(&["a", "b", "c"]).await;
        let graph = DependencyGraph::from_positions(vec![vec![2], vec![], vec![1]]);
        let ctx = MissionContext::detached(1);

        let results = scheduler.execute(&graph, tasks, &ctx).await.unwrap();
        let titles: Vec<&str> = results.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, vec!["a", "b", "c"]);

        let records = store.load_tasks(1).await.unwrap();
        assert!(records.iter().all(|t| t.status == TaskStatus::Completed));
        assert!(records.iter().all(|t| t.metadata.contains_key("duration_ms")));
    }

    #[tokio::test]
    async fn test_failure_stops_later_waves() {
        let (store, tasks, scheduler) = setup(&["fail-first", "after"]).await;
        let graph = DependencyGraph::from_positions(vec![vec![], vec![0]]);
        let ctx = MissionContext::detached(1);

        let err = scheduler.execute(&graph, tasks, &ctx).await.unwrap_err();
        assert!(matches!(err, MissionError::TaskFailed { .. }));

        let records = store.load_tasks(1).await.unwrap();
        assert_eq!(records[0].status, TaskStatus::Failed);
        assert_eq!(records[0].error.as_deref(), Some("echo failed: refused"));
        assert_eq!(records[1].status, TaskStatus::Pending);
    }

    #[tokio::test]
    async fn test_cancelled_context_dispatches_nothing() {
        let (store, tasks, scheduler) = setup(&["a"]).await;
        let graph = DependencyGraph::from_positions(vec![vec![]]);
        let ctx = MissionContext::detached(1);
        ctx.token().cancel();

        let err = scheduler.execute(&graph, tasks, &ctx).await.unwrap_err();
        assert!(err.is_cancelled());
        assert_eq!(
            store.load_tasks(1).await.unwrap()[0].status,
            TaskStatus::Pending
        );
    }

    #[test]
    fn test_cancellation_outranks_task_failure() {
        let failed = || MissionError::TaskFailed {
            title: "a".to_string(),
            message: "boom".to_string(),
        };
        let cancelled = || MissionError::Cancelled { mission_id: 1 };

        let mut slot = None;
        keep_first(&mut slot, failed());
        keep_first(&mut slot, cancelled());
        assert!(slot.as_ref().unwrap().is_cancelled());

        let mut slot = None;
        keep_first(&mut slot, cancelled());
        keep_first(&mut slot, failed());
        assert!(slot.unwrap().is_cancelled());

        let mut slot = None;
        keep_first(&mut slot, failed());
        keep_first(
            &mut slot,
            MissionError::TaskFailed {
                title: "b".to_string(),
                message: "later".to_string(),
            },
        );
        assert!(matches!(slot, Some(MissionError::TaskFailed { ref title, .. }) if title == "a"));
    }

    #[test]
    fn test_zero_limit_is_raised() {
        let store: Arc<dyn MissionStore> = Arc::new(InMemoryStore::new());
        let scheduler = WaveScheduler::new(0, store, Arc::new(WorkerRegistry::new()));
        assert_eq!(scheduler.max_concurrent(), 1);
    }
}
