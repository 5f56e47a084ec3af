// ABOUTME: Integration tests for wave scheduling through the mission engine
// ABOUTME: Tests concurrency bounds, cycle handling, fail-fast waves and dependency resolution

use std::collections::HashSet;
use std::time::Duration;

use missionforge::model::{MissionStatus, TaskStatus};
use missionforge::store::MissionStore;

mod common;
use common::{plan_json, HarnessBuilder};

#[tokio::test]
async fn test_concurrency_never_exceeds_limit() {
    let response = plan_json(&[
        ("T1", "backend", ""),
        ("T2", "backend", ""),
        ("T3", "frontend", ""),
        ("T4", "frontend", ""),
        ("T5", "qa", ""),
        ("T6", "qa", ""),
    ]);
    let harness = HarnessBuilder::new(&response)
        .max_concurrent(2)
        .task_delay(Duration::from_millis(50))
        .build();
    let id = harness.create_mission("Parallel work", "Six independent tasks").await;

    let report = harness.engine.execute_mission(id).await.unwrap();

    assert!(report.is_success());
    assert_eq!(report.results.len(), 6);
    assert_eq!(harness.worker.peak(), 2);
}

#[tokio::test]
async fn test_default_limit_is_three() {
    let response = plan_json(&[
        ("T1", "backend", ""),
        ("T2", "backend", ""),
        ("T3", "backend", ""),
        ("T4", "backend", ""),
        ("T5", "backend", ""),
    ]);
    let harness = HarnessBuilder::new(&response)
        .task_delay(Duration::from_millis(50))
        .build();
    let id = harness.create_mission("Parallel work", "Five independent tasks").await;

    harness.engine.execute_mission(id).await.unwrap();
    assert_eq!(harness.worker.peak(), 3);
}

#[tokio::test]
async fn test_cycle_is_forced_and_each_task_runs_once() {
    let response = plan_json(&[
        ("Root", "devops", ""),
        ("Left", "backend", "Right"),
        ("Right", "backend", "Left"),
    ]);
    let harness = HarnessBuilder::new(&response).build();
    let id = harness.create_mission("Tangled", "Mutually dependent tasks").await;

    let report = harness.engine.execute_mission(id).await.unwrap();
    assert!(report.is_success());

    let started = harness.worker.started();
    assert_eq!(started.len(), 3);
    let unique: HashSet<&String> = started.iter().collect();
    assert_eq!(unique.len(), 3);
    assert_eq!(started[0], "Root");

    let tasks = harness.store.load_tasks(id).await.unwrap();
    assert!(tasks.iter().all(|t| t.status == TaskStatus::Completed));
}

#[tokio::test]
async fn test_failed_task_lets_wave_siblings_finish() {
    let response = plan_json(&[
        ("First", "backend", ""),
        ("Second", "backend", ""),
        ("Third", "backend", ""),
        ("Later", "backend", "First"),
    ]);
    let harness = HarnessBuilder::new(&response)
        .fail_task("Second")
        .task_delay(Duration::from_millis(30))
        .build();
    let id = harness.create_mission("Fail fast", "One task in the wave fails").await;

    let err = harness.engine.execute_mission(id).await.unwrap_err();
    assert_eq!(err.kind(), "task_failed");

    let statuses: Vec<TaskStatus> = harness
        .store
        .load_tasks(id)
        .await
        .unwrap()
        .iter()
        .map(|t| t.status)
        .collect();
    assert_eq!(
        statuses,
        vec![
            TaskStatus::Completed,
            TaskStatus::Failed,
            TaskStatus::Completed,
            TaskStatus::Pending,
        ]
    );
    assert_eq!(
        harness.store.load_mission(id).await.unwrap().status,
        MissionStatus::Failed
    );
}

#[tokio::test]
async fn test_unresolved_dependency_is_ignored() {
    let response = plan_json(&[("API", "backend", "Ghost"), ("Docs", "documentation", "API")]);
    let harness = HarnessBuilder::new(&response).build();
    let id = harness.create_mission("Docs", "Document the API").await;

    let report = harness.engine.execute_mission(id).await.unwrap();

    assert!(report.is_success());
    let worker = &harness.worker;
    assert!(worker.index_of("finish:API") < worker.index_of("start:Docs"));
}

#[tokio::test]
async fn test_duplicate_titles_resolve_to_first() {
    let response = plan_json(&[
        ("Setup", "devops", ""),
        ("Build", "backend", "Setup"),
        ("Setup", "qa", "Build"),
    ]);
    let harness = HarnessBuilder::new(&response).build();
    let id = harness.create_mission("Dupes", "Repeated titles").await;

    let report = harness.engine.execute_mission(id).await.unwrap();

    assert!(report.is_success());
    assert_eq!(harness.worker.started(), vec!["Setup", "Build", "Setup"]);
}

#[tokio::test]
async fn test_task_records_carry_results() {
    let response = plan_json(&[("API", "backend", "")]);
    let harness = HarnessBuilder::new(&response).build();
    let id = harness.create_mission("Results", "Stored output").await;

    harness.engine.execute_mission(id).await.unwrap();

    let task = &harness.store.load_tasks(id).await.unwrap()[0];
    assert_eq!(task.status, TaskStatus::Completed);
    assert!(task.started_at.is_some());
    assert!(task.completed_at.is_some());
    assert_eq!(task.result.as_ref().unwrap()["payload"]["title"], "API");
    assert!(harness.store.commit_count().await >= 2);
}

#[tokio::test]
async fn test_concurrent_missions_have_separate_limits() {
    let response = plan_json(&[
        ("T1", "backend", ""),
        ("T2", "backend", ""),
        ("T3", "backend", ""),
    ]);
    let harness = HarnessBuilder::new(&response)
        .task_delay(Duration::from_millis(200))
        .build();
    let first = harness.create_mission("First", "Three independent tasks").await;
    let second = harness.create_mission("Second", "Three more").await;

    let first = harness.engine.spawn_mission(first);
    let second = harness.engine.spawn_mission(second);

    assert!(first.join().await.unwrap().is_success());
    assert!(second.join().await.unwrap().is_success());
    assert!(harness.worker.peak() > 3);
}

#[tokio::test]
async fn test_cancel_while_sibling_fails_reports_cancellation() {
    let response = plan_json(&[
        ("T1", "backend", ""),
        ("T2", "backend", ""),
        ("T3", "backend", ""),
    ]);
    let harness = HarnessBuilder::new(&response)
        .max_concurrent(1)
        .fail_task("T1")
        .fail_task("T2")
        .fail_task("T3")
        .task_delay(Duration::from_millis(200))
        .build();
    let id = harness.create_mission("Doomed", "Fails and is cancelled").await;

    let handle = harness.engine.spawn_mission(id);
    tokio::time::sleep(Duration::from_millis(80)).await;
    handle.cancel();

    let err = handle.join().await.unwrap_err();
    assert!(err.is_cancelled());
    assert_eq!(
        harness.store.load_mission(id).await.unwrap().status,
        MissionStatus::Cancelled
    );

    let tasks = harness.store.load_tasks(id).await.unwrap();
    assert_eq!(tasks.iter().filter(|t| t.status == TaskStatus::Failed).count(), 1);
    assert_eq!(tasks.iter().filter(|t| t.status == TaskStatus::Pending).count(), 2);
    assert_eq!(harness.worker.started().len(), 1);
}
