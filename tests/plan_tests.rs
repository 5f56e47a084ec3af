// ABOUTME: Integration tests for plan parsing, validation and wave layout
// ABOUTME: Feeds realistic planner output through the parser, validator and dependency graph

use missionforge::engine::{DependencyGraph, Wave};
use missionforge::model::{KnowledgeItem, KnowledgeKind, Mission};
use missionforge::plan::{
    PlanParser, PlanValidator, PlanWarning, PlanningRequest, FALLBACK_TASK_TITLE,
};

const PLANNER_OUTPUT: &str = r#"Sure! Based on the mission, here is a plan.

```json
[
  {"title": "Design schema", "description": "Tables for notes", "worker_kind": "database", "dependencies": []},
  {"title": "Search API", "description": "Query endpoint", "agent": "backend", "dependencies": ["Design schema"]},
  {"title": "Search box", "description": "UI", "worker_kind": "frontend", "dependencies": ["Search API"]},
  {"title": "Write docs", "description": "Usage guide", "worker_kind": "documentation", "dependencies": ["Search API"]},
  {"title": "End to end tests", "worker_kind": "qa", "dependencies": ["Search box", "Write docs"]}
]
```

Let me know if anything should change."#;

fn positions(waves: &[Wave]) -> Vec<Vec<usize>> {
    waves.iter().map(|w| w.positions.clone()).collect()
}

#[test]
fn test_planner_output_to_waves() {
    let plan = PlanParser::new().unwrap().parse(PLANNER_OUTPUT);
    assert!(!plan.fallback);
    assert_eq!(plan.len(), 5);
    assert_eq!(plan.tasks[1].worker_kind, "backend");

    let report = PlanValidator::new().validate(&plan);
    assert!(report.is_clean(), "unexpected warnings: {:?}", report.warnings);

    let waves = DependencyGraph::from_plan(&plan.tasks).preview_waves();
    assert_eq!(
        positions(&waves),
        vec![vec![0], vec![1], vec![2, 3], vec![4]]
    );
    assert!(waves.iter().all(|w| !w.forced));
}

#[test]
fn test_cycle_is_reported_and_forced() {
    let raw = r#"[
        {"title": "A", "worker_kind": "backend", "dependencies": ["C"]},
        {"title": "B", "worker_kind": "backend", "dependencies": ["A"]},
        {"title": "C", "worker_kind": "backend", "dependencies": ["B"]},
        {"title": "D", "worker_kind": "qa", "dependencies": []}
    ]"#;
    let plan = PlanParser::new().unwrap().parse(raw);

    let report = PlanValidator::new().validate(&plan);
    assert!(report.has_cycle());

    let graph = DependencyGraph::from_plan(&plan.tasks);
    assert!(graph.has_cycle());

    let waves = graph.preview_waves();
    assert_eq!(waves.len(), 2);
    assert_eq!(waves[0].positions, vec![3]);
    assert!(waves[1].forced);
    assert_eq!(waves[1].positions, vec![0, 1, 2]);
}

#[test]
fn test_mixed_problems_are_all_reported() {
    let raw = r#"[
        {"title": "Setup", "worker_kind": "devops"},
        {"title": "Setup", "worker_kind": "sorcerer", "dependencies": ["Setup", "Nowhere"]}
    ]"#;
    let plan = PlanParser::new().unwrap().parse(raw);
    let report = PlanValidator::new().validate(&plan);

    assert!(report.warnings.iter().any(|w| matches!(w, PlanWarning::DuplicateTitle { .. })));
    assert!(report.warnings.iter().any(|w| matches!(w, PlanWarning::SelfDependency { .. })));
    assert!(report
        .warnings
        .iter()
        .any(|w| matches!(w, PlanWarning::UnresolvedDependency { dependency, .. } if dependency == "Nowhere")));
    assert!(report
        .warnings
        .iter()
        .any(|w| matches!(w, PlanWarning::UnknownWorkerKind { kind, .. } if kind == "sorcerer")));
}

#[test]
fn test_truncated_output_falls_back() {
    let raw = r#"[{"title": "Design schema", "worker_kind": "database"}, {"title": "#;
    let plan = PlanParser::new().unwrap().parse(raw);

    assert!(plan.fallback);
    assert_eq!(plan.titles(), vec![FALLBACK_TASK_TITLE]);
    assert_eq!(
        DependencyGraph::from_plan(&plan.tasks).preview_waves(),
        vec![Wave {
            positions: vec![0],
            forced: false
        }]
    );
}

#[test]
fn test_planning_request_carries_context() {
    let mission = Mission::new(9, "Add search", "Full text search for notes");
    let snippet = KnowledgeItem::new(
        KnowledgeKind::Playbook,
        "Indexing playbook",
        "Rebuild indexes nightly",
    )
    .to_snippet(0.8);

    let request = PlanningRequest::new(&mission, vec![snippet]);

    assert_eq!(request.mission_id, 9);
    assert!(request.prompt.contains("Description: Full text search for notes"));
    assert!(request.prompt.contains("- Indexing playbook: Rebuild indexes nightly..."));
    assert!(request.prompt.contains("\"worker_kind\""));
}
