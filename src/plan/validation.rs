// ABOUTME: Advisory checks on a parsed plan before its tasks are persisted
// ABOUTME: Reports duplicate titles, unresolved or self dependencies and cycles as warnings

use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::{HashMap, HashSet};
use std::fmt;

use super::descriptor::Plan;
use crate::workers::WorkerKind;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanWarning {
    EmptyPlan,
    DuplicateTitle { title: String, occurrences: usize },
    UnresolvedDependency { task: String, dependency: String },
    SelfDependency { task: String },
    UnknownWorkerKind { task: String, kind: String },
    DependencyCycle { tasks: Vec<String> },
}

impl fmt::Display for PlanWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlanWarning::EmptyPlan => write!(f, "plan contains no tasks"),
            PlanWarning::DuplicateTitle { title, occurrences } => write!(
                f,
                "title '{}' appears {} times; dependencies resolve to the first",
                title, occurrences
            ),
            PlanWarning::UnresolvedDependency { task, dependency } => write!(
                f,
                "task '{}' depends on unknown task '{}'; the dependency is ignored",
                task, dependency
            ),
            PlanWarning::SelfDependency { task } => {
                write!(f, "task '{}' depends on itself", task)
            }
            PlanWarning::UnknownWorkerKind { task, kind } => {
                write!(f, "task '{}' names unknown worker kind '{}'", task, kind)
            }
            PlanWarning::DependencyCycle { tasks } => write!(
                f,
                "dependency cycle through {}; those tasks will be forced to run",
                tasks.join(" -> ")
            ),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PlanReport {
    pub warnings: Vec<PlanWarning>,
}

impl PlanReport {
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }

    pub fn has_cycle(&self) -> bool {
        self.warnings
            .iter()
            .any(|w| matches!(w, PlanWarning::DependencyCycle { .. }))
    }
}

#[derive(Debug, Clone, Default)]
pub struct PlanValidator;

impl PlanValidator {
    pub fn new() -> Self {
        Self
    }

    pub fn validate(&self, plan: &Plan) -> PlanReport {
        let mut report = PlanReport::default();

        if plan.is_empty() {
            report.warnings.push(PlanWarning::EmptyPlan);
            return report;
        }

        self.check_titles(plan, &mut report);
        self.check_worker_kinds(plan, &mut report);
        self.check_dependencies(plan, &mut report);
        self.check_cycles(plan, &mut report);

        report
    }

    fn check_titles(&self, plan: &Plan, report: &mut PlanReport) {
        let mut counts: HashMap<&str, usize> = HashMap::new();
        let mut order = Vec::new();
        for task in &plan.tasks {
            let count = counts.entry(task.title.as_str()).or_insert(0);
            if *count == 0 {
                order.push(task.title.as_str());
            }
            *count += 1;
        }

        for title in order {
            let occurrences = counts[title];
            if occurrences > 1 {
                report.warnings.push(PlanWarning::DuplicateTitle {
                    title: title.to_string(),
                    occurrences,
                });
            }
        }
    }

    fn check_worker_kinds(&self, plan: &Plan, report: &mut PlanReport) {
        for task in &plan.tasks {
            if task.worker_kind.parse::<WorkerKind>().is_err() {
                report.warnings.push(PlanWarning::UnknownWorkerKind {
                    task: task.title.clone(),
                    kind: task.worker_kind.clone(),
                });
            }
        }
    }

    fn check_dependencies(&self, plan: &Plan, report: &mut PlanReport) {
        let titles: HashSet<&str> = plan.tasks.iter().map(|t| t.title.as_str()).collect();

        for task in &plan.tasks {
            for dependency in &task.dependencies {
                if dependency == &task.title {
                    report.warnings.push(PlanWarning::SelfDependency {
                        task: task.title.clone(),
                    });
                } else if !titles.contains(dependency.as_str()) {
                    report.warnings.push(PlanWarning::UnresolvedDependency {
                        task: task.title.clone(),
                        dependency: dependency.clone(),
                    });
                }
            }
        }
    }

    /// Cycles between distinct tasks; self loops are already reported.
    fn check_cycles(&self, plan: &Plan, report: &mut PlanReport) {
        let mut graph: DiGraph<&str, ()> = DiGraph::new();
        let mut nodes: HashMap<&str, NodeIndex> = HashMap::new();

        for task in &plan.tasks {
            nodes
                .entry(task.title.as_str())
                .or_insert_with(|| graph.add_node(task.title.as_str()));
        }

        for task in &plan.tasks {
            let to = nodes[task.title.as_str()];
            for dependency in &task.dependencies {
                if dependency == &task.title {
                    continue;
                }
                if let Some(&from) = nodes.get(dependency.as_str()) {
                    graph.update_edge(from, to, ());
                }
            }
        }

        for component in petgraph::algo::tarjan_scc(&graph) {
            if component.len() > 1 {
                let mut tasks: Vec<String> =
                    component.iter().map(|&n| graph[n].to_string()).collect();
                tasks.sort();
                report.warnings.push(PlanWarning::DependencyCycle { tasks });
            }
        }
    }
}
