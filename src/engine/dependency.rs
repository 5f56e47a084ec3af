// ABOUTME: Task dependency graph keyed by position in mission order
// ABOUTME: Resolves planner dependency titles to positions and lays out execution waves

use petgraph::algo::is_cyclic_directed;
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::{BTreeSet, HashMap};
use tracing::warn;

use crate::model::TaskRecord;
use crate::plan::TaskDescriptor;

#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    dependencies: Vec<Vec<usize>>,
}

/// One batch of positions dispatched together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Wave {
    pub positions: Vec<usize>,
    /// Set when no pending task was ready and the remainder was forced.
    pub forced: bool,
}

impl DependencyGraph {
    /// Build the graph for `tasks` from the plan entries that produced them.
    ///
    /// Titles are indexed over the task records; the first record wins when
    /// titles repeat. Plan entries beyond the record count are ignored and
    /// dependency titles that match no record are dropped.
    pub fn build(tasks: &[TaskRecord], plan: &[TaskDescriptor]) -> Self {
        let titles: Vec<&str> = tasks.iter().map(|task| task.title.as_str()).collect();
        Self::resolve(&titles, plan)
    }

    /// Graph of a plan that has not been persisted yet.
    pub fn from_plan(plan: &[TaskDescriptor]) -> Self {
        let titles: Vec<&str> = plan.iter().map(|entry| entry.title.as_str()).collect();
        Self::resolve(&titles, plan)
    }

    fn resolve(titles: &[&str], plan: &[TaskDescriptor]) -> Self {
        let mut index: HashMap<&str, usize> = HashMap::new();
        for (position, title) in titles.iter().enumerate() {
            if index.contains_key(title) {
                warn!(
                    "Duplicate task title '{}' at position {}; dependencies resolve to the first",
                    title, position
                );
                continue;
            }
            index.insert(*title, position);
        }

        let mut dependencies = vec![Vec::new(); titles.len()];
        for (position, entry) in plan.iter().enumerate().take(titles.len()) {
            for title in &entry.dependencies {
                match index.get(title.as_str()) {
                    Some(&dependency) => {
                        if !dependencies[position].contains(&dependency) {
                            dependencies[position].push(dependency);
                        }
                    }
                    None => warn!(
                        "Task '{}' depends on unknown task '{}', ignoring",
                        entry.title, title
                    ),
                }
            }
        }

        Self { dependencies }
    }

    /// Graph from explicit dependency positions. Positions beyond the task
    /// count are dropped with a warning, as are repeats.
    pub fn from_positions(dependencies: Vec<Vec<usize>>) -> Self {
        let len = dependencies.len();
        let dependencies = dependencies
            .into_iter()
            .enumerate()
            .map(|(position, deps)| {
                let mut kept: Vec<usize> = Vec::with_capacity(deps.len());
                for dependency in deps {
                    if dependency >= len {
                        warn!(
                            "Task at position {} depends on position {} beyond {} tasks; ignoring it",
                            position, dependency, len
                        );
                    } else if !kept.contains(&dependency) {
                        kept.push(dependency);
                    }
                }
                kept
            })
            .collect();
        Self { dependencies }
    }

    pub fn len(&self) -> usize {
        self.dependencies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dependencies.is_empty()
    }

    pub fn dependencies_of(&self, position: usize) -> &[usize] {
        self.dependencies
            .get(position)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn dependents_of(&self, position: usize) -> Vec<usize> {
        self.dependencies
            .iter()
            .enumerate()
            .filter(|(_, deps)| deps.contains(&position))
            .map(|(dependent, _)| dependent)
            .collect()
    }

    pub fn roots(&self) -> Vec<usize> {
        self.dependencies
            .iter()
            .enumerate()
            .filter(|(_, deps)| deps.is_empty())
            .map(|(position, _)| position)
            .collect()
    }

    /// Positions in `pending` whose dependencies are all in `completed`.
    pub fn ready(&self, pending: &BTreeSet<usize>, completed: &BTreeSet<usize>) -> Vec<usize> {
        pending
            .iter()
            .copied()
            .filter(|&position| {
                self.dependencies_of(position)
                    .iter()
                    .all(|dependency| completed.contains(dependency))
            })
            .collect()
    }

    /// True when the resolved dependencies contain a cycle, self loops included.
    pub fn has_cycle(&self) -> bool {
        let mut graph: DiGraph<usize, ()> = DiGraph::new();
        let nodes: Vec<NodeIndex> = (0..self.len()).map(|p| graph.add_node(p)).collect();
        for (position, deps) in self.dependencies.iter().enumerate() {
            for &dependency in deps {
                graph.add_edge(nodes[dependency], nodes[position], ());
            }
        }
        is_cyclic_directed(&graph)
    }

    /// Waves the scheduler would dispatch if every task succeeded.
    pub fn preview_waves(&self) -> Vec<Wave> {
        let mut pending: BTreeSet<usize> = (0..self.len()).collect();
        let mut completed = BTreeSet::new();
        let mut waves = Vec::new();

        while !pending.is_empty() {
            let ready = self.ready(&pending, &completed);
            let wave = if ready.is_empty() {
                Wave {
                    positions: pending.iter().copied().collect(),
                    forced: true,
                }
            } else {
                Wave {
                    positions: ready,
                    forced: false,
                }
            };

            for position in &wave.positions {
                pending.remove(position);
                completed.insert(*position);
            }
            waves.push(wave);
        }

        waves
    }
}
