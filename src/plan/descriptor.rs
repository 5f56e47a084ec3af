// ABOUTME: Task descriptors emitted by the planner and the plan persisted on a mission
// ABOUTME: Dependencies are declared by title and resolved to positions by the engine

use serde::{Deserialize, Serialize};

use crate::model::Metadata;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskDescriptor {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(alias = "agent", alias = "workerKind")]
    pub worker_kind: String,
    #[serde(default)]
    pub dependencies: Vec<String>,
    #[serde(default)]
    pub metadata: Metadata,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    pub tasks: Vec<TaskDescriptor>,
    pub raw_response: String,
    /// Set when the planner output could not be parsed and the single-task
    /// fallback was substituted.
    #[serde(default)]
    pub fallback: bool,
}

impl TaskDescriptor {
    pub fn new(title: impl Into<String>, worker_kind: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: None,
            worker_kind: worker_kind.into(),
            dependencies: Vec::new(),
            metadata: Default::default(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn depends_on<I, S>(mut self, titles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dependencies.extend(titles.into_iter().map(Into::into));
        self
    }
}

impl Plan {
    pub fn new(tasks: Vec<TaskDescriptor>, raw_response: impl Into<String>) -> Self {
        Self {
            tasks,
            raw_response: raw_response.into(),
            fallback: false,
        }
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn titles(&self) -> Vec<&str> {
        self.tasks.iter().map(|task| task.title.as_str()).collect()
    }
}
