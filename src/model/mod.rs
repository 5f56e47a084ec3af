// ABOUTME: Persisted record model for missions, tasks and knowledge items
// ABOUTME: Defines status vocabularies and the lifecycle rules the engine relies on

pub mod error;
pub mod knowledge;
pub mod mission;
pub mod task;

pub use error::{ModelError, Result};
pub use knowledge::{KnowledgeItem, KnowledgeKind, KnowledgeSnippet};
pub use mission::{FailureDetails, Mission, MissionId, MissionStatus};
pub use task::{NewTask, TaskId, TaskRecord, TaskStatus};

/// Free-form JSON metadata attached to missions, tasks and knowledge items.
pub type Metadata = serde_json::Map<String, serde_json::Value>;
