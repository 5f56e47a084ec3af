// ABOUTME: Knowledge items written to and retrieved from the long-term knowledge store
// ABOUTME: Mission summaries are stored unapproved until an external review approves them

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::mission::Mission;
use super::Metadata;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KnowledgeKind {
    Adr,
    Playbook,
    Snippet,
    Glossary,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeItem {
    pub id: Option<u64>,
    pub kind: KnowledgeKind,
    pub title: String,
    pub content: String,
    pub category: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub approved: bool,
    #[serde(default)]
    pub metadata: Metadata,
    pub created_at: DateTime<Utc>,
}

/// A ranked search hit returned by the knowledge store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeSnippet {
    pub title: String,
    pub content: String,
    pub kind: KnowledgeKind,
    pub category: Option<String>,
    pub score: f32,
}

impl KnowledgeItem {
    pub fn new(kind: KnowledgeKind, title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: None,
            kind,
            title: title.into(),
            content: content.into(),
            category: None,
            tags: Vec::new(),
            approved: false,
            metadata: Metadata::new(),
            created_at: Utc::now(),
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn approved(mut self) -> Self {
        self.approved = true;
        self
    }

    /// Playbook entry summarising a finished mission, tagged with its id.
    pub fn mission_summary(mission: &Mission, content: String) -> Self {
        let mut item = Self::new(
            KnowledgeKind::Playbook,
            format!("Mission: {}", mission.title),
            content,
        )
        .with_category("mission_summary");
        item.metadata
            .insert("mission_id".to_string(), serde_json::Value::from(mission.id));
        item
    }

    pub fn to_snippet(&self, score: f32) -> KnowledgeSnippet {
        KnowledgeSnippet {
            title: self.title.clone(),
            content: self.content.clone(),
            kind: self.kind,
            category: self.category.clone(),
            score,
        }
    }
}
