// ABOUTME: Planning request assembled from a mission and retrieved knowledge
// ABOUTME: Renders the prompt handed to the planner collaborator

use serde::{Deserialize, Serialize};

use crate::model::{KnowledgeSnippet, Mission, MissionId};
use crate::workers::WorkerKind;

const SNIPPET_PREVIEW_CHARS: usize = 200;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanningRequest {
    pub mission_id: MissionId,
    pub title: String,
    pub description: String,
    pub context: Vec<KnowledgeSnippet>,
    pub prompt: String,
}

impl PlanningRequest {
    pub fn new(mission: &Mission, context: Vec<KnowledgeSnippet>) -> Self {
        let prompt = render_prompt(&mission.title, &mission.description, &context);
        Self {
            mission_id: mission.id,
            title: mission.title.clone(),
            description: mission.description.clone(),
            context,
            prompt,
        }
    }
}

fn render_prompt(title: &str, description: &str, context: &[KnowledgeSnippet]) -> String {
    let knowledge = if context.is_empty() {
        "No relevant prior knowledge found.".to_string()
    } else {
        context
            .iter()
            .map(|snippet| {
                let preview: String = snippet.content.chars().take(SNIPPET_PREVIEW_CHARS).collect();
                format!("- {}: {}...", snippet.title, preview)
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    };

    let kinds = WorkerKind::all()
        .iter()
        .map(|kind| kind.as_str())
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        r#"You are an expert development orchestrator. Create a detailed plan to accomplish this mission.

MISSION:
Title: {title}
Description: {description}

RELEVANT KNOWLEDGE FROM MEMORY:
{knowledge}

Create a plan with specific tasks. For each task, specify:
1. Title (unique within the plan)
2. Description
3. Responsible worker ({kinds})
4. Dependencies, as titles of other tasks in this plan

Return a JSON array of tasks in this format:
[
  {{
    "title": "Task title",
    "description": "What needs to be done",
    "worker_kind": "backend",
    "dependencies": []
  }}
]
"#
    )
}
