// ABOUTME: Mission manifest read by the binary
// ABOUTME: Describes the mission, the recorded planner response and approved knowledge to seed

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::model::{KnowledgeItem, KnowledgeKind, Metadata};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MissionManifest {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub metadata: Metadata,
    /// Planner output to replay, inline.
    #[serde(default)]
    pub planner_response: Option<String>,
    /// Planner output to replay, read from a file relative to the manifest.
    #[serde(default)]
    pub planner_response_file: Option<PathBuf>,
    #[serde(default)]
    pub knowledge: Vec<KnowledgeSeed>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeSeed {
    pub kind: KnowledgeKind,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl KnowledgeSeed {
    /// Seeds are reviewed content and enter the store approved.
    pub fn into_item(self) -> KnowledgeItem {
        let mut item = KnowledgeItem::new(self.kind, self.title, self.content).approved();
        item.category = self.category;
        item.tags = self.tags;
        item
    }
}

impl MissionManifest {
    pub async fn load(path: &Path) -> Result<Self> {
        let contents = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read manifest {}", path.display()))?;
        let mut manifest: MissionManifest = serde_yaml::from_str(&contents)
            .with_context(|| format!("Invalid manifest {}", path.display()))?;

        if manifest.title.trim().is_empty() {
            bail!("Manifest {} has an empty title", path.display());
        }
        if manifest.planner_response.is_some() && manifest.planner_response_file.is_some() {
            bail!("Use either planner_response or planner_response_file, not both");
        }

        if let Some(file) = manifest.planner_response_file.take() {
            let resolved = match path.parent() {
                Some(dir) if file.is_relative() => dir.join(&file),
                _ => file,
            };
            let response = tokio::fs::read_to_string(&resolved).await.with_context(|| {
                format!("Failed to read planner response {}", resolved.display())
            })?;
            manifest.planner_response = Some(response);
        }

        Ok(manifest)
    }

    /// Recorded planner output; empty when none was given, which plans the
    /// single fallback task.
    pub fn planner_response(&self) -> &str {
        self.planner_response.as_deref().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_load_with_response_file() {
        let dir = tempdir().unwrap();
        std::fs::write(
            dir.path().join("plan.json"),
            r#"[{"title": "API", "worker_kind": "backend"}]"#,
        )
        .unwrap();
        let manifest_path = dir.path().join("mission.yaml");
        std::fs::write(
            &manifest_path,
            r#"
title: Add API
description: Expose the service
planner_response_file: plan.json
knowledge:
  - kind: adr
    title: REST conventions
    content: Use plural resource names
    tags: [api]
"#,
        )
        .unwrap();

        let manifest = MissionManifest::load(&manifest_path).await.unwrap();
        assert!(manifest.planner_response().contains("\"API\""));
        assert_eq!(manifest.knowledge.len(), 1);

        let item = manifest.knowledge[0].clone().into_item();
        assert!(item.approved);
        assert_eq!(item.tags, vec!["api"]);
    }

    #[tokio::test]
    async fn test_rejects_both_response_sources() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("mission.yaml");
        std::fs::write(
            &path,
            "title: x\nplanner_response: \"[]\"\nplanner_response_file: plan.json\n",
        )
        .unwrap();

        assert!(MissionManifest::load(&path).await.is_err());
    }

    #[tokio::test]
    async fn test_missing_response_is_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("mission.yaml");
        std::fs::write(&path, "title: Fallback only\n").unwrap();

        let manifest = MissionManifest::load(&path).await.unwrap();
        assert_eq!(manifest.planner_response(), "");
        assert!(manifest.description.is_empty());
    }
}
