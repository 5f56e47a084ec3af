// ABOUTME: Process-local knowledge store with term-overlap retrieval
// ABOUTME: Only approved items are searchable; new items are indexed unapproved

use async_trait::async_trait;
use std::collections::HashSet;
use tokio::sync::RwLock;
use tracing::{debug, info};

use super::{KnowledgeStore, Result, ServiceError};
use crate::model::{KnowledgeItem, KnowledgeSnippet};

pub const DEFAULT_SCORE_THRESHOLD: f32 = 0.25;
const MIN_TERM_LEN: usize = 3;

#[derive(Debug, Default)]
struct Inner {
    items: Vec<KnowledgeItem>,
    next_id: u64,
}

#[derive(Debug)]
pub struct InMemoryKnowledgeStore {
    inner: RwLock<Inner>,
    score_threshold: f32,
}

impl Default for InMemoryKnowledgeStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryKnowledgeStore {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner {
                items: Vec::new(),
                next_id: 1,
            }),
            score_threshold: DEFAULT_SCORE_THRESHOLD,
        }
    }

    pub fn with_score_threshold(mut self, threshold: f32) -> Self {
        self.score_threshold = threshold;
        self
    }

    /// Insert an item as-is, keeping its approval flag.
    pub async fn insert(&self, mut item: KnowledgeItem) -> u64 {
        let mut inner = self.inner.write().await;
        let id = inner.next_id;
        inner.next_id += 1;
        item.id = Some(id);
        inner.items.push(item);
        id
    }

    pub async fn approve(&self, id: u64) -> Result<()> {
        let mut inner = self.inner.write().await;
        let item = inner
            .items
            .iter_mut()
            .find(|item| item.id == Some(id))
            .ok_or_else(|| {
                ServiceError::failed("knowledge store", format!("no knowledge item {}", id))
            })?;
        item.approved = true;
        info!("Approved knowledge item {} ({})", id, item.title);
        Ok(())
    }

    pub async fn items(&self) -> Vec<KnowledgeItem> {
        self.inner.read().await.items.clone()
    }
}

fn terms(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|term| term.chars().count() >= MIN_TERM_LEN)
        .map(|term| term.to_lowercase())
        .collect()
}

/// Fraction of query terms present in the item.
fn score(query: &HashSet<String>, item: &KnowledgeItem) -> f32 {
    if query.is_empty() {
        return 0.0;
    }
    let mut haystack = terms(&item.title);
    haystack.extend(terms(&item.content));
    for tag in &item.tags {
        haystack.extend(terms(tag));
    }
    let hits = query.iter().filter(|term| haystack.contains(*term)).count();
    hits as f32 / query.len() as f32
}

#[async_trait]
impl KnowledgeStore for InMemoryKnowledgeStore {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<KnowledgeSnippet>> {
        let query_terms = terms(query);
        let inner = self.inner.read().await;

        let mut hits: Vec<KnowledgeSnippet> = inner
            .items
            .iter()
            .filter(|item| item.approved)
            .map(|item| item.to_snippet(score(&query_terms, item)))
            .filter(|snippet| snippet.score >= self.score_threshold)
            .collect();

        hits.sort_by(|a, b| b.score.total_cmp(&a.score));
        hits.truncate(limit);
        debug!("Knowledge search returned {} snippets", hits.len());
        Ok(hits)
    }

    async fn index_unapproved(&self, mut item: KnowledgeItem) -> Result<u64> {
        item.approved = false;
        let id = self.insert(item).await;
        info!("Indexed knowledge item {} pending approval", id);
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::KnowledgeKind;

    #[tokio::test]
    async fn test_search_ranks_approved_items_only() {
        let store = InMemoryKnowledgeStore::new();
        store
            .insert(
                KnowledgeItem::new(
                    KnowledgeKind::Adr,
                    "Postgres for billing",
                    "Billing invoices live in postgres tables",
                )
                .approved(),
            )
            .await;
        store
            .insert(KnowledgeItem::new(
                KnowledgeKind::Playbook,
                "Billing rollout",
                "Unreviewed billing invoices notes",
            ))
            .await;
        store
            .insert(
                KnowledgeItem::new(KnowledgeKind::Glossary, "Tenant", "A customer workspace")
                    .approved(),
            )
            .await;

        let hits = store.search("billing invoices", 5).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].title, "Postgres for billing");
        assert!((hits[0].score - 1.0).abs() < f32::EPSILON);
    }

    #[tokio::test]
    async fn test_index_unapproved_then_approve() {
        let store = InMemoryKnowledgeStore::new();
        let item = KnowledgeItem::new(KnowledgeKind::Playbook, "Deploy steps", "deploy with helm")
            .approved();

        let id = store.index_unapproved(item).await.unwrap();
        assert!(store.search("deploy helm", 5).await.unwrap().is_empty());

        store.approve(id).await.unwrap();
        assert_eq!(store.search("deploy helm", 5).await.unwrap().len(), 1);
        assert!(store.approve(999).await.is_err());
    }

    #[tokio::test]
    async fn test_search_honours_limit() {
        let store = InMemoryKnowledgeStore::new();
        for n in 0..4 {
            store
                .insert(
                    KnowledgeItem::new(KnowledgeKind::Snippet, format!("cache {}", n), "redis cache")
                        .approved(),
                )
                .await;
        }

        assert_eq!(store.search("redis cache", 2).await.unwrap().len(), 2);
    }
}
