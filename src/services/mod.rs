// ABOUTME: Contracts for the collaborators a mission run depends on
// ABOUTME: Planner, knowledge store, validation runner and version control, plus local implementations

pub mod git;
pub mod knowledge;
pub mod planner;
pub mod runner;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

use crate::model::{KnowledgeItem, KnowledgeSnippet};
use crate::plan::PlanningRequest;

pub use git::GitIntegrator;
pub use knowledge::InMemoryKnowledgeStore;
pub use planner::StaticPlanner;
pub use runner::{CommandValidationRunner, ValidationCommands};

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("{service} failed: {message}")]
    Failed { service: String, message: String },

    #[error("{service} timed out after {after:?}")]
    Timeout { service: String, after: Duration },

    #[error("{service} is unavailable: {message}")]
    Unavailable { service: String, message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ServiceError {
    pub fn failed(service: impl Into<String>, message: impl Into<String>) -> Self {
        ServiceError::Failed {
            service: service.into(),
            message: message.into(),
        }
    }

    pub fn unavailable(service: impl Into<String>, message: impl Into<String>) -> Self {
        ServiceError::Unavailable {
            service: service.into(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ServiceError>;

#[async_trait]
pub trait Planner: Send + Sync {
    /// Returns the raw planner response; parsing happens in the engine.
    async fn plan(&self, request: &PlanningRequest) -> Result<String>;
}

#[async_trait]
pub trait KnowledgeStore: Send + Sync {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<KnowledgeSnippet>>;

    /// Store an item pending external approval; returns its id.
    async fn index_unapproved(&self, item: KnowledgeItem) -> Result<u64>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckKind {
    Lint,
    Test,
    Build,
}

impl CheckKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckKind::Lint => "lint",
            CheckKind::Test => "test",
            CheckKind::Build => "build",
        }
    }
}

impl fmt::Display for CheckKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckResult {
    pub kind: CheckKind,
    pub success: bool,
    pub output: String,
    /// Command that produced the result, `None` when the check was skipped.
    pub tool: Option<String>,
    pub duration_ms: u64,
}

impl CheckResult {
    pub fn passed(kind: CheckKind, output: impl Into<String>) -> Self {
        Self {
            kind,
            success: true,
            output: output.into(),
            tool: None,
            duration_ms: 0,
        }
    }

    pub fn failed(kind: CheckKind, output: impl Into<String>) -> Self {
        Self {
            success: false,
            ..Self::passed(kind, output)
        }
    }
}

/// Checks never error: a check that cannot run reports `success = false`.
#[async_trait]
pub trait ValidationRunner: Send + Sync {
    async fn run_lint(&self) -> CheckResult;
    async fn run_test(&self) -> CheckResult;
    async fn run_build(&self) -> CheckResult;
}

#[async_trait]
pub trait VersionControl: Send + Sync {
    async fn create_or_checkout_branch(&self, name: &str) -> Result<bool>;
    async fn commit_all(&self, message: &str) -> Result<bool>;
}
