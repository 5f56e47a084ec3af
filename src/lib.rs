// ABOUTME: Main library module for the missionforge mission engine
// ABOUTME: Exports all core modules and provides the public API

pub mod cli;
pub mod engine;
pub mod model;
pub mod plan;
pub mod services;
pub mod store;
pub mod workers;

// Re-export commonly used types
pub use cli::{App, Args, Config};
pub use engine::{
    Collaborators, EngineConfig, MissionEngine, MissionError, MissionExecutor, MissionHandle,
    MissionReport,
};
pub use model::{Mission, MissionStatus, TaskRecord, TaskStatus};
pub use plan::{Plan, PlanParser, TaskDescriptor};
pub use store::{InMemoryStore, MissionStore};
pub use workers::{Worker, WorkerKind, WorkerRegistry};

pub type Result<T> = anyhow::Result<T>;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
