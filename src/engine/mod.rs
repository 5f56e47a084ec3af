// ABOUTME: Mission execution engine
// ABOUTME: Cancellation, dependency graph, wave scheduling and the phase state machine

pub mod cancel;
pub mod context;
pub mod dependency;
pub mod error;
pub mod executor;
pub mod result;
pub mod scheduler;

pub use cancel::CancellationRegistry;
pub use context::MissionContext;
pub use dependency::{DependencyGraph, Wave};
pub use error::{MissionError, Result};
pub use executor::{
    branch_name, Collaborators, EngineConfig, MissionEngine, MissionExecutor, MissionHandle,
};
pub use result::{
    CompletedTask, IntegrationSummary, MissionOutcome, MissionReport, TaskSummary,
    ValidationReport, WorkerOutput,
};
pub use scheduler::{WaveScheduler, DEFAULT_MAX_CONCURRENT};
