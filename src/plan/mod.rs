// ABOUTME: Planner contract, plan parsing and plan validation
// ABOUTME: Turns free-form planner output into ordered task descriptors without ever failing a mission

pub mod descriptor;
pub mod error;
pub mod parser;
pub mod prompt;
pub mod validation;

pub use descriptor::{Plan, TaskDescriptor};
pub use error::{PlanError, Result};
pub use parser::{PlanParser, FALLBACK_TASK_TITLE};
pub use prompt::PlanningRequest;
pub use validation::{PlanReport, PlanValidator, PlanWarning};
