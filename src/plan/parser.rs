// ABOUTME: Extracts task descriptors from free-form planner output
// ABOUTME: Any output without a well-formed task array degrades to a single fallback task

use regex::Regex;
use tracing::{debug, warn};

use super::descriptor::{Plan, TaskDescriptor};
use super::error::Result;

pub const FALLBACK_TASK_TITLE: &str = "Implement mission requirements";
const FALLBACK_TASK_DESCRIPTION: &str = "Complete the mission as described";
const FALLBACK_WORKER_KIND: &str = "backend";

#[derive(Debug, Clone)]
pub struct PlanParser {
    array_pattern: Regex,
}

impl PlanParser {
    pub fn new() -> Result<Self> {
        Ok(Self {
            array_pattern: Regex::new(r"\[[\s\S]*\]")?,
        })
    }

    /// Parse planner output into a plan. Never fails: output without a
    /// parseable task array yields [`PlanParser::fallback`].
    pub fn parse(&self, raw: &str) -> Plan {
        let Some(block) = self.array_pattern.find(raw) else {
            warn!("Planner output contains no task array, using fallback plan");
            return Self::fallback(raw);
        };

        match serde_json::from_str::<Vec<TaskDescriptor>>(block.as_str()) {
            Ok(tasks) if tasks.iter().all(is_well_formed) => {
                debug!("Parsed {} task descriptors from planner output", tasks.len());
                Plan::new(tasks, raw)
            }
            Ok(_) => {
                warn!("Planner output contains a task without title or worker kind, using fallback plan");
                Self::fallback(raw)
            }
            Err(e) => {
                warn!("Planner output is not a valid task array ({}), using fallback plan", e);
                Self::fallback(raw)
            }
        }
    }

    pub fn fallback(raw: &str) -> Plan {
        let task = TaskDescriptor::new(FALLBACK_TASK_TITLE, FALLBACK_WORKER_KIND)
            .with_description(FALLBACK_TASK_DESCRIPTION);
        Plan {
            tasks: vec![task],
            raw_response: raw.to_string(),
            fallback: true,
        }
    }
}

fn is_well_formed(task: &TaskDescriptor) -> bool {
    !task.title.trim().is_empty() && !task.worker_kind.trim().is_empty()
}
