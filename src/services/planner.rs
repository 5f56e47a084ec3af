// ABOUTME: Planner that answers every request with a pre-recorded response
// ABOUTME: Used by the binary to replay planner output captured in a mission manifest

use async_trait::async_trait;
use tracing::debug;

use super::{Planner, Result};
use crate::plan::PlanningRequest;

#[derive(Debug, Clone)]
pub struct StaticPlanner {
    response: String,
}

impl StaticPlanner {
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            response: response.into(),
        }
    }
}

#[async_trait]
impl Planner for StaticPlanner {
    async fn plan(&self, request: &PlanningRequest) -> Result<String> {
        debug!(
            "Replaying recorded plan for mission {} ({} context snippets)",
            request.mission_id,
            request.context.len()
        );
        Ok(self.response.clone())
    }
}
