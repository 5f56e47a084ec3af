// ABOUTME: Error types for plan handling
// ABOUTME: Parsing itself degrades to a fallback plan, so only setup can fail

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PlanError {
    #[error("Invalid plan extraction pattern: {0}")]
    Pattern(#[from] regex::Error),
}

pub type Result<T> = std::result::Result<T, PlanError>;
