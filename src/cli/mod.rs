// ABOUTME: CLI module for the missionforge binary
// ABOUTME: Exports argument parsing, configuration, manifests and the application entry point

pub mod app;
pub mod args;
pub mod commands;
pub mod config;
pub mod manifest;

pub use app::App;
pub use args::{Args, Commands};
pub use config::Config;
pub use manifest::{KnowledgeSeed, MissionManifest};
