// ABOUTME: Configuration management for the missionforge binary
// ABOUTME: Loads YAML configuration from standard locations and applies environment overrides

use anyhow::{bail, Context, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::engine::{EngineConfig, DEFAULT_MAX_CONCURRENT};
use crate::services::ValidationCommands;
use crate::workers::{CommandConfig, WorkerKind};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub max_concurrent_tasks: usize,
    pub knowledge_search_limit: usize,
    pub branch_slug_length: usize,
    /// Working tree used for validation commands and git integration.
    pub repo_path: Option<PathBuf>,
    /// JSON snapshot of all mission records, rewritten on every commit.
    pub state_file: Option<PathBuf>,
    pub validation: ValidationCommands,
    pub workers: IndexMap<WorkerKind, CommandConfig>,
    /// Command used for every worker kind without an entry in `workers`.
    pub default_worker: Option<CommandConfig>,
    pub git: GitConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GitConfig {
    pub author_name: Option<String>,
    pub author_email: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_concurrent_tasks: DEFAULT_MAX_CONCURRENT,
            knowledge_search_limit: 5,
            branch_slug_length: 30,
            repo_path: None,
            state_file: None,
            validation: ValidationCommands::default(),
            workers: IndexMap::new(),
            default_worker: Some(CommandConfig::script(
                "echo \"[$MISSION_TASK_KIND] $MISSION_TASK_TITLE\"",
            )),
            git: GitConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from an explicit path or the default locations
    pub fn load(path: Option<PathBuf>) -> Result<Self> {
        let config_path = match path {
            Some(p) => {
                if !p.exists() {
                    bail!("Configuration file not found: {}", p.display());
                }
                Some(p)
            }
            None => Self::find_config_file(),
        };

        let mut config = match config_path {
            Some(path) => Self::from_file(&path)?,
            None => Config::default(),
        };
        config.merge_env()?;
        Ok(config)
    }

    pub fn from_file(path: &std::path::Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration {}", path.display()))?;
        serde_yaml::from_str(&contents)
            .with_context(|| format!("Invalid configuration in {}", path.display()))
    }

    /// Working directory first, then `~/.missionforge/config.yaml`.
    fn find_config_file() -> Option<PathBuf> {
        let local = [
            "missionforge.yaml",
            "missionforge.yml",
            ".missionforge.yaml",
            ".missionforge.yml",
        ]
        .into_iter()
        .map(PathBuf::from)
        .find(|path| path.exists());

        local.or_else(|| {
            dirs::home_dir()
                .map(|home| home.join(".missionforge").join("config.yaml"))
                .filter(|path| path.exists())
        })
    }

    fn merge_env(&mut self) -> Result<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply `MISSIONFORGE_*` overrides read through `lookup`.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(level) = lookup("MISSIONFORGE_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = lookup("MISSIONFORGE_LOG_FORMAT") {
            self.logging.format = format;
        }
        if let Some(max) = lookup("MISSIONFORGE_MAX_CONCURRENT") {
            self.max_concurrent_tasks = max
                .parse()
                .with_context(|| format!("MISSIONFORGE_MAX_CONCURRENT is not a number: {}", max))?;
        }
        if let Some(repo) = lookup("MISSIONFORGE_REPO_PATH") {
            self.repo_path = Some(PathBuf::from(repo));
        }
        if let Some(state) = lookup("MISSIONFORGE_STATE_FILE") {
            self.state_file = Some(PathBuf::from(state));
        }
        Ok(())
    }

    pub fn repo_path(&self) -> PathBuf {
        self.repo_path
            .clone()
            .unwrap_or_else(|| PathBuf::from("."))
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            max_concurrent_tasks: self.max_concurrent_tasks,
            knowledge_search_limit: self.knowledge_search_limit,
            branch_slug_length: self.branch_slug_length,
            ..EngineConfig::default()
        }
    }
}
