// ABOUTME: Worker that executes a task by running a configured shell command or script
// ABOUTME: Task fields are exported as environment variables and the captured output becomes the result

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, error, info};

use super::Worker;
use crate::engine::WorkerOutput;
use crate::model::TaskRecord;
use crate::services::ServiceError;

/// Configuration for a command-backed worker
///
/// Supports two execution modes:
/// 1. Simple command: `command` + `args`
/// 2. Script mode: `script`, run as `<shell> -c <script>`
///
/// ```yaml
/// workers:
///   backend:
///     script: |
///       echo "building $MISSION_TASK_TITLE"
///       make -C services "$MISSION_TASK_KIND"
///     timeout: 10m
///     expected_exit_codes: [0]
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandConfig {
    #[serde(default)]
    pub command: Option<String>,

    #[serde(default)]
    pub args: Vec<String>,

    #[serde(default)]
    pub script: Option<String>,

    #[serde(default = "default_shell")]
    pub shell: String,

    #[serde(default)]
    pub env: HashMap<String, String>,

    #[serde(default)]
    pub working_dir: Option<String>,

    #[serde(default = "default_timeout", with = "humantime_serde")]
    pub timeout: Duration,

    /// Exit codes considered successful; empty accepts any code.
    #[serde(default = "default_exit_codes")]
    pub expected_exit_codes: Vec<i32>,
}

fn default_shell() -> String {
    "/bin/sh".to_string()
}

fn default_timeout() -> Duration {
    Duration::from_secs(300)
}

fn default_exit_codes() -> Vec<i32> {
    vec![0]
}

impl Default for CommandConfig {
    fn default() -> Self {
        Self {
            command: None,
            args: Vec::new(),
            script: None,
            shell: default_shell(),
            env: HashMap::new(),
            working_dir: None,
            timeout: default_timeout(),
            expected_exit_codes: default_exit_codes(),
        }
    }
}

impl CommandConfig {
    pub fn script(script: impl Into<String>) -> Self {
        Self {
            script: Some(script.into()),
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<(), ServiceError> {
        match (&self.command, &self.script) {
            (None, None) => Err(ServiceError::failed(
                "worker",
                "either 'command' or 'script' must be provided",
            )),
            (Some(_), Some(_)) => Err(ServiceError::failed(
                "worker",
                "cannot specify both 'command' and 'script'",
            )),
            (Some(command), None) if command.trim().is_empty() => {
                Err(ServiceError::failed("worker", "command cannot be empty"))
            }
            (None, Some(script)) if script.trim().is_empty() => {
                Err(ServiceError::failed("worker", "script cannot be empty"))
            }
            _ if self.timeout.is_zero() => {
                Err(ServiceError::failed("worker", "timeout must be greater than 0"))
            }
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CommandWorker {
    config: CommandConfig,
}

impl CommandWorker {
    pub fn new(config: CommandConfig) -> Result<Self, ServiceError> {
        config.validate()?;
        Ok(Self { config })
    }

    fn build_command(&self, task: &TaskRecord) -> Command {
        let mut cmd = match (&self.config.script, &self.config.command) {
            (Some(script), _) => {
                let mut cmd = Command::new(&self.config.shell);
                cmd.arg("-c").arg(script);
                cmd
            }
            (None, Some(command)) => {
                let mut cmd = Command::new(command);
                cmd.args(&self.config.args);
                cmd
            }
            (None, None) => Command::new(&self.config.shell),
        };

        for (key, value) in &self.config.env {
            cmd.env(key, value);
        }
        cmd.env("MISSION_ID", task.mission_id.to_string())
            .env("MISSION_TASK_ID", task.id.to_string())
            .env("MISSION_TASK_TITLE", &task.title)
            .env(
                "MISSION_TASK_DESCRIPTION",
                task.description.as_deref().unwrap_or_default(),
            )
            .env("MISSION_TASK_KIND", task.worker_kind.as_str());

        if let Some(ref working_dir) = self.config.working_dir {
            cmd.current_dir(working_dir);
        }

        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }
}

#[async_trait]
impl Worker for CommandWorker {
    async fn execute(&self, task: &TaskRecord) -> Result<WorkerOutput, ServiceError> {
        info!(
            "Running {} worker for task {} ({})",
            task.worker_kind, task.id, task.title
        );

        let mut cmd = self.build_command(task);
        let output = match timeout(self.config.timeout, cmd.output()).await {
            Ok(result) => result?,
            Err(_) => {
                error!(
                    "Task {} timed out after {:?}",
                    task.id, self.config.timeout
                );
                return Err(ServiceError::Timeout {
                    service: format!("{} worker", task.worker_kind),
                    after: self.config.timeout,
                });
            }
        };

        let exit_code = output.status.code().unwrap_or(-1);
        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        debug!("Task {} exited with code {}", task.id, exit_code);

        let accepted = self.config.expected_exit_codes.is_empty()
            || self.config.expected_exit_codes.contains(&exit_code);

        if !accepted {
            let detail = if stderr.trim().is_empty() {
                stdout.trim()
            } else {
                stderr.trim()
            };
            return Err(ServiceError::failed(
                format!("{} worker", task.worker_kind),
                format!(
                    "exited with unexpected code {} (expected one of {:?}): {}",
                    exit_code, self.config.expected_exit_codes, detail
                ),
            ));
        }

        Ok(WorkerOutput::completed(json!({
            "stdout": stdout,
            "stderr": stderr,
            "exit_code": exit_code,
        })))
    }
}
