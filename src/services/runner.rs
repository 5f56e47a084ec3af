// ABOUTME: Validation runner that shells out to lint, test and build tools
// ABOUTME: Candidate commands are tried in order; a missing tool falls through to the next

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use super::{CheckKind, CheckResult, ValidationRunner};

const COMMAND_NOT_FOUND: i32 = 127;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckCommands {
    pub candidates: Vec<String>,
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationCommands {
    pub lint: CheckCommands,
    pub test: CheckCommands,
    pub build: CheckCommands,
}

impl Default for ValidationCommands {
    fn default() -> Self {
        Self {
            lint: CheckCommands {
                candidates: vec![
                    "npm run lint 2>&1".to_string(),
                    "flake8 .".to_string(),
                    "black --check .".to_string(),
                    "eslint .".to_string(),
                ],
                timeout: Duration::from_secs(300),
            },
            test: CheckCommands {
                candidates: vec![
                    "npm test -- --passWithNoTests 2>&1".to_string(),
                    "pytest -v".to_string(),
                    "python -m pytest".to_string(),
                ],
                timeout: Duration::from_secs(600),
            },
            build: CheckCommands {
                candidates: vec![
                    "npm run build 2>&1".to_string(),
                    "python setup.py build".to_string(),
                    "make build".to_string(),
                ],
                timeout: Duration::from_secs(900),
            },
        }
    }
}

impl ValidationCommands {
    fn for_kind(&self, kind: CheckKind) -> &CheckCommands {
        match kind {
            CheckKind::Lint => &self.lint,
            CheckKind::Test => &self.test,
            CheckKind::Build => &self.build,
        }
    }
}

struct Attempt {
    exit_code: i32,
    output: String,
}

#[derive(Debug, Clone)]
pub struct CommandValidationRunner {
    repo_path: PathBuf,
    commands: ValidationCommands,
}

impl CommandValidationRunner {
    pub fn new(repo_path: impl Into<PathBuf>, commands: ValidationCommands) -> Self {
        Self {
            repo_path: repo_path.into(),
            commands,
        }
    }

    async fn attempt(&self, command: &str, limit: Duration) -> Attempt {
        let mut cmd = Command::new("sh");
        cmd.arg("-c")
            .arg(command)
            .current_dir(&self.repo_path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        match timeout(limit, cmd.output()).await {
            Ok(Ok(output)) => Attempt {
                exit_code: output.status.code().unwrap_or(-1),
                output: format!(
                    "{}{}",
                    String::from_utf8_lossy(&output.stdout),
                    String::from_utf8_lossy(&output.stderr)
                ),
            },
            Ok(Err(e)) => Attempt {
                exit_code: -1,
                output: format!("failed to spawn '{}': {}", command, e),
            },
            Err(_) => Attempt {
                exit_code: -1,
                output: format!("'{}' timed out after {:?}", command, limit),
            },
        }
    }

    async fn run_check(&self, kind: CheckKind) -> CheckResult {
        info!("Running {} check", kind);
        let started = Instant::now();
        let check = self.commands.for_kind(kind);

        for candidate in &check.candidates {
            let attempt = self.attempt(candidate, check.timeout).await;
            if attempt.exit_code == COMMAND_NOT_FOUND {
                debug!("{} candidate '{}' not available", kind, candidate);
                continue;
            }

            let success = attempt.exit_code == 0;
            if !success {
                warn!(
                    "{} check '{}' failed with exit code {}",
                    kind, candidate, attempt.exit_code
                );
            }
            return CheckResult {
                kind,
                success,
                output: attempt.output,
                tool: Some(candidate.clone()),
                duration_ms: started.elapsed().as_millis() as u64,
            };
        }

        warn!("No {} command available, skipping check", kind);
        CheckResult {
            duration_ms: started.elapsed().as_millis() as u64,
            ..CheckResult::passed(kind, format!("No {} command configured (skipped)", kind))
        }
    }
}

#[async_trait]
impl ValidationRunner for CommandValidationRunner {
    async fn run_lint(&self) -> CheckResult {
        self.run_check(CheckKind::Lint).await
    }

    async fn run_test(&self) -> CheckResult {
        self.run_check(CheckKind::Test).await
    }

    async fn run_build(&self) -> CheckResult {
        self.run_check(CheckKind::Build).await
    }
}
