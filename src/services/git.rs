// ABOUTME: Version control integration through the git command line
// ABOUTME: Failures are reported as `false` so a mission can finish without a usable repository

use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, error, info};

use super::{Result, VersionControl};

#[derive(Debug, Clone)]
pub struct GitIntegrator {
    repo_path: PathBuf,
    identity: Option<(String, String)>,
}

struct GitOutput {
    success: bool,
    stderr: String,
}

impl GitIntegrator {
    pub fn new(repo_path: impl Into<PathBuf>) -> Self {
        Self {
            repo_path: repo_path.into(),
            identity: None,
        }
    }

    /// Author and committer used for mission commits.
    pub fn with_identity(mut self, name: impl Into<String>, email: impl Into<String>) -> Self {
        self.identity = Some((name.into(), email.into()));
        self
    }

    async fn git(&self, args: &[&str]) -> Option<GitOutput> {
        let mut cmd = Command::new("git");
        cmd.args(args)
            .current_dir(&self.repo_path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        if let Some((ref name, ref email)) = self.identity {
            cmd.env("GIT_AUTHOR_NAME", name)
                .env("GIT_AUTHOR_EMAIL", email)
                .env("GIT_COMMITTER_NAME", name)
                .env("GIT_COMMITTER_EMAIL", email);
        }

        debug!("git {}", args.join(" "));
        match cmd.output().await {
            Ok(output) => Some(GitOutput {
                success: output.status.success(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            }),
            Err(e) => {
                error!("Failed to run git in {}: {}", self.repo_path.display(), e);
                None
            }
        }
    }

    async fn run(&self, args: &[&str]) -> bool {
        match self.git(args).await {
            Some(output) if output.success => true,
            Some(output) => {
                error!("git {} failed: {}", args.join(" "), output.stderr);
                false
            }
            None => false,
        }
    }

    async fn branch_exists(&self, name: &str) -> bool {
        let reference = format!("refs/heads/{}", name);
        matches!(
            self.git(&["rev-parse", "--verify", "--quiet", &reference]).await,
            Some(GitOutput { success: true, .. })
        )
    }
}

#[async_trait]
impl VersionControl for GitIntegrator {
    async fn create_or_checkout_branch(&self, name: &str) -> Result<bool> {
        if !self.run(&["rev-parse", "--git-dir"]).await {
            return Ok(false);
        }

        let ok = if self.branch_exists(name).await {
            info!("Branch {} already exists, checking out", name);
            self.run(&["checkout", name]).await
        } else {
            self.run(&["checkout", "-b", name]).await
        };

        if ok {
            info!("On branch {}", name);
        }
        Ok(ok)
    }

    async fn commit_all(&self, message: &str) -> Result<bool> {
        if !self.run(&["add", "--all"]).await {
            return Ok(false);
        }
        let committed = self.run(&["commit", "-m", message]).await;
        if committed {
            info!(
                "Committed: {}",
                message.lines().next().unwrap_or_default()
            );
        }
        Ok(committed)
    }
}
