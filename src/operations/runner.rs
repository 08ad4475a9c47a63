//! Command execution capability
//!
//! Every strategy talks to git exclusively through [`CommandRunner`]. The
//! production implementation, [`CliRunner`], spawns the `git` binary inside
//! the clone directory.
//!
//! `GIT_TERMINAL_PROMPT=0` is always set so that a fetch from a private
//! remote fails instead of hanging on a credential prompt in CI.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use log::info;
use tokio::process::Command;

use super::GitCommand;
use crate::{GitError, GitResult};

/// Runs git commands and reports their trimmed standard output.
pub trait CommandRunner {
    fn run(&self, command: &GitCommand) -> impl Future<Output = GitResult<String>>;
}

impl<R: CommandRunner> CommandRunner for &R {
    fn run(&self, command: &GitCommand) -> impl Future<Output = GitResult<String>> {
        (**self).run(command)
    }
}

/// Runs commands with the `git` binary found in `PATH`.
#[derive(Debug, Clone)]
pub struct CliRunner {
    work_dir: PathBuf,
    timeout: Duration,
}

impl CliRunner {
    /// Default per-command timeout in seconds
    pub const DEFAULT_TIMEOUT_SECS: u64 = 600;

    pub fn new(work_dir: impl Into<PathBuf>) -> Self {
        Self {
            work_dir: work_dir.into(),
            timeout: Duration::from_secs(Self::DEFAULT_TIMEOUT_SECS),
        }
    }

    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.timeout = Duration::from_secs(secs);
        self
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }
}

impl CommandRunner for CliRunner {
    async fn run(&self, command: &GitCommand) -> GitResult<String> {
        info!("$ {command}");

        let mut cmd = Command::new("git");
        cmd.current_dir(&self.work_dir);
        cmd.args(command.args());

        // Prevent credential prompts from hanging
        cmd.env("GIT_TERMINAL_PROMPT", "0");

        // Force English output for consistent parsing (locale-independent)
        cmd.env("LC_ALL", "C");
        cmd.env("LANG", "C");

        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        cmd.kill_on_drop(true);

        let output = match tokio::time::timeout(self.timeout, cmd.output()).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(GitError::Timeout {
                    command: command.to_string(),
                    secs: self.timeout.as_secs(),
                });
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(GitError::Command {
                command: command.to_string(),
                code: output.status.code(),
                stderr,
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}
