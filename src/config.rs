//! Step configuration
//!
//! A [`CheckoutConfig`] is read either from a JSON file or from the step
//! inputs, given as flags or as the input environment variables
//! (`repository_url`, `commit`, `merge_pr`, ...), where booleans are spelled
//! `yes`/`no`. [`StepOptions`] carries the knobs that are about running the
//! step rather than about what to check out.

use std::path::{Path, PathBuf};

use clap::builder::BoolishValueParser;
use clap::{ArgAction, Args, Parser};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error loading or validating the configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("required input `{0}` is not set")]
    Missing(&'static str),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid JSON configuration: {0}")]
    Json(#[from] serde_json::Error),
}

/// Command line of the step binary.
#[derive(Debug, Parser)]
#[command(
    name = "git-clone-checkout",
    version,
    about = "Clone a repository and check out a commit, tag, branch or pull request"
)]
pub struct StepArgs {
    /// Read the checkout inputs from a JSON file instead
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[arg(long, env = "repository_url", required_unless_present = "config")]
    pub repository_url: Option<String>,

    #[arg(
        long,
        env = "clone_into_dir",
        value_name = "DIR",
        required_unless_present = "config"
    )]
    pub clone_into_dir: Option<PathBuf>,

    #[command(flatten)]
    pub checkout: CheckoutConfig,

    #[command(flatten)]
    pub options: StepOptions,
}

impl StepArgs {
    /// Resolve the checkout inputs, from `--config` when given.
    pub fn into_parts(self) -> Result<(CheckoutConfig, StepOptions), ConfigError> {
        let checkout = match &self.config {
            Some(path) => CheckoutConfig::from_json_file(path)?,
            None => {
                let cfg = CheckoutConfig {
                    repository_url: self.repository_url.unwrap_or_default(),
                    clone_into_dir: self.clone_into_dir.unwrap_or_default(),
                    ..self.checkout
                }
                .normalized();
                cfg.validate()?;
                cfg
            }
        };

        Ok((checkout, self.options))
    }
}

/// What to check out, and from where.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Args)]
#[serde(default)]
pub struct CheckoutConfig {
    #[arg(skip)]
    pub repository_url: String,
    #[arg(skip)]
    pub clone_into_dir: PathBuf,

    #[arg(long, env = "commit", default_value = "")]
    pub commit: String,
    #[arg(long, env = "tag", default_value = "")]
    pub tag: String,
    #[arg(long, env = "branch", default_value = "")]
    pub branch: String,

    #[serde(rename = "branch_dest")]
    #[arg(long = "branch-dest", env = "branch_dest", default_value = "")]
    pub pr_dest_branch: String,
    #[serde(rename = "pull_request_id")]
    #[arg(long = "pull-request-id", env = "pull_request_id", default_value_t = 0)]
    pub pr_id: u64,
    #[serde(rename = "pull_request_repository_url")]
    #[arg(
        long = "pull-request-repository-url",
        env = "pull_request_repository_url",
        default_value = ""
    )]
    pub pr_source_repository_url: String,
    #[serde(rename = "pull_request_merge_branch")]
    #[arg(
        long = "pull-request-merge-branch",
        env = "pull_request_merge_branch",
        default_value = ""
    )]
    pub pr_merge_branch: String,
    #[serde(rename = "pull_request_head_branch")]
    #[arg(
        long = "pull-request-head-branch",
        env = "pull_request_head_branch",
        default_value = ""
    )]
    pub pr_head_branch: String,

    #[arg(long, env = "clone_depth", default_value_t = 0)]
    pub clone_depth: u32,
    #[arg(
        long,
        env = "fetch_tags",
        default_value = "no",
        value_parser = BoolishValueParser::new(),
        action = ArgAction::Set
    )]
    pub fetch_tags: bool,
    /// One directory per line
    #[arg(long, env = "sparse_directories", value_delimiter = '\n')]
    pub sparse_directories: Vec<String>,
    #[serde(rename = "merge_pr")]
    #[arg(
        long = "merge-pr",
        env = "merge_pr",
        default_value = "yes",
        value_parser = BoolishValueParser::new(),
        action = ArgAction::Set
    )]
    pub should_merge_pr: bool,
    #[arg(
        long,
        env = "manual_merge",
        default_value = "yes",
        value_parser = BoolishValueParser::new(),
        action = ArgAction::Set
    )]
    pub manual_merge: bool,

    #[arg(
        long,
        env = "reset_repository",
        default_value = "no",
        value_parser = BoolishValueParser::new(),
        action = ArgAction::Set
    )]
    pub reset_repository: bool,

    #[arg(
        long,
        env = "update_submodules",
        default_value = "yes",
        value_parser = BoolishValueParser::new(),
        action = ArgAction::Set
    )]
    pub update_submodules: bool,
    #[arg(
        long,
        env = "limit_submodule_update_depth",
        default_value = "yes",
        value_parser = BoolishValueParser::new(),
        action = ArgAction::Set
    )]
    pub limit_submodule_update_depth: bool,

    #[arg(long, env = "build_url", default_value = "")]
    pub build_url: String,
    #[arg(long, env = "build_api_token", default_value = "", hide_env_values = true)]
    pub build_api_token: String,
}

impl Default for CheckoutConfig {
    fn default() -> Self {
        Self {
            repository_url: String::new(),
            clone_into_dir: PathBuf::new(),
            commit: String::new(),
            tag: String::new(),
            branch: String::new(),
            pr_dest_branch: String::new(),
            pr_id: 0,
            pr_source_repository_url: String::new(),
            pr_merge_branch: String::new(),
            pr_head_branch: String::new(),
            clone_depth: 0,
            fetch_tags: false,
            sparse_directories: Vec::new(),
            should_merge_pr: true,
            manual_merge: true,
            reset_repository: false,
            update_submodules: true,
            limit_submodule_update_depth: true,
            build_url: String::new(),
            build_api_token: String::new(),
        }
    }
}

impl CheckoutConfig {
    /// Read the configuration from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config = serde_json::from_str::<Self>(&content)?.normalized();
        config.validate()?;
        Ok(config)
    }

    /// Check the inputs every run needs.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.repository_url.trim().is_empty() {
            return Err(ConfigError::Missing("repository_url"));
        }
        if self.clone_into_dir.as_os_str().is_empty() {
            return Err(ConfigError::Missing("clone_into_dir"));
        }
        Ok(())
    }

    /// The ref the run is about, used to decide whether commit details are
    /// worth exporting.
    pub fn checkout_arg(&self) -> Option<&str> {
        [&self.commit, &self.tag, &self.branch]
            .into_iter()
            .find(|s| !s.is_empty())
            .map(String::as_str)
    }

    fn normalized(mut self) -> Self {
        self.sparse_directories = self
            .sparse_directories
            .iter()
            .map(|dir| dir.trim())
            .filter(|dir| !dir.is_empty())
            .map(String::from)
            .collect();
        self
    }
}

/// How the step runs, independent of what it checks out.
#[derive(Debug, Clone, PartialEq, Eq, Args)]
pub struct StepOptions {
    /// File receiving `KEY=value` exports; values are only logged without it
    #[arg(long, env = "GIT_CLONE_EXPORT_FILE", value_name = "FILE")]
    pub env_export_file: Option<PathBuf>,
    /// Upper bound for exported commit message values, in KiB
    #[arg(long, env = "GIT_CLONE_ENV_BYTES_LIMIT_KB", default_value_t = 20)]
    pub env_bytes_limit_kb: usize,
    /// Timeout for a single git command, in seconds
    #[arg(long = "command-timeout", env = "GIT_CLONE_COMMAND_TIMEOUT", default_value_t = 600)]
    pub command_timeout_secs: u64,
}

impl Default for StepOptions {
    fn default() -> Self {
        Self {
            env_export_file: None,
            env_bytes_limit_kb: 20,
            command_timeout_secs: 600,
        }
    }
}

impl StepOptions {
    /// Byte limit for a single exported value.
    pub fn max_env_length(&self) -> usize {
        self.env_bytes_limit_kb.saturating_mul(1024)
    }
}
