//! `git_clone_checkout` - checkout-strategy engine for CI git clone steps
//!
//! Given a [`CheckoutConfig`] describing a commit, tag, branch or pull
//! request, this library picks exactly one [`CheckoutMethod`], builds the
//! matching strategy from validated parameters and drives `git` through a
//! [`CommandRunner`] until the working directory sits at the requested
//! state. Shallow fetches that turn out to be too shallow are retried once
//! with a full-depth fetch.

use std::error::Error as StdError;
use std::fmt;

use thiserror::Error;

// Module declarations
pub mod checkout;
pub mod config;
pub mod export;
pub mod operations;
pub mod patch;
pub mod step;

// Re-export checkout engine
pub use checkout::{
    CheckoutMethod, CheckoutStrategy, checkout_state, create_checkout_strategy,
    select_checkout_method, select_fallbacks, select_fetch_options,
};
pub use checkout::pr::{
    CheckoutPrDiffFile, CheckoutPrManualMerge, CheckoutPrMergeBranch, PrDiffFileParams,
    PrManualMergeParams, PrMergeBranchParams,
};
pub use checkout::simple::{
    BranchParams, CheckoutBranch, CheckoutCommit, CheckoutNone, CheckoutTag, CommitParams,
    TagParams,
};

// Re-export git operations
pub use operations::{
    CliRunner, CommandRunner, FORK_REMOTE, FallbackRetry, FetchOptions, GitCommand,
    ORIGIN_REMOTE, OriginState, UnshallowFetchOptions, fetch_arg, is_fork, is_private,
    merge_arg, check_origin, repository_identity,
};

pub use config::{CheckoutConfig, ConfigError, StepArgs, StepOptions};
pub use export::EnvExporter;
pub use patch::{HttpPatchSource, NoPatchSource, PatchSource};
pub use step::run_step;

/// Error types for git command execution
#[derive(Debug, Error)]
pub enum GitError {
    #[error("`{command}` failed (exit code {code:?}): {stderr}")]
    Command {
        command: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("`{command}` timed out after {secs} seconds")]
    Timeout { command: String, secs: u64 },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Convenience result alias.
pub type GitResult<T> = Result<T, GitError>;

/// Returned when a required parameter for the selected checkout strategy
/// is missing or blank.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct ParameterValidationError(pub String);

/// Machine-readable category of a [`StepError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorTag {
    CheckoutFailed,
    FetchFailed,
    UpdateSubmoduleFailed,
    SparseCheckoutFailed,
    ParameterInvalid,
    CreateDirectoryFailed,
    CheckOriginPresentFailed,
    ResetRepositoryFailed,
    InitGitFailed,
    AddRemoteFailed,
    ExportEnvsFailed,
    CountCommitsFailed,
    ExportEnvsCommitCountFailed,
}

impl ErrorTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorTag::CheckoutFailed => "checkout_failed",
            ErrorTag::FetchFailed => "fetch_failed",
            ErrorTag::UpdateSubmoduleFailed => "update_submodule_failed",
            ErrorTag::SparseCheckoutFailed => "sparse_checkout_failed",
            ErrorTag::ParameterInvalid => "parameter_invalid",
            ErrorTag::CreateDirectoryFailed => "git_new",
            ErrorTag::CheckOriginPresentFailed => "check_origin_present_failed",
            ErrorTag::ResetRepositoryFailed => "reset_repository_failed",
            ErrorTag::InitGitFailed => "init_git_failed",
            ErrorTag::AddRemoteFailed => "add_remote_failed",
            ErrorTag::ExportEnvsFailed => "export_envs_failed",
            ErrorTag::CountCommitsFailed => "count_commits_failed",
            ErrorTag::ExportEnvsCommitCountFailed => "export_envs_commit_count_failed",
        }
    }
}

impl fmt::Display for ErrorTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tagged failure of a checkout step.
///
/// Built at the failure site and handed back to the caller unchanged. Branch
/// checkout failures may carry the branches that do exist on `origin`.
#[derive(Debug)]
pub struct StepError {
    tag: ErrorTag,
    cause: Box<dyn StdError + Send + Sync>,
    summary: String,
    branch_suggestions: Option<Vec<String>>,
}

impl StepError {
    pub fn new(
        tag: ErrorTag,
        cause: impl Into<Box<dyn StdError + Send + Sync>>,
        summary: impl Into<String>,
    ) -> Self {
        Self {
            tag,
            cause: cause.into(),
            summary: summary.into(),
            branch_suggestions: None,
        }
    }

    /// Attach the branches available on the remote.
    pub fn with_branch_suggestions(mut self, branches: Vec<String>) -> Self {
        self.branch_suggestions = Some(branches);
        self
    }

    pub fn tag(&self) -> ErrorTag {
        self.tag
    }

    pub fn summary(&self) -> &str {
        &self.summary
    }

    pub fn cause(&self) -> &(dyn StdError + Send + Sync + 'static) {
        self.cause.as_ref()
    }

    pub fn branch_suggestions(&self) -> Option<&[String]> {
        self.branch_suggestions.as_deref()
    }
}

impl fmt::Display for StepError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.summary, self.cause)?;
        if let Some(branches) = &self.branch_suggestions {
            write!(f, " (available branches: {})", branches.join(", "))?;
        }
        Ok(())
    }
}

impl StdError for StepError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        Some(self.cause.as_ref())
    }
}

impl From<ParameterValidationError> for StepError {
    fn from(e: ParameterValidationError) -> Self {
        StepError::new(
            ErrorTag::ParameterInvalid,
            e,
            "Invalid checkout parameters",
        )
    }
}
