//! Checkout of a single ref: nothing, a commit, a tag or a branch

use log::debug;

use crate::operations::{
    CommandRunner, FORK_REMOTE, FallbackRetry, FetchOptions, GitCommand, ORIGIN_REMOTE,
    REFS_HEADS_PREFIX, checkout_with_retry, fetch, fetch_initial_branch,
};
use crate::{ErrorTag, ParameterValidationError, StepError};

pub(crate) fn require_param(value: &str, message: &str) -> Result<(), ParameterValidationError> {
    if value.trim().is_empty() {
        return Err(ParameterValidationError(message.to_string()));
    }
    Ok(())
}

/// Leaves the working directory as it is.
#[derive(Debug, Clone, Copy, Default)]
pub struct CheckoutNone;

impl CheckoutNone {
    pub async fn run<R: CommandRunner>(
        &self,
        _runner: &R,
        _opts: &FetchOptions,
        _fallback: Option<&FallbackRetry>,
    ) -> Result<(), StepError> {
        debug!("No checkout requested");
        Ok(())
    }
}

/// Parameters to check out a commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitParams {
    commit: String,
    branch_ref: String,
    source_repo_url: String,
}

impl CommitParams {
    /// `branch_ref` narrows the fetch (empty fetches the default refspec);
    /// a non-empty `source_repo_url` fetches from the `fork` remote.
    pub fn new(
        commit: impl Into<String>,
        branch_ref: impl Into<String>,
        source_repo_url: impl Into<String>,
    ) -> Result<Self, ParameterValidationError> {
        let commit = commit.into();
        require_param(
            &commit,
            "commit checkout strategy can not be used: no commit hash specified",
        )?;

        Ok(Self {
            commit,
            branch_ref: branch_ref.into(),
            source_repo_url: source_repo_url.into(),
        })
    }

    pub fn commit(&self) -> &str {
        &self.commit
    }

    pub fn branch_ref(&self) -> &str {
        &self.branch_ref
    }

    pub fn source_repo_url(&self) -> &str {
        &self.source_repo_url
    }
}

/// Fetch a branch (from origin or the fork) and check out a commit on it.
#[derive(Debug, Clone)]
pub struct CheckoutCommit {
    pub params: CommitParams,
}

impl CheckoutCommit {
    pub async fn run<R: CommandRunner>(
        &self,
        runner: &R,
        opts: &FetchOptions,
        fallback: Option<&FallbackRetry>,
    ) -> Result<(), StepError> {
        let mut remote = ORIGIN_REMOTE;
        let source_repo_url = self.params.source_repo_url();
        if !source_repo_url.is_empty() {
            remote = FORK_REMOTE;
            runner
                .run(&GitCommand::remote_add(FORK_REMOTE, source_repo_url))
                .await
                .map_err(|e| {
                    StepError::new(
                        ErrorTag::FetchFailed,
                        e,
                        format!("Adding remote fork repository failed ({source_repo_url})"),
                    )
                })?;
        }

        fetch(runner, remote, Some(self.params.branch_ref()), opts).await?;
        checkout_with_retry(runner, self.params.commit(), fallback).await
    }
}

/// Parameters to check out a tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagParams {
    tag: String,
}

impl TagParams {
    pub fn new(tag: impl Into<String>) -> Result<Self, ParameterValidationError> {
        let tag = tag.into();
        require_param(&tag, "tag checkout strategy can not be used: no tag specified")?;
        Ok(Self { tag })
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }
}

#[derive(Debug, Clone)]
pub struct CheckoutTag {
    pub params: TagParams,
}

impl CheckoutTag {
    pub async fn run<R: CommandRunner>(
        &self,
        runner: &R,
        opts: &FetchOptions,
        fallback: Option<&FallbackRetry>,
    ) -> Result<(), StepError> {
        let tag = self.params.tag();
        let refspec = format!("refs/tags/{tag}:refs/tags/{tag}");
        fetch(runner, ORIGIN_REMOTE, Some(&refspec), opts).await?;
        checkout_with_retry(runner, tag, fallback).await
    }
}

/// Parameters to check out the tip of a branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchParams {
    branch: String,
}

impl BranchParams {
    pub fn new(branch: impl Into<String>) -> Result<Self, ParameterValidationError> {
        let branch = branch.into();
        require_param(
            &branch,
            "branch checkout strategy can not be used: no branch specified",
        )?;
        Ok(Self { branch })
    }

    pub fn branch(&self) -> &str {
        &self.branch
    }
}

/// The branch tip is what gets checked out, so there is nothing to unshallow.
#[derive(Debug, Clone)]
pub struct CheckoutBranch {
    pub params: BranchParams,
}

impl CheckoutBranch {
    pub async fn run<R: CommandRunner>(
        &self,
        runner: &R,
        opts: &FetchOptions,
        _fallback: Option<&FallbackRetry>,
    ) -> Result<(), StepError> {
        let branch_ref = format!("{REFS_HEADS_PREFIX}{}", self.params.branch());
        fetch_initial_branch(runner, ORIGIN_REMOTE, &branch_ref, opts).await
    }
}
