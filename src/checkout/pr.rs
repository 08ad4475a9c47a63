//! Pull request checkouts
//!
//! Three ways to end up at the merge result of a pull request:
//!
//! - the provider already merged it into a merge branch, fetch and merge that
//!   ([`CheckoutPrMergeBranch`]);
//! - merge the source branch into the destination locally
//!   ([`CheckoutPrManualMerge`]);
//! - apply the diff of the pull request on top of the destination
//!   ([`CheckoutPrDiffFile`]), falling back to a manual merge when the diff
//!   does not apply.
//!
//! All of them leave HEAD detached at the result.

use std::path::{Path, PathBuf};

use log::warn;

use super::simple::require_param;
use crate::operations::{
    CommandRunner, FORK_REMOTE, FallbackRetry, FetchOptions, GitCommand, ORIGIN_REMOTE,
    REFS_HEADS_PREFIX, detach_head, fetch, fetch_arg, fetch_initial_branch, merge_arg,
    merge_with_retry,
};
use crate::{ErrorTag, ParameterValidationError, StepError};

/// Parameters to check out a provider-made merge branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrMergeBranchParams {
    destination_branch: String,
    merge_branch: String,
}

impl PrMergeBranchParams {
    pub fn new(
        destination_branch: impl Into<String>,
        merge_branch: impl Into<String>,
    ) -> Result<Self, ParameterValidationError> {
        let destination_branch = destination_branch.into();
        let merge_branch = merge_branch.into();
        require_param(
            &destination_branch,
            "PR merge branch based checkout strategy can not be used: no destination branch specified",
        )?;
        require_param(
            &merge_branch,
            "PR merge branch based checkout strategy can not be used: no merge branch specified",
        )?;

        Ok(Self {
            destination_branch,
            merge_branch,
        })
    }

    pub fn destination_branch(&self) -> &str {
        &self.destination_branch
    }

    /// Branch holding the changes premerged by the provider, e.g. `pull/7/merge`
    pub fn merge_branch(&self) -> &str {
        &self.merge_branch
    }
}

#[derive(Debug, Clone)]
pub struct CheckoutPrMergeBranch {
    pub params: PrMergeBranchParams,
}

impl CheckoutPrMergeBranch {
    pub async fn run<R: CommandRunner>(
        &self,
        runner: &R,
        opts: &FetchOptions,
        fallback: Option<&FallbackRetry>,
    ) -> Result<(), StepError> {
        let dest = self.params.destination_branch();

        let dest_ref = format!("{REFS_HEADS_PREFIX}{dest}");
        fetch(runner, ORIGIN_REMOTE, Some(&dest_ref), opts).await?;

        let merge_ref = fetch_arg(self.params.merge_branch());
        fetch(runner, ORIGIN_REMOTE, Some(&merge_ref), opts).await?;

        // both refs are fetched before the destination is checked out
        runner
            .run(&GitCommand::checkout(dest))
            .await
            .map_err(|e| StepError::new(ErrorTag::CheckoutFailed, e, "Checkout has failed"))?;
        let remote_dest = format!("{ORIGIN_REMOTE}/{dest}");
        runner
            .run(&GitCommand::merge(&remote_dest))
            .await
            .map_err(|e| StepError::new(ErrorTag::CheckoutFailed, e, "Updating branch has failed"))?;

        merge_with_retry(runner, &merge_arg(self.params.merge_branch()), fallback).await?;

        detach_head(runner).await
    }
}

/// Parameters to merge a pull request locally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrManualMergeParams {
    source_branch: String,
    source_merge_arg: String,
    source_repo_url: String,
    destination_branch: String,
}

impl PrManualMergeParams {
    /// `source_merge_arg` is what gets merged, usually the head commit of the
    /// pull request. A non-empty `source_repo_url` means the source branch
    /// lives in a fork.
    pub fn new(
        source_branch: impl Into<String>,
        source_merge_arg: impl Into<String>,
        source_repo_url: impl Into<String>,
        destination_branch: impl Into<String>,
    ) -> Result<Self, ParameterValidationError> {
        let source_branch = source_branch.into();
        let source_merge_arg = source_merge_arg.into();
        let destination_branch = destination_branch.into();
        require_param(
            &source_branch,
            "manual merge checkout strategy can not be used: no source branch specified",
        )?;
        require_param(
            &destination_branch,
            "manual merge checkout strategy can not be used: no destination branch specified",
        )?;
        require_param(
            &source_merge_arg,
            "manual merge checkout strategy can not be used: no source commit specified",
        )?;

        Ok(Self {
            source_branch,
            source_merge_arg,
            source_repo_url: source_repo_url.into(),
            destination_branch,
        })
    }

    pub fn source_branch(&self) -> &str {
        &self.source_branch
    }

    pub fn source_merge_arg(&self) -> &str {
        &self.source_merge_arg
    }

    pub fn source_repo_url(&self) -> &str {
        &self.source_repo_url
    }

    pub fn destination_branch(&self) -> &str {
        &self.destination_branch
    }
}

#[derive(Debug, Clone)]
pub struct CheckoutPrManualMerge {
    pub params: PrManualMergeParams,
}

impl CheckoutPrManualMerge {
    pub async fn run<R: CommandRunner>(
        &self,
        runner: &R,
        opts: &FetchOptions,
        fallback: Option<&FallbackRetry>,
    ) -> Result<(), StepError> {
        let params = &self.params;

        let dest_ref = format!("{REFS_HEADS_PREFIX}{}", params.destination_branch());
        fetch_initial_branch(runner, ORIGIN_REMOTE, &dest_ref, opts).await?;

        let source = params.source_branch();
        if params.source_repo_url().is_empty() {
            let source_ref = format!("{REFS_HEADS_PREFIX}{source}");
            fetch(runner, ORIGIN_REMOTE, Some(&source_ref), opts).await?;
        } else {
            runner
                .run(&GitCommand::remote_add(FORK_REMOTE, params.source_repo_url()))
                .await
                .map_err(|e| {
                    StepError::new(
                        ErrorTag::FetchFailed,
                        e,
                        format!(
                            "Adding remote fork repository failed ({})",
                            params.source_repo_url()
                        ),
                    )
                })?;

            let source_ref = format!("{REFS_HEADS_PREFIX}{source}:{source}");
            fetch(runner, FORK_REMOTE, Some(&source_ref), opts).await?;
        }

        merge_with_retry(runner, params.source_merge_arg(), fallback).await?;

        detach_head(runner).await
    }
}

/// Parameters to apply a pull request diff.
#[derive(Debug, Clone)]
pub struct PrDiffFileParams {
    destination_branch: String,
    manual_merge: CheckoutPrManualMerge,
}

impl PrDiffFileParams {
    /// `manual_merge` runs when the diff does not apply cleanly.
    pub fn new(
        destination_branch: impl Into<String>,
        manual_merge: CheckoutPrManualMerge,
    ) -> Result<Self, ParameterValidationError> {
        let destination_branch = destination_branch.into();
        require_param(
            &destination_branch,
            "PR diff file based checkout strategy can not be used: no destination branch specified",
        )?;

        Ok(Self {
            destination_branch,
            manual_merge,
        })
    }

    pub fn destination_branch(&self) -> &str {
        &self.destination_branch
    }

    pub fn manual_merge(&self) -> &CheckoutPrManualMerge {
        &self.manual_merge
    }
}

#[derive(Debug, Clone)]
pub struct CheckoutPrDiffFile {
    pub params: PrDiffFileParams,
    pub patch_file: PathBuf,
}

impl CheckoutPrDiffFile {
    pub async fn run<R: CommandRunner>(
        &self,
        runner: &R,
        opts: &FetchOptions,
        fallback: Option<&FallbackRetry>,
    ) -> Result<(), StepError> {
        let dest_ref = format!("{REFS_HEADS_PREFIX}{}", self.params.destination_branch());
        fetch_initial_branch(runner, ORIGIN_REMOTE, &dest_ref, opts).await?;

        if let Err(err) = apply_patch(runner, &self.patch_file).await {
            warn!("Could not apply patch ({}): {err}", self.patch_file.display());
            warn!("Falling back to manual merge");
            return self.params.manual_merge().run(runner, opts, fallback).await;
        }

        detach_head(runner).await
    }
}

async fn apply_patch<R: CommandRunner>(runner: &R, patch: &Path) -> crate::GitResult<()> {
    runner.run(&GitCommand::apply(patch)).await.map(|_| ())
}
