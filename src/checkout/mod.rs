//! Checkout engine
//!
//! The configuration has many overlapping optional fields. Which of them
//! are set decides the [`CheckoutMethod`]:
//!
//! ```text
//! | params\method | commit | tag | branch | manual merge | head branch | diff file |
//! | commit        |  X  !  |     |        |  X           |  X          |           |
//! | tag           |        |  X !|        |              |             |           |
//! | branch        |  _     |  _  |  X  !  |  X           |             |           |
//! | branch_dest   |        |     |        |  X  !        |  X  !       |  X  !     |
//! | PR repo URL   |        |     |        |  _           |             |           |
//! | merge branch  |        |     |        |              |     !       |           |
//! | head branch   |        |     |        |              |  X          |           |
//! X: required, !: selects the method, _: optional
//! ```
//!
//! A method is turned into a [`CheckoutStrategy`] from validated parameters
//! and run with the [`FetchOptions`] and [`FallbackRetry`] picked for it.

pub mod pr;
pub mod simple;

use std::fmt;
use std::path::PathBuf;

use log::{info, warn};

use crate::operations::{
    CommandRunner, FallbackRetry, FetchOptions, REFS_HEADS_PREFIX, REFS_PREFIX,
    UnshallowFetchOptions, is_fork, is_private,
};
use crate::patch::PatchSource;
use crate::{CheckoutConfig, ErrorTag, StepError};

use pr::{
    CheckoutPrDiffFile, CheckoutPrManualMerge, CheckoutPrMergeBranch, PrDiffFileParams,
    PrManualMergeParams, PrMergeBranchParams,
};
use simple::{
    BranchParams, CheckoutBranch, CheckoutCommit, CheckoutNone, CheckoutTag, CommitParams,
    TagParams,
};

const PRIVATE_FORK_AUTH_WARNING: &str = "May fail due to missing authentication as Pull Request opened from a private fork.
A git hosting provider head branch or a diff file is unavailable.";

/// The way the requested state is reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CheckoutMethod {
    Invalid,
    /// Only the repository setup runs (remote, reset, submodules)
    None,
    Commit,
    Tag,
    Branch,
    /// Pull request through the merge branch the provider prepared
    PrMergeBranch,
    /// Pull request through a diff file
    PrDiffFile,
    /// Pull request merged locally
    PrManualMerge,
    /// Head of a pull request, not merged into the destination
    HeadBranchCommit,
    /// Source commit of a pull request opened from a fork, not merged
    ForkCommit,
}

impl fmt::Display for CheckoutMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CheckoutMethod::Invalid => "invalid",
            CheckoutMethod::None => "none",
            CheckoutMethod::Commit => "commit",
            CheckoutMethod::Tag => "tag",
            CheckoutMethod::Branch => "branch",
            CheckoutMethod::PrMergeBranch => "PR merge branch",
            CheckoutMethod::PrDiffFile => "PR diff file",
            CheckoutMethod::PrManualMerge => "PR manual merge",
            CheckoutMethod::HeadBranchCommit => "head branch commit",
            CheckoutMethod::ForkCommit => "fork commit",
        };
        f.write_str(name)
    }
}

/// Pick the checkout method for `cfg`.
///
/// A diff file is only requested from `patch` when a build URL is set and no
/// better method applies; its path is returned along with
/// [`CheckoutMethod::PrDiffFile`].
pub async fn select_checkout_method<P: PatchSource>(
    cfg: &CheckoutConfig,
    patch: &P,
) -> (CheckoutMethod, Option<PathBuf>) {
    let is_pr = !cfg.pr_source_repository_url.is_empty()
        || !cfg.pr_dest_branch.is_empty()
        || !cfg.pr_merge_branch.is_empty()
        || cfg.pr_id != 0;

    if !is_pr {
        let method = if !cfg.commit.is_empty() {
            CheckoutMethod::Commit
        } else if !cfg.tag.is_empty() {
            CheckoutMethod::Tag
        } else if !cfg.branch.is_empty() {
            CheckoutMethod::Branch
        } else {
            CheckoutMethod::None
        };
        return (method, None);
    }

    let is_fork = is_fork(&cfg.repository_url, &cfg.pr_source_repository_url);
    let is_private_source = is_private(&cfg.pr_source_repository_url);
    let is_private_fork = is_fork && is_private_source;
    let is_public_fork = is_fork && !is_private_source;

    if !cfg.should_merge_pr {
        if !cfg.pr_head_branch.is_empty() {
            return (CheckoutMethod::HeadBranchCommit, None);
        }
        if !is_fork {
            return (CheckoutMethod::Commit, None);
        }
        if is_public_fork {
            return (CheckoutMethod::ForkCommit, None);
        }

        if let Some(patch_file) = patch_file(cfg, patch).await {
            info!(
                "Merging Pull Request despite the option to disable merging, as it is opened from a private fork."
            );
            return (CheckoutMethod::PrDiffFile, Some(patch_file));
        }

        warn!("{PRIVATE_FORK_AUTH_WARNING}");
        return (CheckoutMethod::ForkCommit, None);
    }

    if !cfg.manual_merge || is_private_fork {
        if !cfg.pr_merge_branch.is_empty() {
            return (CheckoutMethod::PrMergeBranch, None);
        }

        if let Some(patch_file) = patch_file(cfg, patch).await {
            return (CheckoutMethod::PrDiffFile, Some(patch_file));
        }

        warn!("{PRIVATE_FORK_AUTH_WARNING}");
        return (CheckoutMethod::PrManualMerge, None);
    }

    (CheckoutMethod::PrManualMerge, None)
}

async fn patch_file<P: PatchSource>(cfg: &CheckoutConfig, patch: &P) -> Option<PathBuf> {
    if cfg.build_url.is_empty() {
        return None;
    }

    match patch.diff_path(&cfg.build_url, &cfg.build_api_token).await {
        Ok(path) => Some(path),
        Err(e) => {
            warn!("Diff file unavailable: {e}");
            None
        }
    }
}

/// Fetch options for `method`.
///
/// Tree filtering (used with sparse checkouts) only applies to methods that
/// never merge, and always fetches the full history.
pub fn select_fetch_options(
    method: CheckoutMethod,
    depth: u32,
    tags: bool,
    fetch_submodules: bool,
    filter_tree: bool,
) -> FetchOptions {
    let opts = FetchOptions::new(depth, tags, fetch_submodules);
    if !filter_tree {
        return opts;
    }

    match method {
        CheckoutMethod::Commit
        | CheckoutMethod::Tag
        | CheckoutMethod::Branch
        | CheckoutMethod::HeadBranchCommit
        | CheckoutMethod::ForkCommit => opts.with_tree_filter(),
        _ => opts,
    }
}

/// Recovery for a failed checkout or merge; `None` when the fetch was not
/// shallow or the method does not need older history.
pub fn select_fallbacks(method: CheckoutMethod, opts: &FetchOptions) -> Option<FallbackRetry> {
    if opts.is_full_depth() {
        return None;
    }

    let unshallow = UnshallowFetchOptions {
        tags: opts.tags,
        fetch_submodules: opts.fetch_submodules,
    };

    match method {
        CheckoutMethod::Commit
        | CheckoutMethod::Tag
        | CheckoutMethod::HeadBranchCommit
        | CheckoutMethod::ForkCommit => Some(FallbackRetry::SimpleUnshallow(unshallow)),
        CheckoutMethod::PrMergeBranch
        | CheckoutMethod::PrManualMerge
        | CheckoutMethod::PrDiffFile => Some(FallbackRetry::ResetUnshallow(unshallow)),
        // the branch tip is checked out, older history is never needed
        CheckoutMethod::Branch => None,
        CheckoutMethod::Invalid | CheckoutMethod::None => None,
    }
}

/// A checkout method bound to its validated parameters.
#[derive(Debug, Clone)]
pub enum CheckoutStrategy {
    None(CheckoutNone),
    Commit(CheckoutCommit),
    Tag(CheckoutTag),
    Branch(CheckoutBranch),
    PrMergeBranch(CheckoutPrMergeBranch),
    PrDiffFile(CheckoutPrDiffFile),
    PrManualMerge(CheckoutPrManualMerge),
}

impl CheckoutStrategy {
    pub async fn run<R: CommandRunner>(
        &self,
        runner: &R,
        opts: &FetchOptions,
        fallback: Option<&FallbackRetry>,
    ) -> Result<(), StepError> {
        match self {
            CheckoutStrategy::None(s) => s.run(runner, opts, fallback).await,
            CheckoutStrategy::Commit(s) => s.run(runner, opts, fallback).await,
            CheckoutStrategy::Tag(s) => s.run(runner, opts, fallback).await,
            CheckoutStrategy::Branch(s) => s.run(runner, opts, fallback).await,
            CheckoutStrategy::PrMergeBranch(s) => s.run(runner, opts, fallback).await,
            CheckoutStrategy::PrDiffFile(s) => s.run(runner, opts, fallback).await,
            CheckoutStrategy::PrManualMerge(s) => s.run(runner, opts, fallback).await,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            CheckoutStrategy::None(_) => "CheckoutNone",
            CheckoutStrategy::Commit(_) => "CheckoutCommit",
            CheckoutStrategy::Tag(_) => "CheckoutTag",
            CheckoutStrategy::Branch(_) => "CheckoutBranch",
            CheckoutStrategy::PrMergeBranch(_) => "CheckoutPrMergeBranch",
            CheckoutStrategy::PrDiffFile(_) => "CheckoutPrDiffFile",
            CheckoutStrategy::PrManualMerge(_) => "CheckoutPrManualMerge",
        }
    }
}

/// Build the strategy for `method` from `cfg`.
///
/// Fails with `parameter_invalid` when a field the method requires is blank.
pub fn create_checkout_strategy(
    method: CheckoutMethod,
    cfg: &CheckoutConfig,
    patch_file: Option<PathBuf>,
) -> Result<CheckoutStrategy, StepError> {
    let strategy = match method {
        CheckoutMethod::None => CheckoutStrategy::None(CheckoutNone),
        CheckoutMethod::Commit => {
            let branch_ref = if cfg.branch.is_empty() {
                String::new()
            } else {
                format!("{REFS_HEADS_PREFIX}{}", cfg.branch)
            };
            CheckoutStrategy::Commit(CheckoutCommit {
                params: CommitParams::new(cfg.commit.as_str(), branch_ref, "")?,
            })
        }
        CheckoutMethod::Tag => CheckoutStrategy::Tag(CheckoutTag {
            params: TagParams::new(cfg.tag.as_str())?,
        }),
        CheckoutMethod::Branch => CheckoutStrategy::Branch(CheckoutBranch {
            params: BranchParams::new(cfg.branch.as_str())?,
        }),
        CheckoutMethod::PrMergeBranch => CheckoutStrategy::PrMergeBranch(CheckoutPrMergeBranch {
            params: PrMergeBranchParams::new(
                cfg.pr_dest_branch.as_str(),
                cfg.pr_merge_branch.as_str(),
            )?,
        }),
        CheckoutMethod::PrDiffFile => {
            let manual_merge = manual_merge_strategy(cfg)?;
            let params = PrDiffFileParams::new(cfg.pr_dest_branch.as_str(), manual_merge)?;
            let patch_file = patch_file.ok_or_else(|| {
                StepError::new(
                    ErrorTag::ParameterInvalid,
                    "no diff file available",
                    "PR diff file based checkout strategy can not be used",
                )
            })?;
            CheckoutStrategy::PrDiffFile(CheckoutPrDiffFile { params, patch_file })
        }
        CheckoutMethod::PrManualMerge => {
            CheckoutStrategy::PrManualMerge(manual_merge_strategy(cfg)?)
        }
        CheckoutMethod::HeadBranchCommit => {
            // e.g. refs/pull/2/head
            let head_branch_ref = format!("{REFS_PREFIX}{}", cfg.pr_head_branch);
            CheckoutStrategy::Commit(CheckoutCommit {
                params: CommitParams::new(cfg.commit.as_str(), head_branch_ref, "")?,
            })
        }
        CheckoutMethod::ForkCommit => {
            let source_branch_ref = format!("{REFS_HEADS_PREFIX}{}", cfg.branch);
            CheckoutStrategy::Commit(CheckoutCommit {
                params: CommitParams::new(
                    cfg.commit.as_str(),
                    source_branch_ref,
                    cfg.pr_source_repository_url.as_str(),
                )?,
            })
        }
        CheckoutMethod::Invalid => {
            return Err(StepError::new(
                ErrorTag::ParameterInvalid,
                "invalid checkout strategy selected",
                "Invalid checkout parameters",
            ));
        }
    };

    Ok(strategy)
}

fn manual_merge_strategy(cfg: &CheckoutConfig) -> Result<CheckoutPrManualMerge, StepError> {
    let source_repo_url = if is_fork(&cfg.repository_url, &cfg.pr_source_repository_url) {
        cfg.pr_source_repository_url.as_str()
    } else {
        ""
    };

    let params = PrManualMergeParams::new(
        cfg.branch.as_str(),
        cfg.commit.as_str(),
        source_repo_url,
        cfg.pr_dest_branch.as_str(),
    )?;
    Ok(CheckoutPrManualMerge { params })
}

/// Select, build and run the checkout for `cfg`.
pub async fn checkout_state<R, P>(runner: &R, cfg: &CheckoutConfig, patch: &P) -> Result<(), StepError>
where
    R: CommandRunner,
    P: PatchSource,
{
    let (method, patch_file) = select_checkout_method(cfg, patch).await;
    let opts = select_fetch_options(
        method,
        cfg.clone_depth,
        cfg.fetch_tags,
        cfg.update_submodules,
        !cfg.sparse_directories.is_empty(),
    );

    let strategy = create_checkout_strategy(method, cfg, patch_file)?;
    let fallback = select_fallbacks(method, &opts);

    if let Err(err) = strategy.run(runner, &opts, fallback.as_ref()).await {
        info!("Checkout strategy used: {}", strategy.name());
        return Err(err);
    }

    Ok(())
}
